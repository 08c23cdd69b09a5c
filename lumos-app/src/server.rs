use crate::relay;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Local, Utc};
use lumos_core::{
    classify, ConnectionStatus, CoreError, Donation, NewDonation, ScheduledPlaylist, ShowViewModel,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Upper bound for `?limit=` on the leaderboard
pub const MAX_LEADERBOARD_LIMIT: u32 = 100;

/// Error response with a JSON `{ "error": ... }` body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidDonation { reason } => Self::new(StatusCode::BAD_REQUEST, reason),
            other => {
                error!("Request failed: {}", other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShowResponse {
    pub show: ShowViewModel,
    pub connection: ConnectionStatus,
    pub now: DateTime<Local>,
}

/// Playlist schedule classified against the server clock
#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    /// False until the first schedule fetch succeeds
    pub loaded: bool,
    pub fetched_at: Option<DateTime<Utc>>,
    pub entries: Vec<ScheduledPlaylist>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    limit: Option<u32>,
}

/// Build the HTTP router
#[must_use]
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/api/show", get(show_status))
        .route("/api/schedule", get(playlist_schedule))
        .route("/api/donations", get(list_donations).post(create_donation));

    if state.relay.is_some() {
        router = router.route(
            "/api/fpp-proxy",
            get(relay::relay_status).options(relay::relay_preflight),
        );
    }

    router.with_state(state)
}

/// Serve until `cancel_token` fires
///
/// # Errors
///
/// Returns an error if the listener fails.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel_token: CancellationToken,
) -> std::io::Result<()> {
    info!("HTTP server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel_token.cancelled().await })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/show
async fn show_status(State(state): State<AppState>) -> Json<ShowResponse> {
    let now = Local::now();
    let (show, connection) = state.hub.resolve_now(&now, &state.schedule).await;
    Json(ShowResponse {
        show,
        connection,
        now,
    })
}

/// GET /api/schedule
async fn playlist_schedule(State(state): State<AppState>) -> Json<ScheduleResponse> {
    let now = Local::now();
    let response = match state.playlists.latest().await {
        Some(schedule) => ScheduleResponse {
            loaded: true,
            fetched_at: Some(schedule.fetched_at),
            entries: classify(&schedule.entries, &now),
        },
        None => ScheduleResponse {
            loaded: false,
            fetched_at: None,
            entries: Vec::new(),
        },
    };
    Json(response)
}

/// GET /api/donations?limit=N
async fn list_donations(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<Vec<Donation>>, ApiError> {
    let store = state
        .donations
        .as_deref()
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "donations disabled"))?;

    let limit = params
        .limit
        .unwrap_or(state.leaderboard_size)
        .clamp(1, MAX_LEADERBOARD_LIMIT);
    Ok(Json(store.top(limit).await?))
}

/// POST /api/donations
async fn create_donation(
    State(state): State<AppState>,
    Json(donation): Json<NewDonation>,
) -> Result<(StatusCode, Json<Donation>), ApiError> {
    let store = state
        .donations
        .as_deref()
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "donations disabled"))?;

    let stored = store.insert(donation).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::Relay;
    use chrono::{Duration, Timelike};
    use lumos_core::{
        ControllerConfig, DonationStore, ExternalSnapshot, PlayState, PlaylistCache,
        PlaylistEntry, RelayConfig, StatusHub,
    };
    use serde_json::Value;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn spawn(state: AppState) -> (String, CancellationToken) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let cancel = CancellationToken::new();
        tokio::spawn(serve(listener, state, cancel.clone()));
        (base, cancel)
    }

    async fn donations_state() -> AppState {
        let store = DonationStore::open_in_memory().await.unwrap();
        AppState::new(StatusHub::new(), 2).with_donations(store)
    }

    fn relay_for(server: &MockServer) -> Relay {
        let controller = ControllerConfig {
            base_url: format!("{}/api", server.uri()),
            timeout_ms: 1000,
            ..ControllerConfig::default()
        };
        let relay = RelayConfig {
            enabled: true,
            upstream_retries: 0,
        };
        Relay::new(&controller, &relay).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (base, cancel) = spawn(AppState::new(StatusHub::new(), 10)).await;
        let body = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "ok");
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_show_reports_snapshot_and_connection() {
        let hub = StatusHub::new();
        hub.publish_success(
            ExternalSnapshot::new(PlayState::Playing).with_current_item("02 - Carol of the Bells.fseq"),
        )
        .await;
        let (base, cancel) = spawn(AppState::new(Arc::clone(&hub), 10)).await;

        let body: Value = reqwest::get(format!("{base}/api/show"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["show"]["is_live"], true);
        assert_eq!(body["show"]["current_sequence"], "Carol of the Bells");
        assert_eq!(body["connection"]["connected"], true);
        assert!(body["now"].is_string());
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_schedule_before_first_fetch() {
        let (base, cancel) = spawn(AppState::new(StatusHub::new(), 10)).await;
        let body: Value = reqwest::get(format!("{base}/api/schedule"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["loaded"], false);
        assert_eq!(body["entries"], json!([]));
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_schedule_classifies_entries() {
        let now = Local::now().naive_local().with_nanosecond(0).unwrap();
        let cache = PlaylistCache::new();
        cache
            .store(vec![
                PlaylistEntry {
                    playlist: "Igår".to_string(),
                    start: now - Duration::days(1),
                    end: now - Duration::days(1) + Duration::hours(1),
                },
                PlaylistEntry {
                    playlist: "Nu".to_string(),
                    start: now - Duration::hours(1),
                    end: now + Duration::hours(1),
                },
                PlaylistEntry {
                    playlist: "Imorgon".to_string(),
                    start: now + Duration::days(1),
                    end: now + Duration::days(1) + Duration::hours(1),
                },
            ])
            .await;

        let state = AppState::new(StatusHub::new(), 10).with_playlists(cache);
        let (base, cancel) = spawn(state).await;

        let body: Value = reqwest::get(format!("{base}/api/schedule"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["loaded"], true);
        let statuses: Vec<_> = body["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| (e["playlist"].as_str().unwrap(), e["status"].as_str().unwrap()))
            .collect();
        assert_eq!(
            statuses,
            vec![("Igår", "past"), ("Nu", "current"), ("Imorgon", "upcoming")]
        );
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_donation_roundtrip() {
        let (base, cancel) = spawn(donations_state().await).await;
        let client = reqwest::Client::new();

        for (name, amount) in [("Anna", 100), ("Bertil", 500), ("Cecilia", 250)] {
            let response = client
                .post(format!("{base}/api/donations"))
                .json(&json!({ "donor_name": name, "amount": amount }))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        }

        // Default limit comes from the configured leaderboard size
        let top: Vec<Value> = reqwest::get(format!("{base}/api/donations"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0]["donor_name"], "Bertil");
        assert_eq!(top[1]["donor_name"], "Cecilia");

        let all: Vec<Value> = reqwest::get(format!("{base}/api/donations?limit=500"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_invalid_donation_is_bad_request() {
        let (base, cancel) = spawn(donations_state().await).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/donations"))
            .json(&json!({ "donor_name": "  ", "amount": 100 }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_donations_disabled() {
        let (base, cancel) = spawn(AppState::new(StatusHub::new(), 10)).await;
        let response = reqwest::get(format!("{base}/api/donations")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_relay_forwards_with_cors() {
        let controller = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/fppd/status"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "status": 1, "status_name": "playing" })),
            )
            .mount(&controller)
            .await;

        let state = AppState::new(StatusHub::new(), 10).with_relay(relay_for(&controller));
        let (base, cancel) = spawn(state).await;

        let response = reqwest::get(format!("{base}/api/fpp-proxy")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status_name"], "playing");
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_relay_placeholder_on_upstream_failure() {
        let controller = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&controller)
            .await;

        let state = AppState::new(StatusHub::new(), 10).with_relay(relay_for(&controller));
        let (base, cancel) = spawn(state).await;

        let response = reqwest::get(format!("{base}/api/fpp-proxy?path=/api/fppd/status"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], 0);
        assert_eq!(body["status_name"], "idle");
        assert!(body["error"].is_string());
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_relay_rejects_foreign_paths() {
        let controller = MockServer::start().await;
        let state = AppState::new(StatusHub::new(), 10).with_relay(relay_for(&controller));
        let (base, cancel) = spawn(state).await;

        let response = reqwest::get(format!("{base}/api/fpp-proxy?path=/etc/passwd"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        // %252e arrives at the relay as %2e, which URL resolution treats as a dot
        let response = reqwest::get(format!(
            "{base}/api/fpp-proxy?path=/api/.%252e/admin/secret"
        ))
        .await
        .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_relay_preflight() {
        let controller = MockServer::start().await;
        let state = AppState::new(StatusHub::new(), 10).with_relay(relay_for(&controller));
        let (base, cancel) = spawn(state).await;

        let response = reqwest::Client::new()
            .request(reqwest::Method::OPTIONS, format!("{base}/api/fpp-proxy"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(
            response.headers()["access-control-allow-headers"],
            "authorization, x-client-info, apikey, content-type"
        );
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_relay_route_absent_when_disabled() {
        let (base, cancel) = spawn(AppState::new(StatusHub::new(), 10)).await;
        let response = reqwest::get(format!("{base}/api/fpp-proxy")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        cancel.cancel();
    }
}
