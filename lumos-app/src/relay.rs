//! Same-origin relay in front of the show controller.
//!
//! Browsers on the public site can't reach the controller on the LAN, so the
//! server forwards `GET /api/fpp-proxy?path=...` to it. Upstream failures never
//! surface as HTTP errors: the relay answers 200 with an idle placeholder that
//! carries an `error` field, which clients treat as "controller unavailable".

use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use lumos_core::{ControllerConfig, RelayConfig};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Path forwarded when the client doesn't name one
pub const DEFAULT_RELAY_PATH: &str = "/api/fppd/status";

/// Only paths under this prefix are forwarded
const ALLOWED_PREFIX: &str = "/api/";

const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("path must start with /api/")]
    InvalidPath,

    #[error("invalid controller URL: {0}")]
    InvalidUrl(String),

    #[error("controller request failed: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    #[error("controller request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("controller responded with status {0}")]
    Status(reqwest::StatusCode),
}

/// Forwards GET requests to the controller with transient retries
pub struct Relay {
    client: ClientWithMiddleware,
    origin: Url,
}

impl Relay {
    /// Create a relay for the configured controller
    ///
    /// # Errors
    ///
    /// Returns an error if the controller URL is invalid or the HTTP client
    /// cannot be created.
    pub fn new(controller: &ControllerConfig, relay: &RelayConfig) -> Result<Self, RelayError> {
        let origin = controller
            .origin()
            .map_err(|e| RelayError::InvalidUrl(e.to_string()))?;

        let base_client = reqwest::Client::builder()
            .timeout(controller.timeout())
            .connect_timeout(controller.timeout())
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(100), Duration::from_secs(1))
            .build_with_max_retries(relay.upstream_retries);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client, origin })
    }

    /// Resolve a client-supplied path against the controller origin
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` unless both the raw path and the resolved URL
    /// stay under `/api/` on the controller origin. Percent-encoded dot
    /// segments are resolved by the join, so the check runs on the result.
    pub fn target_url(&self, path: &str) -> Result<Url, RelayError> {
        if !path.starts_with(ALLOWED_PREFIX) || path.contains("..") {
            return Err(RelayError::InvalidPath);
        }
        let url = self
            .origin
            .join(path)
            .map_err(|e| RelayError::InvalidUrl(e.to_string()))?;

        if url.origin() != self.origin.origin() || !url.path().starts_with(ALLOWED_PREFIX) {
            return Err(RelayError::InvalidPath);
        }
        Ok(url)
    }

    /// Forward one GET and return the controller's JSON body
    ///
    /// # Errors
    ///
    /// Returns an error if the path is rejected, the controller is unreachable
    /// after retries, answers with a non-2xx status, or returns invalid JSON.
    pub async fn forward(&self, path: &str) -> Result<Value, RelayError> {
        let url = self.target_url(path)?;
        debug!("Relaying request to {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(RelayError::Status(response.status()));
        }
        Ok(response.json().await?)
    }
}

/// Idle status returned in place of a failed upstream response
#[must_use]
pub fn placeholder(reason: &str) -> Value {
    json!({
        "fppd": "unavailable",
        "status": 0,
        "status_name": "idle",
        "error": reason,
    })
}

#[derive(Debug, Deserialize)]
pub struct RelayParams {
    path: Option<String>,
}

/// GET /api/fpp-proxy
pub async fn relay_status(
    State(state): State<AppState>,
    Query(params): Query<RelayParams>,
) -> Response {
    let Some(relay) = state.relay.as_deref() else {
        return with_cors(StatusCode::NOT_FOUND, &json!({ "error": "relay disabled" }));
    };

    let path = params
        .path
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_RELAY_PATH.to_string());

    match relay.forward(&path).await {
        Ok(body) => with_cors(StatusCode::OK, &body),
        Err(RelayError::InvalidPath) => with_cors(
            StatusCode::BAD_REQUEST,
            &json!({ "error": RelayError::InvalidPath.to_string() }),
        ),
        Err(e) => {
            warn!("Relay to controller failed: {}", e);
            with_cors(StatusCode::OK, &placeholder(&e.to_string()))
        }
    }
}

/// OPTIONS /api/fpp-proxy
pub async fn relay_preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    add_cors_headers(&mut response);
    response
}

fn with_cors(status: StatusCode, body: &Value) -> Response {
    let mut response = (status, Json(body)).into_response();
    add_cors_headers(&mut response);
    response
}

fn add_cors_headers(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

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
    async fn test_target_url_checks_prefix() {
        let server = MockServer::start().await;
        let relay = relay_for(&server);

        let url = relay.target_url("/api/fppd/status").unwrap();
        assert_eq!(url.as_str(), format!("{}/api/fppd/status", server.uri()));

        assert!(matches!(relay.target_url("/etc/passwd"), Err(RelayError::InvalidPath)));
        assert!(matches!(relay.target_url("api/fppd"), Err(RelayError::InvalidPath)));
        assert!(matches!(
            relay.target_url("/api/../admin"),
            Err(RelayError::InvalidPath)
        ));
    }

    #[tokio::test]
    async fn test_target_url_rejects_encoded_dot_segments() {
        let server = MockServer::start().await;
        let relay = relay_for(&server);

        for path in [
            "/api/.%2e/admin/secret",
            "/api/%2e%2e/admin/secret",
            "/api/%2E./admin/secret",
            "/api/fppd/%2e%2E/%2e%2e/etc",
        ] {
            assert!(
                matches!(relay.target_url(path), Err(RelayError::InvalidPath)),
                "{path} escaped /api/"
            );
        }

        // A single encoded dot stays inside /api/
        let url = relay.target_url("/api/fppd/%2e/status").unwrap();
        assert_eq!(url.path(), "/api/fppd/status");
    }

    #[tokio::test]
    async fn test_forward_never_reaches_outside_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "leak": true })))
            .expect(0)
            .mount(&server)
            .await;

        let err = relay_for(&server)
            .forward("/api/.%2e/admin/secret")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidPath));
    }

    #[tokio::test]
    async fn test_forward_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/fppd/status"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "status": 1, "status_name": "playing" })),
            )
            .mount(&server)
            .await;

        let body = relay_for(&server).forward(DEFAULT_RELAY_PATH).await.unwrap();
        assert_eq!(body["status_name"], "playing");
    }

    #[tokio::test]
    async fn test_forward_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/fppd/status"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = relay_for(&server).forward(DEFAULT_RELAY_PATH).await.unwrap_err();
        assert!(matches!(err, RelayError::Status(code) if code.as_u16() == 500));
    }

    #[test]
    fn test_placeholder_shape() {
        let body = placeholder("unreachable");
        assert_eq!(body["status"], 0);
        assert_eq!(body["status_name"], "idle");
        assert_eq!(body["error"], "unreachable");
        assert_eq!(lumos_core::relay_error(&body).as_deref(), Some("unreachable"));
    }
}
