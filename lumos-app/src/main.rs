mod display;
mod relay;
mod server;
mod state;

use crate::relay::Relay;
use crate::state::AppState;
use lumos_core::{
    CoreError, DonationStore, LumosConfig, PlaylistCache, ScheduleTable, StatusEvent, StatusHub,
};
use lumos_fpp::{FppClient, SchedulePoller, StatusPoller};
use std::fs::File;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let file_logging_enabled = check_file_logging_enabled();
    init_tracing(file_logging_enabled);

    let config = match LumosConfig::load_or_create() {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            info!(
                "Created a new config file at {}. Review it and start lumos again.",
                path.display()
            );
            std::process::exit(0);
        }
        Err(e) => {
            error!("{e}");
            error!("Config file: {}", LumosConfig::config_path().display());
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    let cancel_token = CancellationToken::new();

    // Ctrl+C cancels every task
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    if let Err(e) = runtime.block_on(run(config, cancel_token)) {
        error!("{e}");
        std::process::exit(1);
    }
}

/// Start every task and serve HTTP until cancelled
async fn run(config: LumosConfig, cancel_token: CancellationToken) -> Result<(), String> {
    let hub = StatusHub::new();
    let schedule = ScheduleTable::default();
    let playlists = PlaylistCache::new();

    let client = FppClient::new(&config.controller)
        .map_err(|e| format!("Failed to create controller client: {e}"))?;
    info!("Polling controller at {}", client.status_url());
    let client = Arc::new(client);

    let mut state = AppState::new(hub.clone(), config.donations.leaderboard_size)
        .with_playlists(playlists.clone());

    if config.relay.enabled {
        let relay = Relay::new(&config.controller, &config.relay)
            .map_err(|e| format!("Failed to create relay: {e}"))?;
        state = state.with_relay(relay);
    }

    if config.donations.enabled {
        let path = config.donations.database_path();
        let store = DonationStore::open(&path)
            .await
            .map_err(|e| format!("Failed to open donations database: {e}"))?;
        state = state.with_donations(store);
    }

    let addr = config
        .server
        .socket_addr()
        .map_err(|e| e.to_string())?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {addr}: {e}"))?;

    let poller = Arc::new(
        StatusPoller::new(
            client.clone(),
            hub.clone(),
            config.controller.poll_interval(),
            config.controller.timeout(),
        )
        .with_cancel_token(cancel_token.clone()),
    );

    let schedule_poller = Arc::new(
        SchedulePoller::new(
            client,
            playlists,
            config.controller.schedule_refresh(),
            config.controller.timeout(),
        )
        .with_cancel_token(cancel_token.clone()),
    );

    let poller_handle = poller.start();
    let schedule_handle = schedule_poller.start();
    let display_handle = tokio::spawn(display::run_display(
        hub.clone(),
        schedule,
        cancel_token.clone(),
    ));
    let events_handle = tokio::spawn(log_status_events(hub, cancel_token.clone()));

    let served = server::serve(listener, state, cancel_token.clone()).await;

    // The server only returns early on error; make sure the other tasks stop too
    cancel_token.cancel();
    let _ = poller_handle.await;
    let _ = schedule_handle.await;
    let _ = display_handle.await;
    let _ = events_handle.await;

    served.map_err(|e| format!("HTTP server failed: {e}"))
}

/// Log status hub events until cancelled
async fn log_status_events(hub: Arc<StatusHub>, cancel_token: CancellationToken) {
    let mut rx = hub.subscribe();

    loop {
        let received = tokio::select! {
            () = cancel_token.cancelled() => break,
            received = rx.recv() => received,
        };

        match received {
            Ok(event) => match &event {
                StatusEvent::Connected => {
                    info!("Show controller connected");
                }
                StatusEvent::Disconnected { reason } => {
                    warn!("Show controller disconnected: {}", reason);
                }
                StatusEvent::SnapshotUpdated { snapshot } => {
                    info!(
                        "Controller status: {} {:?}",
                        snapshot.play_state, snapshot.current_item
                    );
                }
            },
            Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                info!("Status event channel closed");
                break;
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                info!("Missed {} status events", n);
            }
        }
    }
}

/// Peek at `logging.enabled` so tracing is up before the config is validated
fn check_file_logging_enabled() -> bool {
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let Ok(content) = std::fs::read_to_string(LumosConfig::config_path()) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Console logging, plus `lumos.log` when file logging is on
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer();

    if file_logging_enabled {
        let log_path = lumos_core::paths::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_event_logger_stops_on_cancel() {
        let hub = StatusHub::new();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(log_status_events(Arc::clone(&hub), cancel.clone()));

        hub.publish_failure("unreachable".to_string()).await;
        cancel.cancel();

        // The hub still holds the sender, so only the token can end the loop
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
