use lumos_core::{CoreError, PlaylistCache, ScheduleSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "lumos::fpp::schedule";

/// Refreshes the playlist schedule on a slow fixed cadence.
///
/// Fetches once on start, then once per refresh interval. A failed refresh
/// is logged and the cached schedule is left as it was.
pub struct SchedulePoller {
    source: Arc<dyn ScheduleSource>,
    cache: Arc<PlaylistCache>,
    refresh_interval: Duration,
    timeout: Duration,
    cancel_token: CancellationToken,
}

impl SchedulePoller {
    #[must_use]
    pub fn new(
        source: Arc<dyn ScheduleSource>,
        cache: Arc<PlaylistCache>,
        refresh_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            cache,
            refresh_interval,
            timeout,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancel_token(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Start refreshing in a background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    pub async fn run(&self) {
        info!(
            target: LOG_TARGET,
            "Starting schedule refresh (every {:?})", self.refresh_interval
        );

        let mut ticker = tokio::time::interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(target: LOG_TARGET, "Schedule refresh stopped");
                    break;
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        () = self.cancel_token.cancelled() => break,
                        _ = self.refresh_once() => {}
                    }
                }
            }
        }
    }

    /// Fetch once and cache the result. Returns whether the fetch succeeded.
    pub async fn refresh_once(&self) -> bool {
        let result = tokio::time::timeout(self.timeout, self.source.fetch_schedule())
            .await
            .unwrap_or_else(|_| {
                Err(CoreError::ControllerUnavailable {
                    reason: format!("no response within {:?}", self.timeout),
                })
            });

        match result {
            Ok(entries) => {
                debug!(target: LOG_TARGET, "Cached {} schedule entries", entries.len());
                self.cache.store(entries).await;
                true
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Schedule fetch failed: {}", e);
                false
            }
        }
    }
}
