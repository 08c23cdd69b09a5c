use lumos_core::{CoreError, StatusHub, StatusSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "lumos::fpp::poller";

/// Periodically fetches controller status and publishes it to the hub.
///
/// One fetch runs immediately on start, then one per interval. The loop
/// awaits each fetch before waiting for the next tick, so at most one request
/// is in flight; ticks missed while a fetch was slow are skipped.
pub struct StatusPoller {
    source: Arc<dyn StatusSource>,
    hub: Arc<StatusHub>,
    poll_interval: Duration,
    timeout: Duration,
    cancel_token: CancellationToken,
}

impl StatusPoller {
    /// Create a new status poller
    pub fn new(
        source: Arc<dyn StatusSource>,
        hub: Arc<StatusHub>,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            hub,
            poll_interval,
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

    /// Get a clone of the cancellation token
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Stop the poller
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Start polling in a background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the polling loop until cancelled
    pub async fn run(&self) {
        info!(
            target: LOG_TARGET,
            "Starting {} status poller (every {:?})",
            self.source.name(),
            self.poll_interval
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(target: LOG_TARGET, "Poller shutting down gracefully");
                    break;
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        () = self.cancel_token.cancelled() => {
                            info!(target: LOG_TARGET, "Poller cancelled during fetch");
                            break;
                        }
                        _ = self.poll_once() => {}
                    }
                }
            }
        }
    }

    /// Fetch once and publish the outcome. Returns whether the fetch succeeded.
    pub async fn poll_once(&self) -> bool {
        let was_connected = self.hub.connection().await.connected;

        let result = tokio::time::timeout(self.timeout, self.source.fetch_status())
            .await
            .unwrap_or_else(|_| {
                Err(CoreError::ControllerUnavailable {
                    reason: format!("no response within {:?}", self.timeout),
                })
            });

        match result {
            Ok(snapshot) => {
                debug!(target: LOG_TARGET, "Fetched status: {}", snapshot.play_state);
                self.hub.publish_success(snapshot).await;
                if !was_connected {
                    info!(target: LOG_TARGET, "Controller reachable");
                }
                true
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Status fetch failed: {}", e);
                if was_connected {
                    info!(target: LOG_TARGET, "Controller connection lost");
                }
                self.hub.publish_failure(e.to_string()).await;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lumos_core::{ExternalSnapshot, PlayState};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted outcomes; `None` is a failed fetch. Repeats the last one.
    struct ScriptedSource {
        script: Mutex<VecDeque<Option<PlayState>>>,
        last: Mutex<Option<PlayState>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<Option<PlayState>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(VecDeque::from([Some(PlayState::Playing)])),
                last: Mutex::new(None),
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch_status(&self) -> lumos_core::Result<ExternalSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = {
                let mut script = self.script.lock().unwrap();
                let mut last = self.last.lock().unwrap();
                if let Some(step) = script.pop_front() {
                    *last = step;
                }
                *last
            };
            next.map(ExternalSnapshot::new)
                .ok_or_else(|| CoreError::ControllerUnavailable {
                    reason: "scripted failure".to_string(),
                })
        }
    }

    fn poller(source: Arc<ScriptedSource>, hub: Arc<StatusHub>) -> Arc<StatusPoller> {
        Arc::new(StatusPoller::new(
            source,
            hub,
            Duration::from_secs(5),
            Duration::from_secs(3),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_immediately_then_every_interval() {
        let source = ScriptedSource::new(vec![Some(PlayState::Idle)]);
        let hub = StatusHub::new();
        let poller = poller(source.clone(), hub.clone());
        let handle = poller.clone().start();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(source.calls(), 1);
        assert!(hub.connection().await.connected);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(source.calls(), 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(source.calls(), 4);

        poller.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_clears_snapshot() {
        let source = ScriptedSource::new(vec![Some(PlayState::Playing), None]);
        let hub = StatusHub::new();
        let poller = poller(source, hub.clone());

        assert!(poller.poll_once().await);
        assert_eq!(
            hub.snapshot().await.map(|s| s.play_state),
            Some(PlayState::Playing)
        );

        assert!(!poller.poll_once().await);
        let view = hub.current().await;
        assert!(view.snapshot.is_none());
        assert!(!view.connection.connected);
        assert!(view.connection.last_success.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_times_out() {
        let source = ScriptedSource::slow(Duration::from_secs(60));
        let hub = StatusHub::new();
        let poller = poller(source, hub.clone());

        assert!(!poller.poll_once().await);
        let connection = hub.connection().await;
        assert!(!connection.connected);
        assert!(connection
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("no response")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetches_never_overlap() {
        // Each fetch takes longer than the interval
        let source = ScriptedSource::slow(Duration::from_secs(7));
        let hub = StatusHub::new();
        let poller = Arc::new(StatusPoller::new(
            source.clone(),
            hub,
            Duration::from_secs(5),
            Duration::from_secs(8),
        ));
        let handle = poller.clone().start();

        tokio::time::sleep(Duration::from_millis(6500)).await;
        assert_eq!(source.calls(), 1);

        // The late tick fires as soon as the first fetch finishes at 7s
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls(), 2);

        // Second fetch runs until 14s; nothing starts meanwhile
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(source.calls(), 2);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls(), 3);

        poller.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_shared_cancel_token() {
        let token = CancellationToken::new();
        let source = ScriptedSource::new(vec![Some(PlayState::Idle)]);
        let poller = Arc::new(
            StatusPoller::new(
                source.clone(),
                StatusHub::new(),
                Duration::from_secs(5),
                Duration::from_secs(3),
            )
            .with_cancel_token(token.clone()),
        );
        let handle = poller.start();

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls(), 1);
    }
}
