use crate::resolver::{resolve, ShowViewModel};
use crate::schedule::ScheduleTable;
use crate::snapshot::ExternalSnapshot;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Reachability of the show controller as seen by the poller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    /// When the last successful fetch completed
    pub last_success: Option<DateTime<Utc>>,
    /// Reason for the most recent failed fetch, cleared on success
    pub last_error: Option<String>,
}

/// Events emitted by the status hub
#[derive(Debug, Clone)]
pub enum StatusEvent {
    /// A fetch succeeded after a failure (or for the first time)
    Connected,
    /// A fetch failed after a success (or for the first time)
    Disconnected { reason: String },
    /// The snapshot content changed
    SnapshotUpdated { snapshot: Arc<ExternalSnapshot> },
}

/// A consistent pair of the latest snapshot and connection status.
#[derive(Debug, Clone, Default)]
pub struct StatusView {
    pub snapshot: Option<Arc<ExternalSnapshot>>,
    pub connection: ConnectionStatus,
}

impl StatusView {
    /// Resolve the show view model for `now` from this pair.
    #[must_use]
    pub fn resolve<Tz: TimeZone>(&self, now: &DateTime<Tz>, table: &ScheduleTable) -> ShowViewModel {
        resolve(now, self.snapshot.as_deref(), table)
    }
}

/// Shared holder of the latest controller status.
///
/// The poller is the only writer. Both records are replaced together in one
/// write, so readers always see a self-consistent pair. A failed fetch clears
/// the snapshot: stale positions are never shown as live data.
pub struct StatusHub {
    inner: RwLock<StatusView>,
    event_tx: broadcast::Sender<StatusEvent>,
}

impl StatusHub {
    /// Create a new status hub
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Subscribe to status events
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.event_tx.subscribe()
    }

    /// Record a successful fetch
    pub async fn publish_success(&self, snapshot: ExternalSnapshot) {
        self.publish_success_at(snapshot, Utc::now()).await;
    }

    /// Record a successful fetch that completed at `at`
    pub async fn publish_success_at(&self, snapshot: ExternalSnapshot, at: DateTime<Utc>) {
        let snapshot = Arc::new(snapshot);
        let mut inner = self.inner.write().await;

        let was_connected = inner.connection.connected;
        let changed = inner.snapshot.as_deref() != Some(snapshot.as_ref());

        *inner = StatusView {
            snapshot: Some(snapshot.clone()),
            connection: ConnectionStatus {
                connected: true,
                last_success: Some(at),
                last_error: None,
            },
        };

        if !was_connected {
            let _ = self.event_tx.send(StatusEvent::Connected);
        }
        if changed {
            let _ = self.event_tx.send(StatusEvent::SnapshotUpdated { snapshot });
        }
    }

    /// Record a failed fetch
    pub async fn publish_failure(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let mut inner = self.inner.write().await;

        let first_failure = inner.connection.connected || inner.connection.last_error.is_none();
        let last_success = inner.connection.last_success;

        *inner = StatusView {
            snapshot: None,
            connection: ConnectionStatus {
                connected: false,
                last_success,
                last_error: Some(reason.clone()),
            },
        };

        if first_failure {
            let _ = self.event_tx.send(StatusEvent::Disconnected { reason });
        }
    }

    /// Get the current snapshot and connection status
    pub async fn current(&self) -> StatusView {
        self.inner.read().await.clone()
    }

    /// Get the current snapshot, if the last fetch succeeded
    pub async fn snapshot(&self) -> Option<Arc<ExternalSnapshot>> {
        self.inner.read().await.snapshot.clone()
    }

    /// Get the current connection status
    pub async fn connection(&self) -> ConnectionStatus {
        self.inner.read().await.connection.clone()
    }

    /// Resolve the view model for `now` from one consistent read
    pub async fn resolve_now<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        table: &ScheduleTable,
    ) -> (ShowViewModel, ConnectionStatus) {
        let view = self.current().await;
        (view.resolve(now, table), view.connection)
    }
}

impl Default for StatusHub {
    fn default() -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            inner: RwLock::new(StatusView::default()),
            event_tx,
        }
    }
}
