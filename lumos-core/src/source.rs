//! Traits for fetching from the show controller.

use crate::error::Result;
use crate::playlists::PlaylistEntry;
use crate::snapshot::ExternalSnapshot;
use async_trait::async_trait;

/// Something that can fetch the show controller's current status.
///
/// Implementations perform exactly one request per call and report any
/// failure (network error, timeout, non-2xx status, invalid body, relay
/// placeholder) as an error. Retrying is the caller's job; the poller simply
/// tries again on its next tick.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fetch and normalize one status snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller could not be reached or did not
    /// return a usable payload.
    async fn fetch_status(&self) -> Result<ExternalSnapshot>;
}

/// Something that can fetch the controller's playlist schedule.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Fetch the enabled schedule entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller could not be reached or the payload
    /// is not a schedule list.
    async fn fetch_schedule(&self) -> Result<Vec<PlaylistEntry>>;
}
