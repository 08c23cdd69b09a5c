use crate::relay::Relay;
use lumos_core::{DonationStore, PlaylistCache, ScheduleTable, StatusHub};
use std::sync::Arc;

/// Shared state handed to every HTTP handler
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<StatusHub>,
    pub schedule: ScheduleTable,
    /// Latest playlist schedule from the controller
    pub playlists: Arc<PlaylistCache>,
    /// `None` when the relay is disabled
    pub relay: Option<Arc<Relay>>,
    /// `None` when donations are disabled
    pub donations: Option<Arc<DonationStore>>,
    /// Rows returned by the leaderboard when no limit is given
    pub leaderboard_size: u32,
}

impl AppState {
    #[must_use]
    pub fn new(hub: Arc<StatusHub>, leaderboard_size: u32) -> Self {
        Self {
            hub,
            schedule: ScheduleTable::default(),
            playlists: PlaylistCache::new(),
            relay: None,
            donations: None,
            leaderboard_size,
        }
    }

    #[must_use]
    pub fn with_playlists(mut self, playlists: Arc<PlaylistCache>) -> Self {
        self.playlists = playlists;
        self
    }

    #[must_use]
    pub fn with_relay(mut self, relay: Relay) -> Self {
        self.relay = Some(Arc::new(relay));
        self
    }

    #[must_use]
    pub fn with_donations(mut self, store: DonationStore) -> Self {
        self.donations = Some(Arc::new(store));
        self
    }
}
