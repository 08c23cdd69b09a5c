pub mod config;
pub mod countdown;
pub mod donations;
pub mod error;
pub mod hub;
pub mod names;
pub mod paths;
pub mod playlists;
pub mod resolver;
pub mod schedule;
pub mod snapshot;
pub mod source;
pub mod time;

pub use config::{
    ControllerConfig, DonationsConfig, LoggingConfig, LumosConfig, RelayConfig, ServerConfig,
    CONFIG_TEMPLATE,
};
pub use countdown::format_countdown;
pub use donations::{Donation, DonationStore, NewDonation};
pub use error::{CoreError, Result};
pub use hub::{ConnectionStatus, StatusEvent, StatusHub, StatusView};
pub use names::format_sequence_name;
pub use paths::{
    config_dir, donations_db_path, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
    DONATIONS_DB_FILE_NAME, LOG_FILE_NAME,
};
pub use playlists::{
    classify, parse_playlist_schedule, EntryStatus, PlaylistCache, PlaylistEntry, PlaylistSchedule,
    ScheduledPlaylist,
};
pub use resolver::{resolve, ShowViewModel};
pub use schedule::{HourWindow, ScheduleRule, ScheduleTable, Season, Theme};
pub use snapshot::{relay_error, ExternalSnapshot, PlayState};
pub use source::{ScheduleSource, StatusSource};
