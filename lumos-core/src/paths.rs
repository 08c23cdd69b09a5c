//! Where lumos keeps its files. Everything lives under `~/.config/lumos/`.

use std::path::PathBuf;

pub const CONFIG_DIR_NAME: &str = "lumos";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DONATIONS_DB_FILE_NAME: &str = "donations.db";
pub const LOG_FILE_NAME: &str = "lumos.log";

/// `~/.config/lumos`, or `./.config/lumos` when there is no home directory
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Used when `donations.database` is unset
#[must_use]
pub fn donations_db_path() -> PathBuf {
    config_dir().join(DONATIONS_DB_FILE_NAME)
}

/// Written only when `logging.enabled` is set
#[must_use]
pub fn log_file_path() -> PathBuf {
    config_dir().join(LOG_FILE_NAME)
}
