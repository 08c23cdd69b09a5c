use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Shortest poll interval accepted, to keep load on the controller reasonable.
pub const MIN_POLL_INTERVAL_MS: u64 = 500;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LumosConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub donations: DonationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Show controller (FPP) connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Endpoint root, e.g. `http://192.168.1.166/api`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Status path relative to `base_url`
    #[serde(default = "default_status_path")]
    pub status_path: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Upper bound for a single status fetch
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    /// Playlist schedule path relative to `base_url`
    #[serde(default = "default_schedule_path")]
    pub schedule_path: String,
    #[serde(default = "default_schedule_refresh")]
    pub schedule_refresh_ms: u64,
}

fn default_base_url() -> String {
    "http://192.168.1.166/api".to_string()
}

fn default_status_path() -> String {
    "fppd/status".to_string()
}

fn default_schedule_path() -> String {
    "schedule".to_string()
}

const fn default_schedule_refresh() -> u64 {
    60_000
}

const fn default_poll_interval() -> u64 {
    5000
}

const fn default_timeout() -> u64 {
    3000
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            status_path: default_status_path(),
            poll_interval_ms: default_poll_interval(),
            timeout_ms: default_timeout(),
            schedule_path: default_schedule_path(),
            schedule_refresh_ms: default_schedule_refresh(),
        }
    }
}

impl ControllerConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub const fn schedule_refresh(&self) -> Duration {
        Duration::from_millis(self.schedule_refresh_ms)
    }

    /// Parsed endpoint root, always ending in `/` so relative joins append.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute http(s) URL.
    pub fn base(&self) -> Result<Url> {
        let mut base = self.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let url = Url::parse(&base).map_err(|e| CoreError::ConfigInvalid {
            message: format!("controller.base_url '{}': {e}", self.base_url),
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(CoreError::ConfigInvalid {
                message: format!("controller.base_url '{}' must be an http(s) URL", self.base_url),
            });
        }
        Ok(url)
    }

    /// Full URL of the status endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or status path is invalid.
    pub fn status_url(&self) -> Result<Url> {
        self.base()?
            .join(self.status_path.trim_start_matches('/'))
            .map_err(|e| CoreError::ConfigInvalid {
                message: format!("controller.status_path '{}': {e}", self.status_path),
            })
    }

    /// Full URL of the playlist schedule endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or schedule path is invalid.
    pub fn schedule_url(&self) -> Result<Url> {
        self.base()?
            .join(self.schedule_path.trim_start_matches('/'))
            .map_err(|e| CoreError::ConfigInvalid {
                message: format!("controller.schedule_path '{}': {e}", self.schedule_path),
            })
    }

    /// Scheme, host and port of the controller, used to forward relay paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid.
    pub fn origin(&self) -> Result<Url> {
        let mut origin = self.base()?;
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);
        Ok(origin)
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl ServerConfig {
    /// # Errors
    ///
    /// Returns an error if `bind_address` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address
            .parse()
            .map_err(|e| CoreError::ConfigInvalid {
                message: format!("server.bind_address '{}': {e}", self.bind_address),
            })
    }
}

/// Controller relay (proxy) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Retries for transient upstream failures before returning the placeholder
    #[serde(default = "default_upstream_retries")]
    pub upstream_retries: u32,
}

const fn default_true() -> bool {
    true
}

const fn default_upstream_retries() -> u32 {
    1
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            upstream_retries: default_upstream_retries(),
        }
    }
}

/// Donation leaderboard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Rows returned when the client doesn't ask for a specific count
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: u32,
    /// Database file; defaults to `~/.config/lumos/donations.db`
    #[serde(default)]
    pub database: Option<PathBuf>,
}

const fn default_leaderboard_size() -> u32 {
    10
}

impl Default for DonationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            leaderboard_size: default_leaderboard_size(),
            database: None,
        }
    }
}

impl DonationsConfig {
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(crate::paths::donations_db_path)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to `~/.config/lumos/lumos.log`
    #[serde(default)]
    pub enabled: bool,
}

impl LumosConfig {
    /// Get the configuration directory path (~/.config/lumos/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/lumos/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default location or create the template on first run
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, parsed or validated,
    /// or `ConfigNotFound` after writing a fresh template.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Load config from `config_path` or write the template there
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, parsed or validated,
    /// or `ConfigNotFound` after writing a fresh template.
    pub fn load_or_create_at(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            // Create config directory if it doesn't exist
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound {
                path: config_path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(config_path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde defaults can't guard
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let controller = &self.controller;
        controller.status_url()?;
        controller.schedule_url()?;

        if controller.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "controller.poll_interval_ms must be at least {MIN_POLL_INTERVAL_MS}"
                ),
            });
        }
        if controller.timeout_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "controller.timeout_ms must be greater than 0".to_string(),
            });
        }
        if controller.timeout_ms >= controller.poll_interval_ms {
            return Err(CoreError::ConfigInvalid {
                message: "controller.timeout_ms must be shorter than controller.poll_interval_ms"
                    .to_string(),
            });
        }
        if controller.schedule_refresh_ms <= controller.timeout_ms {
            return Err(CoreError::ConfigInvalid {
                message:
                    "controller.schedule_refresh_ms must be longer than controller.timeout_ms"
                        .to_string(),
            });
        }

        self.server.socket_addr()?;

        if self.donations.enabled && self.donations.leaderboard_size == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "donations.leaderboard_size must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Template written on first run. Values match the serde defaults.
pub const CONFIG_TEMPLATE: &str = r##"# Huset Lumos live status configuration
# ~/.config/lumos/config.toml

[controller]
# Endpoint root of the show controller's HTTP API
base_url = "http://192.168.1.166/api"
status_path = "fppd/status"
# How often to poll the controller (minimum 500)
poll_interval_ms = 5000
# Per-request timeout; must be shorter than the poll interval
timeout_ms = 3000
# Playlist schedule shown at /api/schedule, refreshed once a minute
schedule_path = "schedule"
schedule_refresh_ms = 60000

[server]
bind_address = "127.0.0.1:8080"

[relay]
# Serve /api/fpp-proxy so browsers can reach the controller
enabled = true
upstream_retries = 1

[donations]
enabled = true
leaderboard_size = 10
# database = "/var/lib/lumos/donations.db"

[logging]
# Also write logs to ~/.config/lumos/lumos.log
enabled = false
"##;
