use crate::error::FppError;
use async_trait::async_trait;
use lumos_core::{
    parse_playlist_schedule, relay_error, ControllerConfig, CoreError, ExternalSnapshot,
    PlaylistEntry, ScheduleSource, StatusSource,
};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

const LOG_TARGET: &str = "lumos::fpp::client";

/// HTTP client for the controller's status and schedule endpoints.
///
/// Works against FPP directly or against a relay in front of it. A relay
/// placeholder payload (one carrying an `error` field) counts as a failure.
pub struct FppClient {
    client: reqwest::Client,
    status_url: Url,
    schedule_url: Url,
    timeout: Duration,
}

impl FppClient {
    /// Create a client for the configured controller
    ///
    /// # Errors
    ///
    /// Returns an error if the controller URL is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: &ControllerConfig) -> Result<Self, FppError> {
        let status_url = config
            .status_url()
            .map_err(|e| FppError::InvalidUrl(e.to_string()))?;
        let schedule_url = config
            .schedule_url()
            .map_err(|e| FppError::InvalidUrl(e.to_string()))?;
        let timeout = config.timeout();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("lumos/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            status_url,
            schedule_url,
            timeout,
        })
    }

    #[must_use]
    pub const fn status_url(&self) -> &Url {
        &self.status_url
    }

    #[must_use]
    pub const fn schedule_url(&self) -> &Url {
        &self.schedule_url
    }

    /// Fetch and normalize one status payload
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, timeout, non-2xx status, a body
    /// that isn't JSON, or a relay placeholder.
    pub async fn fetch(&self) -> Result<ExternalSnapshot, FppError> {
        let value = self.get_json(&self.status_url).await?;

        let snapshot = ExternalSnapshot::from_status_json(&value);
        debug!(
            target: LOG_TARGET,
            "Controller status: state={}, item={:?}, remaining={:?}",
            snapshot.play_state,
            snapshot.current_item,
            snapshot.remaining
        );
        Ok(snapshot)
    }

    /// Fetch the enabled playlist schedule entries
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, timeout, non-2xx status, a body
    /// that isn't JSON, a relay placeholder, or a payload that isn't a list.
    pub async fn fetch_schedule(&self) -> Result<Vec<PlaylistEntry>, FppError> {
        let value = self.get_json(&self.schedule_url).await?;
        let entries = parse_playlist_schedule(&value).ok_or(FppError::InvalidSchedule)?;
        debug!(target: LOG_TARGET, "Controller schedule: {} enabled entries", entries.len());
        Ok(entries)
    }

    async fn get_json(&self, url: &Url) -> Result<Value, FppError> {
        debug!(target: LOG_TARGET, "GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FppError::Status(status));
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let value: Value = serde_json::from_str(&body)?;

        if let Some(reason) = relay_error(&value) {
            return Err(FppError::Relay(reason));
        }
        Ok(value)
    }

    fn classify(&self, err: reqwest::Error) -> FppError {
        if err.is_timeout() {
            FppError::Timeout(self.timeout)
        } else {
            FppError::Http(err)
        }
    }
}

#[async_trait]
impl StatusSource for FppClient {
    fn name(&self) -> &'static str {
        "fpp"
    }

    async fn fetch_status(&self) -> Result<ExternalSnapshot, CoreError> {
        self.fetch().await.map_err(Into::into)
    }
}

#[async_trait]
impl ScheduleSource for FppClient {
    async fn fetch_schedule(&self) -> Result<Vec<PlaylistEntry>, CoreError> {
        FppClient::fetch_schedule(self).await.map_err(Into::into)
    }
}
