use lumos_core::CoreError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FppError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Controller returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("Invalid status JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Relay could not reach the controller: {0}")]
    Relay(String),

    #[error("Schedule payload is not a list")]
    InvalidSchedule,

    #[error("Invalid controller URL: {0}")]
    InvalidUrl(String),
}

impl From<FppError> for CoreError {
    fn from(err: FppError) -> Self {
        Self::ControllerUnavailable {
            reason: err.to_string(),
        }
    }
}
