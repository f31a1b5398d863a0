use crate::models::job::{JobId, JobStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} answered {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("could not decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("invalid queue API URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("could not build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Quota exhausted; show the upgrade path instead of a retry
    #[error("backtest limit reached: {message}")]
    LimitReached {
        message: String,
        upgrade: Option<String>,
    },

    #[error("submission rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("job {id} is {status}; {action} is not allowed")]
    InvalidState {
        id: JobId,
        status: JobStatus,
        action: &'static str,
    },

    #[error("{action} on {target} rejected: {message}")]
    Rejected {
        target: String,
        action: &'static str,
        message: String,
    },

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("job monitor is not running")]
    MonitorStopped,
}
