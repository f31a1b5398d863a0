//! Environment-driven configuration for the queue client and monitor

use crate::core::scheduler::PollProfile;
use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_ENVIRONMENT: &str = "sandbox";
pub const DEFAULT_QUEUE_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_STUCK_JOB_MINUTES: u64 = 60;

/// Current deployment environment (`APP_ENV`), lowercased
pub fn get_environment() -> String {
    env::var("APP_ENV")
        .map(|e| e.trim().to_lowercase())
        .ok()
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}

pub fn is_production() -> bool {
    matches!(get_environment().as_str(), "production" | "prod")
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigLoadError {
    #[error("{var} is not a valid URL ({value}): {reason}")]
    InvalidUrl {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: Url,
    pub api_token: Option<String>,
    pub http_timeout: Duration,
    /// Overrides the poll profile's interval when set
    pub poll_interval: Option<Duration>,
    pub stuck_after: Duration,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_token: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECONDS),
            poll_interval: None,
            stuck_after: Duration::from_secs(DEFAULT_STUCK_JOB_MINUTES * 60),
        }
    }

    pub fn from_env() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; used by `from_env` and tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let raw_url = read("QUEUE_API_URL").unwrap_or_else(|| DEFAULT_QUEUE_API_URL.to_string());
        let base_url = Url::parse(&raw_url).map_err(|e| ConfigLoadError::InvalidUrl {
            var: "QUEUE_API_URL",
            value: raw_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigLoadError::InvalidUrl {
                var: "QUEUE_API_URL",
                value: raw_url,
                reason: "URL cannot carry a path".to_string(),
            });
        }

        let mut config = Self::new(base_url);
        config.api_token = read("QUEUE_API_TOKEN");

        if let Some(secs) = parse_positive("QUEUE_HTTP_TIMEOUT_SECONDS", read("QUEUE_HTTP_TIMEOUT_SECONDS"))? {
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_positive("POLL_INTERVAL_SECONDS", read("POLL_INTERVAL_SECONDS"))? {
            config.poll_interval = Some(Duration::from_secs(secs));
        }
        if let Some(minutes) = parse_positive("STUCK_JOB_MINUTES", read("STUCK_JOB_MINUTES"))? {
            config.stuck_after = Duration::from_secs(minutes * 60);
        }

        Ok(config)
    }

    /// Effective poll interval for a screen using `profile`
    pub fn poll_interval_for(&self, profile: PollProfile) -> Duration {
        self.poll_interval.unwrap_or_else(|| profile.interval())
    }
}

fn parse_positive(var: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigLoadError> {
    match value {
        None => Ok(None),
        Some(raw) => match raw.parse::<u64>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(ConfigLoadError::InvalidNumber { var, value: raw }),
        },
    }
}
