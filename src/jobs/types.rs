//! Request and response types exchanged with the backtest queue

use crate::jobs::notification::{select_channel, NotificationChannel, NotificationError, UserProfile};
use crate::models::job::{CompletedResult, Job, JobId, JobStatus};
use crate::strategies::payload::StrategyPayload;
use crate::strategies::validator::ValidatedStrategy;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/backtests`. Only constructible from a validated strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    payload: StrategyPayload,
    notify_via: NotificationChannel,
}

impl SubmitRequest {
    /// Freeze the payload and channel; the channel is checked against `profile`
    pub fn new(
        strategy: &ValidatedStrategy,
        notify_via: NotificationChannel,
        profile: &UserProfile,
    ) -> Result<Self, NotificationError> {
        let notify_via = select_channel(profile, notify_via)?;
        Ok(Self {
            payload: StrategyPayload::from(strategy),
            notify_via,
        })
    }

    pub fn payload(&self) -> &StrategyPayload {
        &self.payload
    }

    pub fn notify_via(&self) -> NotificationChannel {
        self.notify_via
    }

    pub fn strategy_name(&self) -> &str {
        &self.payload.strategy_name
    }
}

/// Accepted submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    #[serde(rename = "queueId")]
    pub id: JobId,
    #[serde(default)]
    pub queue_position: Option<u32>,
    #[serde(default)]
    pub estimated_wait_minutes: Option<f64>,
}

/// Error body returned by the queue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRejection {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub limit_reached: bool,
    #[serde(default)]
    pub upgrade: Option<String>,
}

impl JobHandle {
    /// The queued job a fresh handle stands for, shown before the first poll
    pub fn to_job(
        &self,
        strategy_name: impl Into<String>,
        notify_via: NotificationChannel,
        now: DateTime<Utc>,
    ) -> Job {
        let mut job = Job::queued(self.id.clone(), strategy_name, self.queue_position, now)
            .with_notify_via(notify_via);
        job.estimated_completion_at = self
            .estimated_wait_minutes
            .filter(|m| m.is_finite() && *m >= 0.0)
            .map(|m| now + Duration::seconds((m * 60.0).round() as i64));
        job
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetStuckResponse {
    pub reset: u32,
}

/// How a finished job came to be noticed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSource {
    /// A terminal status was seen in a snapshot
    Observed,
    /// The job vanished from the live set between two polls
    Disappeared,
}

/// Raised exactly once per job when it leaves the live set
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionEvent {
    pub job_id: JobId,
    pub strategy_name: String,
    /// `None` when the job disappeared without a terminal status
    pub status: Option<JobStatus>,
    pub result: Option<CompletedResult>,
    pub error_message: Option<String>,
    pub source: CompletionSource,
}

/// Result of a user or admin action that succeeded from the caller's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    /// The server or local state says the job was already past the action
    AlreadySettled,
}
