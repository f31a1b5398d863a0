//! Backtest job snapshots as reported by the queue

use crate::jobs::notification::NotificationChannel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Queue identifiers arrive as strings or plain numbers depending on the backend
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Null counts as absent so one sparse row cannot fail a whole listing
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_string_or_number(deserializer)?.unwrap_or_default())
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    }))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        string_or_number(deserializer).map(JobId)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Allowed edges of the job state machine; terminal states have none
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match self {
            JobStatus::Queued => matches!(
                next,
                JobStatus::Processing | JobStatus::Cancelled | JobStatus::Failed
            ),
            JobStatus::Processing => matches!(
                next,
                JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
            ),
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Snapshot of one queued backtest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    #[serde(default, deserialize_with = "string_or_number_or_default")]
    pub owner_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub strategy_name: String,
    pub status: JobStatus,
    #[serde(default)]
    queue_position: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress_percent: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_duration_seconds: Option<u64>,
    #[serde(default)]
    pub estimated_completion_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notify_via: NotificationChannel,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Job {
    pub fn queued(
        id: impl Into<JobId>,
        strategy_name: impl Into<String>,
        queue_position: Option<u32>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: String::new(),
            strategy_name: strategy_name.into(),
            status: JobStatus::Queued,
            queue_position,
            progress_percent: 0.0,
            created_at,
            started_at: None,
            completed_at: None,
            estimated_duration_seconds: None,
            estimated_completion_at: None,
            notify_via: NotificationChannel::default(),
            error_message: None,
        }
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = owner_id.into();
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_progress(mut self, progress_percent: f64) -> Self {
        self.progress_percent = progress_percent;
        self
    }

    pub fn with_queue_position(mut self, queue_position: Option<u32>) -> Self {
        self.queue_position = queue_position;
        self
    }

    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    pub fn with_notify_via(mut self, channel: NotificationChannel) -> Self {
        self.notify_via = channel;
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Queue position is only meaningful while the job waits in the queue
    pub fn queue_position(&self) -> Option<u32> {
        match self.status {
            JobStatus::Queued => self.queue_position,
            _ => None,
        }
    }

    /// Drop fields the status does not define and clamp progress to 0..=100
    pub fn normalized(mut self) -> Self {
        if self.status != JobStatus::Queued {
            self.queue_position = None;
        }
        self.progress_percent = if self.progress_percent.is_finite() {
            self.progress_percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self
    }
}

/// Most recent finished backtest of the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedResult {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub job_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub strategy_name: String,
    pub completed_at: DateTime<Utc>,
}

impl CompletedResult {
    /// Whether this result can be attributed to `job`; unknown origin matches any job
    pub fn belongs_to(&self, job: &JobId) -> bool {
        match &self.job_id {
            Some(id) => id == job.as_str(),
            None => true,
        }
    }
}
