//! Poll cadence for the job monitor

use std::fmt;
use std::time::Duration;

/// How often a consumer refreshes the live job list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollProfile {
    /// A screen following one job's progress
    #[default]
    JobProgress,
    /// List-level admin views
    AdminList,
}

impl PollProfile {
    pub fn interval(&self) -> Duration {
        match self {
            PollProfile::JobProgress => Duration::from_secs(3),
            PollProfile::AdminList => Duration::from_secs(10),
        }
    }
}

impl fmt::Display for PollProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollProfile::JobProgress => write!(f, "job-progress"),
            PollProfile::AdminList => write!(f, "admin-list"),
        }
    }
}
