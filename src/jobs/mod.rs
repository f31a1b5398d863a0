//! Backtest job lifecycle: submission, monitoring and notification routing

pub mod client;
pub mod error;
pub mod monitor;
pub mod notification;
pub mod types;

pub use client::{HttpQueueClient, QueueClient};
pub use error::{ActionError, ClientError, SubmitError};
pub use monitor::{ActionResolution, JobMonitor, Reconciliation};
pub use notification::{NotificationChannel, UserProfile};
pub use types::{ActionOutcome, CompletionEvent, CompletionSource, JobHandle, SubmitRequest};
