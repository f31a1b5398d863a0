//! Integration tests for the monitor poll loop
//!
//! The loop runs against an in-memory queue backend with a short interval.

#[path = "test_utils.rs"]
mod test_utils;

use backtest_queue::core::runtime::{MonitorRuntime, RuntimeConfig};
use backtest_queue::jobs::{ActionError, ActionOutcome, CompletionSource, QueueClient};
use backtest_queue::models::{Job, JobId, JobStatus};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{
    latest_result, processing_job, queued_job, sample_request, ActionBehavior, FakeQueueClient,
    Poll,
};
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(2);

fn fast_config() -> RuntimeConfig {
    RuntimeConfig {
        poll_interval: Duration::from_millis(20),
        stuck_after: Duration::from_secs(3600),
    }
}

/// Wait until the published snapshot satisfies `check`
async fn wait_for_jobs<F>(monitor: &backtest_queue::core::runtime::MonitorHandle, check: F)
where
    F: Fn(&[Job]) -> bool,
{
    timeout(WAIT, async {
        loop {
            if check(monitor.jobs().as_slice()) {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("snapshot never matched");
}

#[tokio::test]
async fn disappeared_job_emits_one_event_with_latest_result() {
    let fake = Arc::new(
        FakeQueueClient::new(Vec::new())
            .with_polls(vec![
                Poll::Jobs(vec![processing_job("a", 50.0)]),
                Poll::Jobs(Vec::new()),
            ])
            .with_latest(latest_result(Some("a"))),
    );
    let client: Arc<dyn QueueClient> = fake.clone();
    let (monitor, mut events) =
        MonitorRuntime::spawn(client, fast_config(), vec![processing_job("a", 40.0)]);

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.job_id, JobId::new("a"));
    assert_eq!(event.source, CompletionSource::Disappeared);
    assert_eq!(event.status, None);
    assert_eq!(event.result.map(|r| r.id), Some("result-1".to_string()));

    assert!(timeout(Duration::from_millis(150), events.recv()).await.is_err());
    assert_eq!(FakeQueueClient::count(&fake.latest_calls), 1);
    assert!(monitor.jobs().is_empty());
    monitor.stop().await;
}

#[tokio::test]
async fn result_for_another_job_is_not_attached() {
    let fake = Arc::new(
        FakeQueueClient::new(Vec::new()).with_latest(latest_result(Some("other"))),
    );
    let client: Arc<dyn QueueClient> = fake.clone();
    let (monitor, mut events) =
        MonitorRuntime::spawn(client, fast_config(), vec![processing_job("a", 90.0)]);

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.job_id, JobId::new("a"));
    assert_eq!(event.result, None);
    monitor.stop().await;
}

#[tokio::test]
async fn observed_failure_carries_error_message() {
    let failed = processing_job("a", 60.0)
        .with_status(JobStatus::Failed)
        .with_error("engine crashed");
    let fake = Arc::new(FakeQueueClient::new(vec![failed]));
    let client: Arc<dyn QueueClient> = fake.clone();
    let (monitor, mut events) =
        MonitorRuntime::spawn(client, fast_config(), vec![processing_job("a", 60.0)]);

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.source, CompletionSource::Observed);
    assert_eq!(event.status, Some(JobStatus::Failed));
    assert_eq!(event.error_message.as_deref(), Some("engine crashed"));
    assert_eq!(event.result, None);
    // a failed job needs no result lookup
    assert_eq!(FakeQueueClient::count(&fake.latest_calls), 0);
    monitor.stop().await;
}

#[tokio::test]
async fn cancel_on_already_cancelled_job_is_ok() {
    let cancelled = queued_job("a", 1).with_status(JobStatus::Cancelled);
    let fake = Arc::new(FakeQueueClient::new(vec![cancelled]));
    let client: Arc<dyn QueueClient> = fake.clone();
    let (monitor, mut events) =
        MonitorRuntime::spawn(client, fast_config(), vec![queued_job("a", 1)]);

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.status, Some(JobStatus::Cancelled));

    let outcome = monitor.cancel(&JobId::new("a")).await.unwrap();
    assert_eq!(outcome, ActionOutcome::AlreadySettled);
    assert_eq!(FakeQueueClient::count(&fake.cancel_calls), 0);
    monitor.stop().await;
}

#[tokio::test]
async fn cancel_removes_job_without_completion_event() {
    let fake = Arc::new(FakeQueueClient::new(vec![queued_job("a", 1)]));
    let client: Arc<dyn QueueClient> = fake.clone();
    let (monitor, mut events) =
        MonitorRuntime::spawn(client, fast_config(), vec![queued_job("a", 1)]);

    let outcome = monitor.cancel(&JobId::new("a")).await.unwrap();
    assert_eq!(outcome, ActionOutcome::Applied);
    wait_for_jobs(&monitor, |jobs| jobs.is_empty()).await;

    assert!(timeout(Duration::from_millis(150), events.recv()).await.is_err());
    assert_eq!(FakeQueueClient::count(&fake.cancel_calls), 1);
    monitor.stop().await;
}

#[tokio::test]
async fn force_fail_requires_processing() {
    let fake = Arc::new(FakeQueueClient::new(vec![
        queued_job("q", 1),
        processing_job("p", 10.0),
    ]));
    let client: Arc<dyn QueueClient> = fake.clone();
    let (monitor, _events) = MonitorRuntime::spawn(
        client,
        fast_config(),
        vec![queued_job("q", 1), processing_job("p", 10.0)],
    );

    let err = monitor.force_fail(&JobId::new("q")).await.unwrap_err();
    assert!(matches!(
        err,
        ActionError::InvalidState {
            status: JobStatus::Queued,
            ..
        }
    ));

    let outcome = monitor.force_fail(&JobId::new("p")).await.unwrap();
    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(FakeQueueClient::count(&fake.fail_calls), 1);
    wait_for_jobs(&monitor, |jobs| jobs.len() == 1).await;
    monitor.stop().await;
}

#[tokio::test]
async fn delete_refuses_live_job() {
    let fake = Arc::new(FakeQueueClient::new(vec![queued_job("a", 1)]));
    let client: Arc<dyn QueueClient> = fake.clone();
    let (monitor, _events) =
        MonitorRuntime::spawn(client, fast_config(), vec![queued_job("a", 1)]);

    let err = monitor.delete(&JobId::new("a")).await.unwrap_err();
    assert!(matches!(err, ActionError::InvalidState { action: "delete", .. }));
    monitor.stop().await;
}

#[tokio::test]
async fn submit_tracks_job_before_next_poll() {
    let fake = Arc::new(FakeQueueClient::new(Vec::new()));
    let client: Arc<dyn QueueClient> = fake.clone();
    let config = RuntimeConfig {
        poll_interval: Duration::from_secs(60),
        ..fast_config()
    };
    let (monitor, _events) = MonitorRuntime::spawn(client, config, Vec::new());

    let handle = monitor.submit(&sample_request()).await.unwrap();
    assert_eq!(handle.id, JobId::new("job-new"));

    wait_for_jobs(&monitor, |jobs| jobs.iter().any(|job| job.id == handle.id)).await;
    let jobs = monitor.jobs();
    let job = &jobs[0];
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.queue_position(), Some(2));
    assert_eq!(job.strategy_name, "RSI dip");
    assert!(job.estimated_completion_at.is_some());
    monitor.stop().await;
}

#[tokio::test]
async fn poll_error_is_swallowed() {
    let fake = Arc::new(FakeQueueClient::new(Vec::new()).with_polls(vec![
        Poll::Fail,
        Poll::Jobs(vec![processing_job("a", 30.0)]),
    ]));
    let client: Arc<dyn QueueClient> = fake.clone();
    let (monitor, _events) =
        MonitorRuntime::spawn(client, fast_config(), vec![processing_job("a", 10.0)]);

    wait_for_jobs(&monitor, |jobs| {
        jobs.first().is_some_and(|job| job.progress_percent == 30.0)
    })
    .await;
    assert!(FakeQueueClient::count(&fake.poll_calls) >= 2);
    assert!(monitor.is_running().await);
    monitor.stop().await;
}

#[tokio::test]
async fn stuck_jobs_and_stop() {
    let fake = Arc::new(FakeQueueClient::new(vec![processing_job("a", 10.0)]));
    let client: Arc<dyn QueueClient> = fake.clone();
    let (monitor, _events) =
        MonitorRuntime::spawn(client, fast_config(), vec![processing_job("a", 10.0)]);

    let stuck = monitor.stuck_jobs().await.unwrap();
    assert_eq!(stuck.len(), 1);
    assert_eq!(stuck[0].id, JobId::new("a"));

    monitor.stop().await;
    assert!(!monitor.is_running().await);
    sleep(Duration::from_millis(20)).await;
    assert!(matches!(
        monitor.cancel(&JobId::new("a")).await,
        Err(ActionError::MonitorStopped)
    ));
}

#[tokio::test]
async fn cancel_after_completion_still_raises_completion() {
    let fake = Arc::new(
        FakeQueueClient::new(vec![processing_job("a", 80.0)])
            .with_behavior(ActionBehavior::AlreadyEnded(JobStatus::Completed))
            .with_latest(latest_result(Some("a"))),
    );
    let client: Arc<dyn QueueClient> = fake.clone();
    let (monitor, mut events) =
        MonitorRuntime::spawn(client, fast_config(), vec![processing_job("a", 80.0)]);

    let outcome = monitor.cancel(&JobId::new("a")).await.unwrap();
    assert_eq!(outcome, ActionOutcome::AlreadySettled);

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.job_id, JobId::new("a"));
    assert_eq!(event.source, CompletionSource::Observed);
    assert_eq!(event.status, Some(JobStatus::Completed));
    assert_eq!(event.result.map(|r| r.id), Some("result-1".to_string()));

    assert!(timeout(Duration::from_millis(150), events.recv()).await.is_err());
    monitor.stop().await;
}

#[tokio::test]
async fn rejected_actions_keep_jobs_live() {
    let fake = Arc::new(
        FakeQueueClient::new(vec![queued_job("q", 1), processing_job("p", 10.0)])
            .with_behavior(ActionBehavior::Reject),
    );
    let client: Arc<dyn QueueClient> = fake.clone();
    let (monitor, _events) = MonitorRuntime::spawn(
        client,
        fast_config(),
        vec![queued_job("q", 1), processing_job("p", 10.0)],
    );

    let err = monitor.cancel(&JobId::new("q")).await.unwrap_err();
    assert!(matches!(err, ActionError::Rejected { action: "cancel", .. }));
    let err = monitor.force_fail(&JobId::new("p")).await.unwrap_err();
    assert!(matches!(err, ActionError::Rejected { action: "force-fail", .. }));

    // still live after a few more polls
    sleep(Duration::from_millis(100)).await;
    let jobs = monitor.jobs();
    assert_eq!(jobs.len(), 2);
    assert_eq!(FakeQueueClient::count(&fake.cancel_calls), 1);
    assert_eq!(FakeQueueClient::count(&fake.fail_calls), 1);
    monitor.stop().await;
}

#[tokio::test]
async fn applied_action_survives_monitor_stop() {
    let fake = Arc::new(
        FakeQueueClient::new(vec![queued_job("a", 1)])
            .with_action_delay(Duration::from_millis(200)),
    );
    let client: Arc<dyn QueueClient> = fake.clone();
    let (monitor, _events) =
        MonitorRuntime::spawn(client, fast_config(), vec![queued_job("a", 1)]);

    let handle = monitor.clone();
    let cancel = tokio::spawn(async move { handle.cancel(&JobId::new("a")).await });

    sleep(Duration::from_millis(50)).await;
    monitor.stop().await;

    let outcome = cancel.await.unwrap().unwrap();
    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(FakeQueueClient::count(&fake.cancel_calls), 1);
}
