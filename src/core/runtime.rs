//! Poll loop that owns the job monitor
//!
//! One tokio task per monitor. It polls the queue, reconciles the answer,
//! publishes an immutable snapshot through a `watch` channel and emits
//! completion events on an `mpsc` channel. Cycles never overlap: the next one
//! is scheduled only after the previous one settled. Actions run on the
//! caller's task and only send begin/finish markers to the loop.

use crate::config::{ClientConfig, DEFAULT_STUCK_JOB_MINUTES};
use crate::core::scheduler::PollProfile;
use crate::jobs::client::QueueClient;
use crate::jobs::error::{ActionError, SubmitError};
use crate::jobs::monitor::{ActionResolution, JobMonitor, Reconciliation};
use crate::jobs::types::{ActionOutcome, CompletionEvent, CompletionSource, JobHandle, SubmitRequest};
use crate::models::job::{CompletedResult, Job, JobId, JobStatus};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_STUCK_AFTER: Duration = Duration::from_secs(DEFAULT_STUCK_JOB_MINUTES * 60);

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub poll_interval: Duration,
    /// Processing time after which a job counts as stuck
    pub stuck_after: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval: PollProfile::default().interval(),
            stuck_after: DEFAULT_STUCK_AFTER,
        }
    }
}

impl RuntimeConfig {
    pub fn for_profile(config: &ClientConfig, profile: PollProfile) -> Self {
        Self {
            poll_interval: config.poll_interval_for(profile),
            stuck_after: config.stuck_after,
        }
    }
}

/// What the loop knows about one job
#[derive(Debug, Clone, PartialEq)]
pub struct JobView {
    pub live: Option<Job>,
    pub settled: Option<JobStatus>,
    pub is_settled: bool,
    pub pending: bool,
}

enum Command {
    Track(Job),
    BeginAction(JobId),
    FinishAction(JobId, ActionResolution),
    Inspect(JobId, oneshot::Sender<JobView>),
    Stuck(chrono::Duration, oneshot::Sender<Vec<Job>>),
}

pub struct MonitorRuntime;

impl MonitorRuntime {
    /// Spawn the poll loop; `initial` seeds the live set (e.g. from an earlier listing)
    pub fn spawn(
        client: Arc<dyn QueueClient>,
        config: RuntimeConfig,
        initial: Vec<Job>,
    ) -> (MonitorHandle, mpsc::UnboundedReceiver<CompletionEvent>) {
        let monitor = JobMonitor::with_jobs(initial);
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(monitor.snapshot()));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        info!(
            interval_ms = config.poll_interval.as_millis() as u64,
            tracked = monitor.len(),
            "MonitorRuntime: starting poll loop every {:?}",
            config.poll_interval
        );

        let task = tokio::spawn(run_loop(
            client.clone(),
            config.poll_interval,
            monitor,
            command_rx,
            snapshot_tx,
            event_tx,
        ));

        let handle = MonitorHandle {
            client,
            commands: command_tx,
            snapshots: snapshot_rx,
            stuck_after: config.stuck_after,
            task: Arc::new(RwLock::new(Some(task))),
        };
        (handle, event_rx)
    }
}

async fn run_loop(
    client: Arc<dyn QueueClient>,
    interval: Duration,
    mut monitor: JobMonitor,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<Arc<Vec<Job>>>,
    events: mpsc::UnboundedSender<CompletionEvent>,
) {
    let mut next_poll = Instant::now();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => {
                    if apply_command(&mut monitor, command) {
                        snapshots.send_replace(Arc::new(monitor.snapshot()));
                    }
                }
                None => break,
            },
            _ = sleep_until(next_poll) => {
                monitor.mark_poll_started();
                let fetch = client.live_jobs();
                tokio::pin!(fetch);

                // Keep serving actions while the request is in flight
                let result = loop {
                    tokio::select! {
                        result = &mut fetch => break result,
                        command = commands.recv() => match command {
                            Some(command) => {
                                if apply_command(&mut monitor, command) {
                                    snapshots.send_replace(Arc::new(monitor.snapshot()));
                                }
                            }
                            None => {
                                debug!("MonitorRuntime: all handles dropped, stopping");
                                return;
                            }
                        },
                    }
                };

                match result {
                    Ok(jobs) => {
                        let reconciliation = monitor.apply_snapshot(jobs);
                        snapshots.send_replace(Arc::new(monitor.snapshot()));
                        if !reconciliation.stale.is_empty() {
                            debug!(
                                count = reconciliation.stale.len(),
                                "MonitorRuntime: ignored {} stale snapshots",
                                reconciliation.stale.len()
                            );
                        }
                        if reconciliation.has_completions() {
                            emit_completions(client.as_ref(), reconciliation, &events).await;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "MonitorRuntime: poll failed, retrying next cycle");
                    }
                }

                next_poll = Instant::now() + interval;
            }
        }
    }

    info!("MonitorRuntime: poll loop stopped");
}

/// Returns true when the live set may have changed
fn apply_command(monitor: &mut JobMonitor, command: Command) -> bool {
    match command {
        Command::Track(job) => {
            debug!(job_id = %job.id, "MonitorRuntime: tracking job {}", job.id);
            monitor.track(job)
        }
        Command::BeginAction(id) => {
            monitor.begin_action(&id);
            false
        }
        Command::FinishAction(id, resolution) => monitor.finish_action(&id, resolution).is_some(),
        Command::Inspect(id, reply) => {
            let view = JobView {
                live: monitor.get(&id).cloned(),
                settled: monitor.settled_status(&id),
                is_settled: monitor.is_settled(&id),
                pending: monitor.is_pending(&id),
            };
            let _ = reply.send(view);
            false
        }
        Command::Stuck(window, reply) => {
            let stuck = monitor
                .stuck_jobs(Utc::now(), window)
                .into_iter()
                .cloned()
                .collect();
            let _ = reply.send(stuck);
            false
        }
    }
}

/// One latest-result lookup per cycle, shared by every job that finished in it
async fn emit_completions(
    client: &dyn QueueClient,
    reconciliation: Reconciliation,
    events: &mpsc::UnboundedSender<CompletionEvent>,
) {
    let wants_result = !reconciliation.disappeared.is_empty()
        || reconciliation
            .finished
            .iter()
            .any(|job| job.status == JobStatus::Completed);

    let latest = if wants_result {
        match client.latest_result().await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "MonitorRuntime: could not fetch latest result");
                None
            }
        }
    } else {
        None
    };

    let attach = |job: &Job| -> Option<CompletedResult> {
        latest.as_ref().filter(|r| r.belongs_to(&job.id)).cloned()
    };

    for job in reconciliation.finished {
        let result = match job.status {
            JobStatus::Completed => attach(&job),
            _ => None,
        };
        info!(
            job_id = %job.id,
            status = %job.status,
            "MonitorRuntime: job {} finished as {}",
            job.id,
            job.status
        );
        let _ = events.send(CompletionEvent {
            result,
            status: Some(job.status),
            error_message: job.error_message.clone(),
            strategy_name: job.strategy_name.clone(),
            job_id: job.id,
            source: CompletionSource::Observed,
        });
    }

    for job in reconciliation.disappeared {
        let result = attach(&job);
        info!(
            job_id = %job.id,
            result_id = ?result.as_ref().map(|r| r.id.as_str()),
            "MonitorRuntime: job {} left the queue",
            job.id
        );
        let _ = events.send(CompletionEvent {
            result,
            status: None,
            error_message: None,
            strategy_name: job.strategy_name.clone(),
            job_id: job.id,
            source: CompletionSource::Disappeared,
        });
    }
}

/// Cheap to clone; every clone talks to the same loop
#[derive(Clone)]
pub struct MonitorHandle {
    client: Arc<dyn QueueClient>,
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Arc<Vec<Job>>>,
    stuck_after: Duration,
    task: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl MonitorHandle {
    fn send(&self, command: Command) -> Result<(), ActionError> {
        self.commands
            .send(command)
            .map_err(|_| ActionError::MonitorStopped)
    }

    async fn inspect(&self, id: &JobId) -> Result<JobView, ActionError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Inspect(id.clone(), reply))?;
        response.await.map_err(|_| ActionError::MonitorStopped)
    }

    /// Submit and start tracking the new job before the first poll
    pub async fn submit(&self, request: &SubmitRequest) -> Result<JobHandle, SubmitError> {
        let handle = self.client.submit(request).await?;
        let job = handle.to_job(request.strategy_name(), request.notify_via(), Utc::now());
        if self.commands.send(Command::Track(job)).is_err() {
            warn!(job_id = %handle.id, "MonitorRuntime: submitted job {} but monitor is stopped", handle.id);
        }
        Ok(handle)
    }

    pub async fn cancel(&self, id: &JobId) -> Result<ActionOutcome, ActionError> {
        let view = self.inspect(id).await?;
        match view.settled {
            Some(JobStatus::Cancelled) => return Ok(ActionOutcome::AlreadySettled),
            Some(status) => {
                return Err(ActionError::InvalidState {
                    id: id.clone(),
                    status,
                    action: "cancel",
                })
            }
            None => {}
        }

        self.run_action(id, Some(JobStatus::Cancelled), self.client.cancel(id))
            .await
    }

    /// Remove a finished job from the listing
    pub async fn delete(&self, id: &JobId) -> Result<ActionOutcome, ActionError> {
        let view = self.inspect(id).await?;
        if let Some(job) = view.live {
            return Err(ActionError::InvalidState {
                id: id.clone(),
                status: job.status,
                action: "delete",
            });
        }
        self.run_action(id, view.settled, self.client.delete(id)).await
    }

    /// Admin: fail a job that is processing
    pub async fn force_fail(&self, id: &JobId) -> Result<ActionOutcome, ActionError> {
        let view = self.inspect(id).await?;
        let known = view.live.as_ref().map(|job| job.status).or(view.settled);
        if let Some(status) = known.filter(|s| *s != JobStatus::Processing) {
            return Err(ActionError::InvalidState {
                id: id.clone(),
                status,
                action: "force-fail",
            });
        }
        self.run_action(id, Some(JobStatus::Failed), self.client.force_fail(id))
            .await
    }

    /// Admin: fail every job stuck in processing. The next poll reports them.
    pub async fn reset_stuck(&self) -> Result<u32, ActionError> {
        let reset = self.client.reset_stuck().await?;
        info!(reset, "MonitorRuntime: reset {} stuck jobs", reset);
        Ok(reset)
    }

    async fn run_action<F>(
        &self,
        id: &JobId,
        lands_in: Option<JobStatus>,
        request: F,
    ) -> Result<ActionOutcome, ActionError>
    where
        F: std::future::Future<Output = Result<ActionOutcome, ActionError>>,
    {
        self.send(Command::BeginAction(id.clone()))?;
        let result = request.await;
        let resolution = match &result {
            Ok(ActionOutcome::Applied) => ActionResolution::Removed { status: lands_in },
            // Already terminal on the server, but not necessarily in `lands_in`
            Ok(ActionOutcome::AlreadySettled) => ActionResolution::Reconcile,
            Err(e) => {
                warn!(job_id = %id, error = %e, "MonitorRuntime: action on {} failed", id);
                ActionResolution::Kept
            }
        };
        if self.send(Command::FinishAction(id.clone(), resolution)).is_err() {
            warn!(
                job_id = %id,
                "MonitorRuntime: monitor stopped before the action on {} was recorded",
                id
            );
        }
        result
    }

    /// Latest published snapshot of live jobs
    pub fn jobs(&self) -> Arc<Vec<Job>> {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Job>>> {
        self.snapshots.clone()
    }

    /// Live jobs processing for longer than the configured window
    pub async fn stuck_jobs(&self) -> Result<Vec<Job>, ActionError> {
        let window = chrono::Duration::from_std(self.stuck_after)
            .unwrap_or_else(|_| chrono::Duration::minutes(DEFAULT_STUCK_JOB_MINUTES as i64));
        let (reply, response) = oneshot::channel();
        self.send(Command::Stuck(window, reply))?;
        response.await.map_err(|_| ActionError::MonitorStopped)
    }

    pub async fn stop(&self) {
        let mut task = self.task.write().await;
        if let Some(handle) = task.take() {
            handle.abort();
            info!("MonitorRuntime: stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        let task = self.task.read().await;
        task.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}
