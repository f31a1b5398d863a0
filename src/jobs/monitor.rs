//! Live job set reconciliation
//!
//! `JobMonitor` is a synchronous state machine. It owns the last accepted
//! snapshot of every live job and decides, for each poll result, which jobs
//! finished, which vanished, and which snapshots are stale and must be ignored.
//! The async poll loop in `core::runtime` is its only writer.

use crate::models::job::{Job, JobId, JobStatus};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::debug;

/// What one poll changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Jobs seen in a terminal status for the first time, last snapshot included
    pub finished: Vec<Job>,
    /// Jobs that left the live set without a terminal status being observed
    pub disappeared: Vec<Job>,
    /// Snapshots rejected as older than what was already accepted
    pub stale: Vec<JobId>,
    /// Snapshots ignored because an action on the job is in flight
    pub suppressed: Vec<JobId>,
}

impl Reconciliation {
    pub fn has_completions(&self) -> bool {
        !self.finished.is_empty() || !self.disappeared.is_empty()
    }
}

/// How an action on a job ended, as far as the live set is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionResolution {
    /// The action failed; the job stays live
    Kept,
    /// The job left the live set, landing in `status` when known
    Removed { status: Option<JobStatus> },
    /// The server says the job is already past the action; the next poll decides
    Reconcile,
}

/// Settled ids remembered so late snapshots cannot revive them
pub const DEFAULT_SETTLED_CAPACITY: usize = 1024;

#[derive(Debug)]
pub struct JobMonitor {
    jobs: BTreeMap<JobId, Job>,
    pending: HashSet<JobId>,
    /// Jobs that already left the live set, with their last known terminal status
    settled: HashMap<JobId, Option<JobStatus>>,
    /// Settlement order; the oldest entry is forgotten once capacity is reached
    settled_order: VecDeque<JobId>,
    settled_capacity: usize,
    /// Tracked since the in-flight poll was requested; its snapshot cannot know them yet
    fresh: HashSet<JobId>,
}

impl Default for JobMonitor {
    fn default() -> Self {
        Self {
            jobs: BTreeMap::new(),
            pending: HashSet::new(),
            settled: HashMap::new(),
            settled_order: VecDeque::new(),
            settled_capacity: DEFAULT_SETTLED_CAPACITY,
            fresh: HashSet::new(),
        }
    }
}

impl JobMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settled_capacity(mut self, capacity: usize) -> Self {
        self.settled_capacity = capacity.max(1);
        self
    }

    fn settle(&mut self, id: JobId, status: Option<JobStatus>) {
        if self.settled.insert(id.clone(), status).is_none() {
            self.settled_order.push_back(id);
        }
        while self.settled_order.len() > self.settled_capacity {
            if let Some(oldest) = self.settled_order.pop_front() {
                self.settled.remove(&oldest);
            }
        }
    }

    pub fn with_jobs(jobs: impl IntoIterator<Item = Job>) -> Self {
        let mut monitor = Self::new();
        for job in jobs {
            monitor.track(job);
        }
        monitor
    }

    /// Start following `job`, typically right after submission.
    /// Returns false when the job is terminal or was already settled.
    pub fn track(&mut self, job: Job) -> bool {
        let job = job.normalized();
        if self.settled.contains_key(&job.id) {
            return false;
        }
        if job.status.is_terminal() {
            self.settle(job.id.clone(), Some(job.status));
            return false;
        }
        self.fresh.insert(job.id.clone());
        self.jobs.insert(job.id.clone(), job);
        true
    }

    /// Call right before requesting a snapshot. Jobs tracked after this call
    /// are not reported as disappeared by the snapshot that follows.
    pub fn mark_poll_started(&mut self) {
        self.fresh.clear();
    }

    pub fn apply_snapshot(&mut self, snapshot: Vec<Job>) -> Reconciliation {
        let mut outcome = Reconciliation::default();
        let mut seen = HashSet::with_capacity(snapshot.len());

        for job in snapshot {
            let job = job.normalized();
            seen.insert(job.id.clone());

            if self.pending.contains(&job.id) {
                outcome.suppressed.push(job.id);
                continue;
            }
            if self.settled.contains_key(&job.id) {
                continue;
            }

            if job.status.is_terminal() {
                // Unknown jobs that are already over produce no event
                if self.jobs.remove(&job.id).is_some() {
                    outcome.finished.push(job.clone());
                }
                self.settle(job.id, Some(job.status));
                continue;
            }

            match self.jobs.get(&job.id) {
                Some(previous) if is_stale(previous, &job) => {
                    debug!(
                        job_id = %job.id,
                        status = %job.status,
                        progress = job.progress_percent,
                        kept_progress = previous.progress_percent,
                        "JobMonitor: discarding stale snapshot for {}",
                        job.id
                    );
                    outcome.stale.push(job.id);
                }
                Some(previous) => {
                    let merged = merge(previous, job);
                    self.jobs.insert(merged.id.clone(), merged);
                }
                None => {
                    self.jobs.insert(job.id.clone(), job);
                }
            }
        }

        let vanished: Vec<JobId> = self
            .jobs
            .keys()
            .filter(|id| !seen.contains(*id))
            .filter(|id| !self.pending.contains(*id) && !self.fresh.contains(*id))
            .cloned()
            .collect();
        self.fresh.clear();
        for id in vanished {
            if let Some(job) = self.jobs.remove(&id) {
                self.settle(id, None);
                outcome.disappeared.push(job);
            }
        }

        outcome
    }

    /// Mark an action as in flight; polls stop touching the job until it finishes
    pub fn begin_action(&mut self, id: &JobId) {
        self.pending.insert(id.clone());
    }

    /// Clear the in-flight marker. On success the job is dropped locally
    /// without waiting for the next poll; otherwise it stays live and the
    /// next snapshot reconciles it.
    pub fn finish_action(&mut self, id: &JobId, resolution: ActionResolution) -> Option<Job> {
        self.pending.remove(id);
        match resolution {
            ActionResolution::Kept | ActionResolution::Reconcile => None,
            ActionResolution::Removed { status } => {
                self.settle(id.clone(), status);
                self.jobs.remove(id)
            }
        }
    }

    pub fn is_pending(&self, id: &JobId) -> bool {
        self.pending.contains(id)
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    /// Terminal status recorded for a job that already left the live set
    pub fn settled_status(&self, id: &JobId) -> Option<JobStatus> {
        self.settled.get(id).copied().flatten()
    }

    pub fn is_settled(&self, id: &JobId) -> bool {
        self.settled.contains_key(id)
    }

    pub fn snapshot(&self) -> Vec<Job> {
        self.jobs.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs processing for longer than `window`, measured from `started_at`
    pub fn stuck_jobs(&self, now: DateTime<Utc>, window: Duration) -> Vec<&Job> {
        self.jobs
            .values()
            .filter(|job| job.status == JobStatus::Processing)
            .filter(|job| {
                job.started_at
                    .is_some_and(|started| now.signed_duration_since(started) > window)
            })
            .collect()
    }
}

/// A snapshot is stale when it moves progress backwards within a status or
/// walks the state machine backwards
fn is_stale(previous: &Job, next: &Job) -> bool {
    if previous.status == next.status {
        next.progress_percent < previous.progress_percent
    } else {
        !previous.status.can_transition_to(next.status)
    }
}

fn merge(previous: &Job, next: Job) -> Job {
    if next.status == JobStatus::Queued && next.queue_position().is_none() {
        let position = previous.queue_position();
        return next.with_queue_position(position);
    }
    next
}
