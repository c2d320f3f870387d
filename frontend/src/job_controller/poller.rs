//! Polling loop for a single observed job.
//!
//! `JobPoller` owns at most one `PollTask` at a time. A task is an explicit
//! scheduling object: it carries the job id, a cancellation flag and a stopped
//! flag, and the spawned loop checks the cancellation flag at every point where
//! it resumes (after the fetches resolve, after the sleep). The loop future is
//! also wrapped in [`Abortable`], so cancelling drops it together with any
//! pending timer.
//!
//! Every cycle fetches status and log tail concurrently, merges both into a
//! single [`JobSnapshot`] and publishes it. A terminal status ends the loop;
//! otherwise the next cycle runs after a fixed delay.
//!
//! Lifecycle: `Idle` (nothing observed) -> `Polling` -> `Stopped` (terminal
//! status or cancelled). Observing an id always cancels the previous task first.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use common::jobs::{JobId, JobSnapshot, JobStatus};
use futures_util::future::{join, AbortHandle, Abortable, FutureExt};
use futures_util::task::{LocalFutureObj, LocalSpawn, LocalSpawnExt, SpawnError};
use log::{debug, info, warn};
use yew::Callback;

use super::client::{JobApi, StatusReport};
use super::error::JobError;
use super::timer::Timer;
use crate::config::ClientConfig;

/// Runs futures on the browser microtask queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub log_tail: u32,
}

impl From<&ClientConfig> for PollSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            log_tail: config.log_tail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling(JobId),
    Stopped(JobId),
}

/// Scheduling object for one observed job.
#[derive(Debug)]
struct PollTask {
    job_id: JobId,
    cancelled: Cell<bool>,
    stopped: Cell<bool>,
}

impl PollTask {
    fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            cancelled: Cell::new(false),
            stopped: Cell::new(false),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

struct ActivePoll {
    task: Rc<PollTask>,
    abort: AbortHandle,
}

impl ActivePoll {
    fn cancel(&self) {
        if !self.task.cancelled.replace(true) {
            debug!("cancelling poll loop for job {}", self.task.job_id);
        }
        self.abort.abort();
    }
}

pub struct JobPoller<A, T, S> {
    api: Rc<A>,
    timer: Rc<T>,
    spawner: S,
    settings: PollSettings,
    active: Option<ActivePoll>,
}

impl<A, T, S> JobPoller<A, T, S>
where
    A: JobApi + 'static,
    T: Timer + 'static,
    S: LocalSpawn,
{
    pub fn new(api: Rc<A>, timer: T, spawner: S, settings: PollSettings) -> Self {
        Self {
            api,
            timer: Rc::new(timer),
            spawner,
            settings,
            active: None,
        }
    }

    /// Starts polling `job_id`, publishing every merged snapshot to `publish`.
    ///
    /// Any loop still running for a previous id is cancelled before the new
    /// one is spawned, so only one loop ever writes to `publish`'s target.
    pub fn observe(
        &mut self,
        job_id: JobId,
        publish: Callback<JobSnapshot>,
    ) -> Result<(), SpawnError> {
        self.cancel();

        let task = Rc::new(PollTask::new(job_id));
        let (abort, registration) = AbortHandle::new_pair();
        let poll = poll_loop(
            self.api.clone(),
            self.timer.clone(),
            self.settings,
            task.clone(),
            publish,
        );
        self.spawner
            .spawn_local(Abortable::new(poll, registration).map(|_| ()))?;

        info!("polling job {}", task.job_id);
        self.active = Some(ActivePoll { task, abort });
        Ok(())
    }

    /// Cancels the current loop, if any. Results still in flight are discarded.
    pub fn cancel(&mut self) {
        if let Some(active) = &self.active {
            active.cancel();
        }
    }

    pub fn state(&self) -> PollerState {
        match &self.active {
            None => PollerState::Idle,
            Some(active) if active.task.is_cancelled() || active.task.stopped.get() => {
                PollerState::Stopped(active.task.job_id.clone())
            }
            Some(active) => PollerState::Polling(active.task.job_id.clone()),
        }
    }
}

impl<A, T, S> Drop for JobPoller<A, T, S> {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel();
        }
    }
}

async fn poll_loop<A: JobApi, T: Timer>(
    api: Rc<A>,
    timer: Rc<T>,
    settings: PollSettings,
    task: Rc<PollTask>,
    publish: Callback<JobSnapshot>,
) {
    let mut snapshot = JobSnapshot::new(task.job_id.clone());

    loop {
        if task.is_cancelled() {
            return;
        }

        let (status, logs) = join(
            api.fetch_status(&task.job_id),
            api.fetch_logs(&task.job_id, settings.log_tail),
        )
        .await;

        if task.is_cancelled() {
            debug!("discarding late results for job {}", task.job_id);
            return;
        }

        merge_cycle(&mut snapshot, status, logs);
        publish.emit(snapshot.clone());

        if snapshot.status.is_terminal() {
            task.stopped.set(true);
            info!("job {} reached {}", task.job_id, snapshot.status);
            return;
        }

        timer.sleep(settings.interval).await;
    }
}

/// Folds one cycle's fetch results into the running snapshot.
///
/// A `NotFound` from either fetch ends the job as `unknown`. Transient
/// failures are recorded and leave the affected half untouched.
pub fn merge_cycle(
    snapshot: &mut JobSnapshot,
    status: Result<StatusReport, JobError>,
    logs: Result<String, JobError>,
) {
    snapshot.cycle += 1;
    snapshot.last_error = None;

    match status {
        Ok(report) => {
            snapshot.status = snapshot.status.advance(report.status);
            if report.exit_code.is_some() {
                snapshot.exit_code = report.exit_code;
            }
        }
        Err(err) => record_failure(snapshot, err),
    }

    match logs {
        Ok(tail) => snapshot.logs = tail,
        Err(err) => record_failure(snapshot, err),
    }
}

fn record_failure(snapshot: &mut JobSnapshot, err: JobError) {
    if let JobError::NotFound(_) = err {
        warn!("job {} is no longer known to the backend", snapshot.job_id);
        snapshot.status = snapshot.status.advance(JobStatus::Unknown);
    } else {
        warn!("poll of job {} failed: {}", snapshot.job_id, err);
    }
    snapshot.last_error = Some(err.to_string());
}
