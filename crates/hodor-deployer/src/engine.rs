// engine.rs — DeploymentEngine: the façade the transport layer talks to.
//
// The engine owns the bounded job queue, the single worker, and the
// lifecycle state. `deploy` persists a `created` status, then tries a
// non-blocking enqueue: a full queue is rejected on the spot. `start` runs
// the worker on the calling thread until `stop`.
//
// Two signals are kept apart:
// - Lifecycle::Stopped tells the worker to stop consuming (checked before
//   every job);
// - dropping the queue's sender closes the queue to producers and wakes a
//   worker blocked on an empty queue.
// Jobs still queued at stop are never processed; they are logged and keep
// their `created` status.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hodor_store::{JobStatus, StatusStore, StoreError};
use reqwest::Url;

use crate::config::ReleaseConfig;
use crate::error::DeployError;
use crate::fetch::Fetcher;
use crate::installer::Installer;
use crate::job::Job;
use crate::worker::Worker;

/// Maximum number of jobs waiting for the worker.
pub const QUEUE_CAPACITY: usize = 50;

/// Tag reported for a release with no successful tagged install.
pub const UNKNOWN_TAG: &str = "unknown";

/// Operations exposed to the transport layer.
pub trait Deployer: Send + Sync {
    /// Queue an install of the archive at `source_url` for `release_key`.
    /// Returns the new job's id.
    fn deploy(
        &self,
        release_key: &str,
        source_url: &Url,
        tag: Option<&str>,
    ) -> Result<String, DeployError>;

    /// Current status of a job; `StoreError::NotFound` for an unknown id.
    fn status(&self, job_id: &str) -> Result<JobStatus, StoreError>;

    /// Latest successfully installed tag, or [`UNKNOWN_TAG`].
    fn latest_tag(&self, release_key: &str) -> Result<String, StoreError>;
}

/// Where the engine is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    NotStarted,
    Running,
    Stopped,
}

struct State {
    lifecycle: Lifecycle,
    /// Producer side of the queue; `None` once stopped.
    queue: Option<SyncSender<Job>>,
}

/// Queue, worker and status store wired together.
pub struct DeploymentEngine {
    store: Arc<StatusStore>,
    worker: Worker,
    state: Mutex<State>,
    jobs: Mutex<Option<Receiver<Job>>>,
}

impl DeploymentEngine {
    pub fn new(config: ReleaseConfig, store: StatusStore, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_capacity(config, store, fetcher, QUEUE_CAPACITY)
    }

    /// Like [`DeploymentEngine::new`] with a custom queue capacity.
    pub fn with_capacity(
        config: ReleaseConfig,
        store: StatusStore,
        fetcher: Arc<dyn Fetcher>,
        capacity: usize,
    ) -> Self {
        let store = Arc::new(store);
        let (sender, receiver) = sync_channel(capacity);
        Self {
            worker: Worker::new(store.clone(), Installer::new(config, fetcher)),
            store,
            state: Mutex::new(State {
                lifecycle: Lifecycle::NotStarted,
                queue: Some(sender),
            }),
            jobs: Mutex::new(Some(receiver)),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        lock(&self.state).lifecycle
    }

    /// Run the worker on the calling thread. Blocks until [`stop`](Self::stop).
    ///
    /// May be called once; later calls return `DeployError::AlreadyStarted`.
    /// If the engine was stopped before it started, queued jobs are dropped
    /// and this returns right away.
    pub fn start(&self) -> Result<(), DeployError> {
        let jobs = lock(&self.jobs)
            .take()
            .ok_or(DeployError::AlreadyStarted)?;

        {
            let mut state = lock(&self.state);
            if state.lifecycle == Lifecycle::NotStarted {
                state.lifecycle = Lifecycle::Running;
            }
        }

        tracing::info!("deployment worker started");
        let dropped = self.worker.run(&jobs, || self.is_stopped());
        if !dropped.is_empty() {
            tracing::warn!(
                count = dropped.len(),
                jobs = ?dropped,
                "engine stopped with unprocessed jobs, they stay at created"
            );
        }
        tracing::info!("deployment worker stopped");
        Ok(())
    }

    /// Stop accepting jobs and let the worker exit before its next job.
    ///
    /// An install already in progress runs to completion.
    pub fn stop(&self) {
        let mut state = lock(&self.state);
        state.lifecycle = Lifecycle::Stopped;
        state.queue = None;
        tracing::info!("deployment engine stopping");
    }

    fn is_stopped(&self) -> bool {
        lock(&self.state).lifecycle == Lifecycle::Stopped
    }
}

impl Deployer for DeploymentEngine {
    fn deploy(
        &self,
        release_key: &str,
        source_url: &Url,
        tag: Option<&str>,
    ) -> Result<String, DeployError> {
        tracing::info!(release = %release_key, url = %source_url, "deploying release");

        let Some(queue) = lock(&self.state).queue.clone() else {
            return Err(DeployError::Stopped);
        };

        let job = Job::new(release_key, source_url.clone(), tag);
        let job_id = job.id.clone();
        self.store.set_status(&job_id, &JobStatus::created())?;

        match queue.try_send(job) {
            Ok(()) => Ok(job_id),
            Err(TrySendError::Full(_)) => {
                tracing::warn!(job_id = %job_id, "job queue is full");
                Err(DeployError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(DeployError::Stopped),
        }
    }

    fn status(&self, job_id: &str) -> Result<JobStatus, StoreError> {
        self.store.get_status(job_id)
    }

    fn latest_tag(&self, release_key: &str) -> Result<String, StoreError> {
        Ok(self
            .store
            .latest_tag(release_key)?
            .unwrap_or_else(|| UNKNOWN_TAG.to_string()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
