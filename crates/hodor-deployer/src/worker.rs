// worker.rs — The single job consumer.
//
// The worker takes jobs from the queue in FIFO order and installs them one
// at a time. Before each job it checks the engine's stop signal; once the
// engine is stopped, the job in hand and everything still queued is handed
// back as dropped (those jobs keep their `created` status).
//
// Install errors never reach the caller of `deploy`: they become a
// `failed` status. A failure to persist that status is only logged.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use hodor_store::{JobStatus, StatusStore};

use crate::installer::Installer;
use crate::job::Job;

pub struct Worker {
    store: Arc<StatusStore>,
    installer: Installer,
}

impl Worker {
    pub fn new(store: Arc<StatusStore>, installer: Installer) -> Self {
        Self { store, installer }
    }

    /// Process jobs until the queue closes or `is_stopped` turns true.
    ///
    /// Returns the ids of jobs that were dequeued but never processed.
    pub fn run(&self, jobs: &Receiver<Job>, is_stopped: impl Fn() -> bool) -> Vec<String> {
        for job in jobs.iter() {
            if is_stopped() {
                let mut dropped = vec![job.id];
                dropped.extend(jobs.try_iter().map(|job| job.id));
                return dropped;
            }
            self.handle(job);
        }
        Vec::new()
    }

    /// Install one job and persist its terminal status.
    pub fn handle(&self, job: Job) {
        let span = tracing::info_span!("job", job_id = %job.id, release = %job.release_key);
        let _guard = span.enter();

        tracing::info!(url = %job.source_url, "starting job");

        match self.installer.install(&job.release_key, &job.source_url) {
            Ok(target) => {
                // Tag before status: a poller that sees "ok" also sees the tag.
                if let Some(tag) = &job.tag {
                    if let Err(e) = self.store.set_tag(&job.release_key, tag) {
                        tracing::error!(error = %e, tag = %tag, "job ok: failed to save tag");
                    }
                }
                if let Err(e) = self.store.set_status(&job.id, &JobStatus::done()) {
                    tracing::error!(error = %e, "job ok: failed to save status");
                }
                tracing::info!(dir = %target.display(), "job done");
            }
            Err(err) => {
                tracing::warn!(error = %err, "job failed");
                if let Err(e) = self
                    .store
                    .set_status(&job.id, &JobStatus::failed(err.to_string()))
                {
                    tracing::error!(
                        error = %e,
                        install_error = %err,
                        "job failed: failed to save status"
                    );
                }
            }
        }
    }
}
