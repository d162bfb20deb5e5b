//! Background job execution.
//!
//! A `Worker` runs one job at a time. Several worker processes may poll the
//! same database; they coordinate only through the conditional updates in
//! `db::job_repo`.

pub mod job;
pub mod runner;

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::db::job_repo::{self, JobStatus};
use crate::db::{Database, DatabaseError};

pub use job::JobKind;
pub use runner::{JobReport, JobRunner};

// Re-export crossbeam_channel for use in main
pub use crossbeam_channel;

/// Result of one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub job_id: String,
    pub job_type: String,
    pub status: JobStatus,
}

pub struct Worker {
    db: Database,
    runner: JobRunner,
    worker_id: String,
    poll_interval: Duration,
    stale_lock_timeout: Duration,
}

/// Channel used to stop `Worker::run`. Sending a value or dropping every
/// sender ends the loop.
pub fn shutdown_channel() -> (Sender<()>, Receiver<()>) {
    bounded(1)
}

impl Worker {
    pub fn new(db: Database, config: &WorkerConfig) -> Self {
        Self {
            runner: JobRunner::new(db.clone(), &config.extractor_version),
            db,
            worker_id: config.worker_id.clone(),
            poll_interval: config.poll_interval(),
            stale_lock_timeout: config.stale_lock_timeout(),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Claims and runs at most one job.
    ///
    /// Job failures are recorded on the job and reported as a `FAILED`
    /// outcome; only store errors around the claim itself are returned.
    pub fn tick(&self) -> Result<Option<TickOutcome>, DatabaseError> {
        job_repo::reclaim_stale(&self.db, self.stale_lock_timeout)?;

        let Some(job) = job_repo::claim_next(&self.db, &self.worker_id)? else {
            return Ok(None);
        };

        let _span = tracing::info_span!(
            "worker.job",
            job_id = %job.id,
            job_type = %job.job_type,
            attempt = job.attempts
        )
        .entered();

        info!("Claimed job {} ({}, attempt {})", job.id, job.job_type, job.attempts);

        let status = match self.runner.run_job(&job) {
            Ok(report) => {
                debug!("Job {} finished: {:?}", job.id, report);
                if !job_repo::complete(&self.db, &job.id, &self.worker_id)? {
                    warn!("Lost lock on job {} before completion", job.id);
                }
                info!("Job {} done", job.id);
                JobStatus::Done
            }
            Err(e) => {
                let message = e.to_string();
                error!("Job {} ({}) failed: {}", job.id, job.job_type, message);
                if !job_repo::fail(&self.db, &job.id, &self.worker_id, &message)? {
                    warn!("Lost lock on job {} before recording failure", job.id);
                }
                JobStatus::Failed
            }
        };

        Ok(Some(TickOutcome {
            job_id: job.id,
            job_type: job.job_type,
            status,
        }))
    }

    /// Polls until `shutdown` fires. The first tick runs immediately.
    pub fn run(&self, shutdown: Receiver<()>) {
        info!(
            "Worker {} started (poll every {:?})",
            self.worker_id, self.poll_interval
        );

        loop {
            if let Err(e) = self.tick() {
                error!("Worker {} poll failed: {}", self.worker_id, e);
            }

            match shutdown.recv_timeout(self.poll_interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        info!("Worker {} stopped", self.worker_id);
    }
}
