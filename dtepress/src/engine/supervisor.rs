//! Run supervision: job construction, worker pool lifecycle, result
//! aggregation.
//!
//! The supervisor owns a whole run. It validates the configuration before
//! anything is dispatched, resolves the shared company directory once,
//! enqueues every job followed by one sentinel per worker, spawns the
//! pool, and drains the result channel until every worker has reported
//! `WorkerDone`. Individual job failures are recorded and logged; only a
//! configuration error, or the first failure of a fail-fast run, aborts
//! the run as a whole.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::company::CompanyPool;
use crate::options::{FailMode, RunOptions, WorkerCount};
use crate::render::RenderBackend;

use super::error::EngineError;
use super::job::{Job, QueueItem, WorkerOutcome};
use super::queue::JobQueue;
use super::router::OutputPolicy;
use super::worker::Worker;

/// One raw input document, tagged with its source label.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// File path, or a synthetic label for stream input.
    pub label: String,
    /// Unparsed document payload.
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(label: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            bytes,
        }
    }
}

/// Record of one failed job.
#[derive(Debug, Clone)]
pub struct JobFailure {
    pub sequence_id: usize,
    pub source_label: String,
    pub description: String,
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Jobs submitted in this run.
    pub total: usize,
    /// Jobs whose artifact was written.
    pub succeeded: usize,
    /// Jobs that failed, in completion order.
    pub failures: Vec<JobFailure>,
}

impl RunReport {
    /// Number of failed jobs.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when no job failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owns the lifecycle of a batch rendering run.
pub struct Supervisor {
    backend: Arc<dyn RenderBackend>,
    cancel: CancellationToken,
}

impl Supervisor {
    /// Creates a supervisor with its own cancellation scope.
    pub fn new(backend: Arc<dyn RenderBackend>) -> Self {
        Self::with_cancellation(backend, CancellationToken::new())
    }

    /// Creates a supervisor cancelled through an external token, e.g. one
    /// wired to an interrupt signal.
    pub fn with_cancellation(backend: Arc<dyn RenderBackend>, cancel: CancellationToken) -> Self {
        Self { backend, cancel }
    }

    /// Runs a whole batch to completion and reports the aggregate outcome.
    ///
    /// `companies_file` is loaded once and shared read-only by every
    /// worker; it is not consulted for externally-owned documents.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] before any worker is
    /// spawned when the run is misconfigured, and
    /// [`EngineError::Aborted`] when a fail-fast run hits its first job
    /// failure.
    pub async fn run(
        &self,
        documents: Vec<SourceDocument>,
        mut options: RunOptions,
        worker_count: WorkerCount,
        companies_file: Option<&Path>,
    ) -> Result<RunReport, EngineError> {
        options.total_jobs = documents.len();
        validate_run(&options)?;

        let companies = self.resolve_companies(&options, companies_file)?;
        let workers = worker_count.resolve();
        let options = Arc::new(options);

        info!(
            jobs = documents.len(),
            workers,
            format = %options.format,
            "starting run"
        );

        let queue = JobQueue::with_capacity(documents.len() + workers, self.cancel.clone());

        // All jobs go on the queue before any worker starts, preserving
        // input order for sequence ids, then one sentinel per worker.
        for (index, doc) in documents.into_iter().enumerate() {
            let job = Job {
                sequence_id: index + 1,
                source_label: doc.label,
                raw_bytes: doc.bytes,
                options: Arc::clone(&options),
                companies: companies.clone(),
            };
            queue.push(QueueItem::Job(job)).await;
        }
        for _ in 0..workers {
            queue.push(QueueItem::Sentinel).await;
        }

        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
        let mut outstanding: HashMap<usize, JoinHandle<()>> = HashMap::with_capacity(workers);
        for worker_id in 0..workers {
            let worker = Worker::new(
                worker_id,
                queue.clone(),
                outcome_tx.clone(),
                Arc::clone(&self.backend),
                self.cancel.clone(),
            );
            outstanding.insert(worker_id, tokio::spawn(worker.run()));
        }
        drop(outcome_tx);

        let mut report = RunReport {
            total: options.total_jobs,
            ..RunReport::default()
        };

        while !outstanding.is_empty() {
            let outcome = match outcome_rx.recv().await {
                Some(outcome) => outcome,
                None => break,
            };
            match outcome {
                WorkerOutcome::Success { .. } => report.succeeded += 1,
                WorkerOutcome::Failure {
                    sequence_id,
                    source_label,
                    description,
                } => {
                    error!(
                        sequence_id,
                        total = options.total_jobs,
                        source = %source_label,
                        error = %description,
                        "job failed"
                    );
                    report.failures.push(JobFailure {
                        sequence_id,
                        source_label,
                        description,
                    });
                }
                WorkerOutcome::WorkerDone { worker_id } => {
                    debug!(worker_id, "worker retired");
                    if let Some(handle) = outstanding.remove(&worker_id) {
                        if let Err(err) = handle.await {
                            error!(worker_id, error = %err, "worker task panicked");
                        }
                    }
                }
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed(),
            "run complete"
        );

        if options.fail_mode == FailMode::FailFast {
            if let Some(first) = report.failures.first() {
                return Err(EngineError::Aborted {
                    sequence_id: first.sequence_id,
                    source_label: first.source_label.clone(),
                    description: first.description.clone(),
                });
            }
        }

        Ok(report)
    }

    fn resolve_companies(
        &self,
        options: &RunOptions,
        companies_file: Option<&Path>,
    ) -> Result<Option<Arc<CompanyPool>>, EngineError> {
        if options.extern_owned {
            return Ok(None);
        }
        let path: &Path = companies_file.ok_or_else(|| {
            EngineError::Configuration(
                "a company directory is required unless documents are externally owned"
                    .to_string(),
            )
        })?;
        let pool = CompanyPool::from_file(path)?;
        debug!(companies = pool.len(), path = %path.display(), "company directory loaded");
        Ok(Some(Arc::new(pool)))
    }
}

/// Configuration checks that must hold before dispatch.
fn validate_run(options: &RunOptions) -> Result<(), EngineError> {
    if let OutputPolicy::Explicit(path) = &options.policy {
        if options.total_jobs > 1 {
            return Err(EngineError::Configuration(format!(
                "explicit destination {} cannot be shared by {} jobs",
                path.display(),
                options.total_jobs
            )));
        }
    }
    Ok(())
}
