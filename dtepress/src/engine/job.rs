//! Job and outcome types flowing through the engine's channels.

use std::fmt;
use std::sync::Arc;

use crate::company::CompanyPool;
use crate::options::RunOptions;

/// One document's worth of rendering work.
///
/// Jobs are immutable once created: the supervisor builds every job
/// before any worker starts, and each job is processed by exactly one
/// worker, exactly once.
#[derive(Debug, Clone)]
pub struct Job {
    /// 1-based position among the jobs submitted in this run.
    pub sequence_id: usize,
    /// Where the raw bytes came from: a file path, or a synthetic label
    /// for stream input.
    pub source_label: String,
    /// Unparsed document payload.
    pub raw_bytes: Vec<u8>,
    /// Run-wide settings, shared by every job.
    pub options: Arc<RunOptions>,
    /// Shared company directory; `None` for externally-owned documents.
    pub companies: Option<Arc<CompanyPool>>,
}

/// Value flowing through the job queue.
///
/// A `Sentinel` tells exactly one worker that no more work is coming;
/// the supervisor enqueues one per worker after the last job.
#[derive(Debug, Clone)]
pub enum QueueItem {
    Job(Job),
    Sentinel,
}

/// Outcome event a worker reports to the supervisor.
///
/// Every job produces exactly one `Success` or `Failure`, and every
/// worker produces exactly one `WorkerDone` when it exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The job's pipeline ran to completion and its artifact was written.
    Success { sequence_id: usize },
    /// The job failed somewhere in its pipeline.
    Failure {
        sequence_id: usize,
        source_label: String,
        description: String,
    },
    /// A worker consumed its sentinel (or observed cancellation) and exited.
    WorkerDone { worker_id: usize },
}

impl fmt::Display for WorkerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerOutcome::Success { sequence_id } => write!(f, "job {sequence_id} succeeded"),
            WorkerOutcome::Failure {
                sequence_id,
                source_label,
                description,
            } => write!(f, "job {sequence_id} ({source_label}) failed: {description}"),
            WorkerOutcome::WorkerDone { worker_id } => write!(f, "worker {worker_id} done"),
        }
    }
}
