//! Worker loop and per-job pipeline.
//!
//! A worker drains the job queue until it pops a sentinel (or observes
//! cancellation), runs the per-job pipeline for every job it pops, and
//! reports one outcome per job plus a final `WorkerDone`. A job failure
//! never ends the loop; only a sentinel does, except in fail-fast mode,
//! where the first failure cancels the whole run.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::document::{self, DocumentIdentity};
use crate::options::{FailMode, Medium, OutputFormat};
use crate::render::{RenderBackend, RenderedTemplate};

use super::error::{PipelineError, ValidationError};
use super::job::{Job, QueueItem, WorkerOutcome};
use super::queue::JobQueue;
use super::router::{self, Destination};

/// One member of the worker pool.
pub(crate) struct Worker {
    id: usize,
    queue: JobQueue,
    outcomes: mpsc::UnboundedSender<WorkerOutcome>,
    backend: Arc<dyn RenderBackend>,
    cancel: CancellationToken,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        queue: JobQueue,
        outcomes: mpsc::UnboundedSender<WorkerOutcome>,
        backend: Arc<dyn RenderBackend>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            queue,
            outcomes,
            backend,
            cancel,
        }
    }

    /// Runs until a sentinel is popped or the run is cancelled.
    pub(crate) async fn run(self) {
        loop {
            let job = match self.queue.pop().await {
                None => {
                    debug!(worker_id = self.id, "queue closed, exiting");
                    break;
                }
                Some(QueueItem::Sentinel) => {
                    debug!(worker_id = self.id, "sentinel consumed");
                    break;
                }
                Some(QueueItem::Job(job)) => job,
            };

            let sequence_id = job.sequence_id;
            match process_job(&job, self.backend.as_ref()).await {
                Ok(()) => {
                    info!(
                        worker_id = self.id,
                        sequence_id,
                        source = %job.source_label,
                        "job succeeded"
                    );
                    if job.options.progress {
                        eprintln!("{}", progress_line(self.id, &job));
                    }
                    let _ = self.outcomes.send(WorkerOutcome::Success { sequence_id });
                }
                Err(err) => {
                    warn!(
                        worker_id = self.id,
                        sequence_id,
                        source = %job.source_label,
                        error = %err,
                        "job failed"
                    );
                    let _ = self.outcomes.send(WorkerOutcome::Failure {
                        sequence_id,
                        source_label: job.source_label.clone(),
                        description: err.to_string(),
                    });
                    if job.options.fail_mode == FailMode::FailFast {
                        self.cancel.cancel();
                        break;
                    }
                }
            }
        }

        let _ = self
            .outcomes
            .send(WorkerOutcome::WorkerDone { worker_id: self.id });
    }
}

/// Progress line reported per completed job: which worker finished which
/// job, out of how many.
fn progress_line(worker_id: usize, job: &Job) -> String {
    format!(
        "[w{}] [{}/{}] created {} from {}",
        worker_id,
        job.sequence_id,
        job.options.total_jobs,
        job.options.format,
        job.source_label
    )
}

/// Executes the per-job pipeline: parse, validate, render, write.
pub(crate) async fn process_job(
    job: &Job,
    backend: &dyn RenderBackend,
) -> Result<(), PipelineError> {
    let dte = document::parse_dte(&job.raw_bytes)?;
    let identity = dte.identity()?;

    let medium = validate(job, &identity)?;

    let template = backend
        .render(
            &dte,
            medium,
            job.companies.as_deref(),
            job.options.cedible,
            job.options.draft,
        )
        .await?;

    match job.options.format {
        OutputFormat::Tex => write_template(job, &identity, &template).await,
        OutputFormat::Pdf => {
            let payload = backend.convert(&template).await?;
            let bytes = STANDARD
                .decode(payload.trim().as_bytes())
                .map_err(crate::render::RenderError::Payload)?;
            write_artifact(job, &identity, &bytes).await
        }
    }
}

/// Business preconditions checked before the backend is invoked.
fn validate(job: &Job, identity: &DocumentIdentity) -> Result<Medium, PipelineError> {
    let medium: Medium = job
        .options
        .medium
        .parse()
        .map_err(|_| ValidationError::UnknownMedium(job.options.medium.clone()))?;

    if job.options.cedible && identity.is_note() {
        return Err(ValidationError::CedibleNotAllowed {
            doc_type: identity.doc_type,
        }
        .into());
    }

    Ok(medium)
}

/// Writes the intermediate template, with every named resource beside it.
async fn write_template(
    job: &Job,
    identity: &DocumentIdentity,
    template: &RenderedTemplate,
) -> Result<(), PipelineError> {
    let destination = router::resolve_destination(
        &job.options.policy,
        &job.source_label,
        identity,
        job.options.cedible,
        OutputFormat::Tex.extension(),
        job.options.output_dir.as_deref(),
    );

    match destination {
        Destination::Stdout => {
            if !template.resources.is_empty() {
                warn!(
                    sequence_id = job.sequence_id,
                    count = template.resources.len(),
                    "resources are skipped when the template goes to stdout"
                );
            }
            write_stdout(template.tex.as_bytes()).await
        }
        Destination::File(path) => {
            write_file(&path, template.tex.as_bytes()).await?;
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            for resource in &template.resources {
                let resource_path = base.join(&resource.filename);
                write_file(&resource_path, &resource.data).await?;
            }
            Ok(())
        }
    }
}

/// Writes the final artifact bytes to the routed destination.
async fn write_artifact(
    job: &Job,
    identity: &DocumentIdentity,
    bytes: &[u8],
) -> Result<(), PipelineError> {
    let destination = router::resolve_destination(
        &job.options.policy,
        &job.source_label,
        identity,
        job.options.cedible,
        OutputFormat::Pdf.extension(),
        job.options.output_dir.as_deref(),
    );

    match destination {
        Destination::Stdout => write_stdout(bytes).await,
        Destination::File(path) => write_file(&path, bytes).await,
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })
}

async fn write_stdout(bytes: &[u8]) -> Result<(), PipelineError> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(bytes)
        .await
        .and(stdout.flush().await)
        .map_err(|source| PipelineError::Io {
            path: "<stdout>".into(),
            source,
        })
}
