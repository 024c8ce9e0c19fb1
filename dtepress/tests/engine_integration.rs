//! Integration tests for the batch execution engine.
//!
//! These drive the supervisor end to end with a mock render backend:
//! - every submitted job yields exactly one outcome
//! - worker pools of any size drain and terminate
//! - validation and backend failures are isolated per job
//! - fail-fast aborts the run before later jobs are dequeued
//! - output routing writes the expected artifacts

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokio_util::sync::CancellationToken;

use dtepress::company::CompanyPool;
use dtepress::document::Dte;
use dtepress::engine::{EngineError, OutputPolicy, SourceDocument, Supervisor};
use dtepress::options::{FailMode, Medium, OutputFormat, RunOptions, WorkerCount};
use dtepress::render::{RenderBackend, RenderError, RenderFuture, RenderedTemplate};

// =============================================================================
// Test Helpers
// =============================================================================

/// Builds a minimal DTE document with the given type and folio.
fn make_doc(tipo: u16, folio: u64) -> SourceDocument {
    let xml = format!(
        "<DTE><Documento><Encabezado>\
         <IdDoc><TipoDTE>{tipo}</TipoDTE><Folio>{folio}</Folio></IdDoc>\
         <Emisor><RUTEmisor>76543210-K</RUTEmisor></Emisor>\
         <Receptor><RUTRecep>12345678-5</RUTRecep></Receptor>\
         <Totales><MntTotal>1000</MntTotal></Totales>\
         </Encabezado></Documento></DTE>"
    );
    SourceDocument::new(format!("doc-{folio}.xml"), xml.into_bytes())
}

fn options(format: OutputFormat, policy: OutputPolicy) -> RunOptions {
    let mut options = RunOptions::new(format, policy);
    options.extern_owned = true;
    options
}

/// Mock backend: renders a folio-tagged template, optionally failing for
/// one folio, and "converts" by base64-encoding the template text.
struct MockBackend {
    renders: AtomicUsize,
    converts: AtomicUsize,
    fail_folio: Option<u64>,
    delay: Duration,
}

impl MockBackend {
    fn new() -> Self {
        Self {
            renders: AtomicUsize::new(0),
            converts: AtomicUsize::new(0),
            fail_folio: None,
            delay: Duration::ZERO,
        }
    }

    fn failing_on(folio: u64) -> Self {
        Self {
            fail_folio: Some(folio),
            ..Self::new()
        }
    }

    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }
}

impl RenderBackend for MockBackend {
    fn render<'a>(
        &'a self,
        dte: &'a Dte,
        _medium: Medium,
        _companies: Option<&'a CompanyPool>,
        _cedible: bool,
        _draft: bool,
    ) -> RenderFuture<'a, RenderedTemplate> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.renders.fetch_add(1, Ordering::SeqCst);
            let folio = dte.documento.encabezado.id_doc.folio;
            if self.fail_folio == Some(folio) {
                return Err(RenderError::Backend(format!("folio {folio} rejected")));
            }
            Ok(RenderedTemplate {
                tex: format!("%% folio {folio}\n\\documentclass{{article}}"),
                resources: Vec::new(),
            })
        })
    }

    fn convert<'a>(&'a self, template: &'a RenderedTemplate) -> RenderFuture<'a, String> {
        Box::pin(async move {
            self.converts.fetch_add(1, Ordering::SeqCst);
            Ok(STANDARD.encode(template.tex.as_bytes()))
        })
    }
}

async fn run_with_timeout(
    supervisor: &Supervisor,
    documents: Vec<SourceDocument>,
    options: RunOptions,
    workers: WorkerCount,
) -> Result<dtepress::engine::RunReport, EngineError> {
    tokio::time::timeout(
        Duration::from_secs(5),
        supervisor.run(documents, options, workers, None),
    )
    .await
    .expect("run deadlocked")
}

// =============================================================================
// Integration Tests
// =============================================================================

#[tokio::test]
async fn test_every_job_yields_exactly_one_outcome() {
    for workers in [1usize, 2, 4, 8] {
        let backend = Arc::new(MockBackend::new());
        let supervisor = Supervisor::new(backend.clone());
        let docs: Vec<_> = (1..=10).map(|folio| make_doc(33, folio)).collect();

        let report = run_with_timeout(
            &supervisor,
            docs,
            options(OutputFormat::Pdf, OutputPolicy::Stream),
            WorkerCount::Fixed(workers),
        )
        .await
        .unwrap();

        assert_eq!(report.total, 10);
        assert_eq!(report.succeeded + report.failed(), 10);
        assert_eq!(backend.renders.load(Ordering::SeqCst), 10);
    }
}

#[tokio::test]
async fn test_more_workers_than_jobs_still_terminates() {
    let backend = Arc::new(MockBackend::new());
    let supervisor = Supervisor::new(backend);
    let report = run_with_timeout(
        &supervisor,
        vec![make_doc(33, 1)],
        options(OutputFormat::Pdf, OutputPolicy::Stream),
        WorkerCount::Fixed(8),
    )
    .await
    .unwrap();

    assert_eq!(report.succeeded, 1);
}

#[tokio::test]
async fn test_mixed_outcomes_with_two_workers() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(MockBackend::failing_on(2));
    let supervisor = Supervisor::new(backend.clone());

    let docs = vec![make_doc(33, 1), make_doc(33, 2), make_doc(33, 3)];
    let mut opts = options(OutputFormat::Pdf, OutputPolicy::Generated);
    opts.output_dir = Some(dir.path().to_path_buf());

    let report = run_with_timeout(&supervisor, docs, opts, WorkerCount::Fixed(2))
        .await
        .unwrap();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].sequence_id, 2);
    assert_eq!(report.failures[0].source_label, "doc-2.xml");

    let written: Vec<PathBuf> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(written.len(), 2);
    assert!(dir.path().join("76543210_33_1.pdf").exists());
    assert!(dir.path().join("76543210_33_3.pdf").exists());
}

#[tokio::test]
async fn test_cedible_note_fails_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(MockBackend::new());
    let supervisor = Supervisor::new(backend.clone());

    let mut opts = options(OutputFormat::Pdf, OutputPolicy::Generated);
    opts.cedible = true;
    opts.output_dir = Some(dir.path().to_path_buf());

    let report = run_with_timeout(
        &supervisor,
        vec![make_doc(61, 9)],
        opts,
        WorkerCount::Default,
    )
    .await
    .unwrap();

    assert_eq!(report.failed(), 1);
    assert!(report.failures[0].description.contains("cedible"));
    assert_eq!(backend.renders.load(Ordering::SeqCst), 0);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unknown_medium_fails_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(MockBackend::new());
    let supervisor = Supervisor::new(backend.clone());

    let mut opts = options(OutputFormat::Pdf, OutputPolicy::Generated);
    opts.medium = "napkin".to_string();
    opts.output_dir = Some(dir.path().to_path_buf());

    let report = run_with_timeout(
        &supervisor,
        vec![make_doc(33, 1)],
        opts,
        WorkerCount::Default,
    )
    .await
    .unwrap();

    assert_eq!(report.failed(), 1);
    assert!(report.failures[0].description.contains("napkin"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_explicit_destination_with_multiple_jobs_aborts_before_dispatch() {
    let backend = Arc::new(MockBackend::new());
    let supervisor = Supervisor::new(backend.clone());

    let docs = vec![make_doc(33, 1), make_doc(33, 2)];
    let err = run_with_timeout(
        &supervisor,
        docs,
        options(
            OutputFormat::Pdf,
            OutputPolicy::Explicit("/tmp/out.pdf".into()),
        ),
        WorkerCount::Fixed(2),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, EngineError::Configuration(_)));
    assert_eq!(backend.renders.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_explicit_destination_single_job_writes_exact_path() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.pdf");
    let backend = Arc::new(MockBackend::new());
    let supervisor = Supervisor::new(backend);

    let report = run_with_timeout(
        &supervisor,
        vec![make_doc(33, 5)],
        options(OutputFormat::Pdf, OutputPolicy::Explicit(out.clone())),
        WorkerCount::Default,
    )
    .await
    .unwrap();

    assert!(report.is_clean());
    let bytes = std::fs::read(&out).unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("folio 5"));
}

#[tokio::test]
async fn test_fail_fast_aborts_and_abandons_remaining_jobs() {
    let backend = Arc::new(MockBackend::failing_on(1));
    let supervisor = Supervisor::new(backend.clone());

    let docs: Vec<_> = (1..=5).map(|folio| make_doc(33, folio)).collect();
    let mut opts = options(OutputFormat::Pdf, OutputPolicy::Stream);
    opts.fail_mode = FailMode::FailFast;

    let err = run_with_timeout(&supervisor, docs, opts, WorkerCount::Default)
        .await
        .unwrap_err();

    match err {
        EngineError::Aborted { sequence_id, .. } => assert_eq!(sequence_id, 1),
        other => panic!("expected Aborted, got {other:?}"),
    }
    // The failing first job was rendered; none of the remaining four were.
    assert_eq!(backend.renders.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rerun_overwrites_with_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.pdf");
    let backend = Arc::new(MockBackend::new());
    let supervisor = Supervisor::new(backend);

    for _ in 0..2 {
        run_with_timeout(
            &supervisor,
            vec![make_doc(33, 5)],
            options(OutputFormat::Pdf, OutputPolicy::Explicit(out.clone())),
            WorkerCount::Default,
        )
        .await
        .unwrap();
    }

    let first = std::fs::read(&out).unwrap();
    run_with_timeout(
        &supervisor,
        vec![make_doc(33, 5)],
        options(OutputFormat::Pdf, OutputPolicy::Explicit(out.clone())),
        WorkerCount::Default,
    )
    .await
    .unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), first);
}

#[tokio::test]
async fn test_cancelled_run_stops_taking_jobs_but_terminates() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let backend = Arc::new(MockBackend::with_delay(Duration::from_millis(10)));
    let supervisor = Supervisor::with_cancellation(backend.clone(), cancel);

    let docs: Vec<_> = (1..=4).map(|folio| make_doc(33, folio)).collect();
    let report = run_with_timeout(
        &supervisor,
        docs,
        options(OutputFormat::Pdf, OutputPolicy::Stream),
        WorkerCount::Fixed(2),
    )
    .await
    .unwrap();

    // Workers observed the closed queue and exited without dequeuing.
    assert_eq!(report.succeeded, 0);
    assert_eq!(backend.renders.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_company_directory_is_a_configuration_error() {
    let backend = Arc::new(MockBackend::new());
    let supervisor = Supervisor::new(backend);

    // Not externally owned, but no directory supplied.
    let opts = RunOptions::new(OutputFormat::Pdf, OutputPolicy::Stream);
    let err = tokio::time::timeout(
        Duration::from_secs(5),
        supervisor.run(vec![make_doc(33, 1)], opts, WorkerCount::Default, None),
    )
    .await
    .unwrap()
    .unwrap_err();

    assert!(matches!(err, EngineError::Configuration(_)));
}

#[tokio::test]
async fn test_company_directory_loaded_once_and_shared() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[[company]]\nrut = \"76543210-K\"\nname = \"Comercial Andina SpA\""
    )
    .unwrap();

    let backend = Arc::new(MockBackend::new());
    let supervisor = Supervisor::new(backend);
    let opts = RunOptions::new(OutputFormat::Pdf, OutputPolicy::Stream);

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        supervisor.run(
            vec![make_doc(33, 1), make_doc(33, 2)],
            opts,
            WorkerCount::Fixed(2),
            Some(file.path()),
        ),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(report.is_clean());
}
