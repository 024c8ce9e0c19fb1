//! Create command - render documents to TeX templates or PDF artifacts.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use dtepress::engine::{OutputPolicy, SourceDocument, Supervisor};
use dtepress::options::{FailMode, OutputFormat, RunOptions, WorkerCount};
use dtepress::render::latex::{LatexBackend, DEFAULT_CONVERTER};

use crate::error::CliError;

/// Arguments shared by `create tex` and `create pdf`.
#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Input document paths, or '-' to read one XML document per line
    /// from stdin.
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Paper/layout profile to render for.
    #[arg(long, default_value = "carta")]
    pub medium: String,

    /// Include the transferability (cedible) declaration form.
    #[arg(long)]
    pub cedible: bool,

    /// Stamp a draft disclaimer on the document.
    #[arg(long)]
    pub draft: bool,

    /// Documents were received from a third party; skip the company
    /// directory.
    #[arg(long = "extern")]
    pub extern_owned: bool,

    /// Write to this file. Only valid for a single input document.
    #[arg(long, conflicts_with_all = ["suffixed", "generate"])]
    pub out: Option<PathBuf>,

    /// Derive each destination from the source file's base name.
    #[arg(long, conflicts_with = "generate")]
    pub suffixed: bool,

    /// Derive each destination from the rendered document's issuer,
    /// type and folio.
    #[arg(long)]
    pub generate: bool,

    /// Directory derived destinations are written into.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print a progress line per completed document.
    #[arg(short, long)]
    pub progress: bool,

    /// Worker pool size: a number, or 'auto'.
    #[arg(long, value_parser = parse_worker_count)]
    pub jobs: Option<WorkerCount>,

    /// Abort the whole run on the first failed document.
    #[arg(long)]
    pub fail_fast: bool,

    /// Company directory file (TOML).
    #[arg(long)]
    pub companies: Option<PathBuf>,

    /// Converter program used to turn templates into PDFs.
    #[arg(long, default_value = DEFAULT_CONVERTER)]
    pub converter: String,
}

fn parse_worker_count(s: &str) -> Result<WorkerCount, String> {
    s.parse()
}

/// Run the create command for the given output format.
pub async fn run(format: OutputFormat, args: CreateArgs) -> Result<(), CliError> {
    let from_stdin = args.inputs.len() == 1 && args.inputs[0] == "-";
    if from_stdin && args.suffixed {
        return Err(CliError::Usage(
            "--suffixed requires file inputs, not stdin".to_string(),
        ));
    }

    let documents = collect_sources(&args.inputs, from_stdin)?;
    let policy = resolve_policy(&args);
    let workers = args.jobs.unwrap_or_default();

    if policy == OutputPolicy::Stream && workers.resolve() > 1 {
        warn!("concurrent workers interleave on stdout; consider --suffixed or --generate");
    }

    let mut options = RunOptions::new(format, policy);
    options.medium = args.medium;
    options.cedible = args.cedible;
    options.draft = args.draft;
    options.extern_owned = args.extern_owned;
    options.output_dir = args.out_dir;
    options.progress = args.progress;
    options.fail_mode = if args.fail_fast {
        FailMode::FailFast
    } else {
        FailMode::Tolerant
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, finishing in-flight documents");
                cancel.cancel();
            }
        });
    }

    let backend = Arc::new(LatexBackend::new(&args.converter));
    let supervisor = Supervisor::with_cancellation(backend, cancel);
    let report = supervisor
        .run(documents, options, workers, args.companies.as_deref())
        .await?;

    if !report.is_clean() {
        return Err(CliError::JobsFailed {
            failed: report.failed(),
            total: report.total,
        });
    }
    Ok(())
}

fn resolve_policy(args: &CreateArgs) -> OutputPolicy {
    if args.suffixed {
        OutputPolicy::Suffixed
    } else if args.generate {
        OutputPolicy::Generated
    } else if let Some(out) = &args.out {
        OutputPolicy::Explicit(out.clone())
    } else {
        OutputPolicy::Stream
    }
}

fn collect_sources(inputs: &[String], from_stdin: bool) -> Result<Vec<SourceDocument>, CliError> {
    if from_stdin {
        return read_stream(std::io::stdin().lock());
    }

    inputs
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path).map_err(|error| CliError::Input {
                path: path.clone(),
                error,
            })?;
            Ok(SourceDocument::new(path.clone(), bytes))
        })
        .collect()
}

/// Reads one XML document per line, skipping blank lines.
///
/// Labels are numbered by accepted document, so `<stdin:N>` always
/// matches the job's sequence id.
fn read_stream(reader: impl BufRead) -> Result<Vec<SourceDocument>, CliError> {
    let mut documents = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|error| CliError::Input {
            path: "<stdin>".to_string(),
            error,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        documents.push(SourceDocument::new(
            format!("<stdin:{}>", documents.len() + 1),
            line.into_bytes(),
        ));
    }
    Ok(documents)
}
