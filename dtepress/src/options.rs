//! Run-wide option types.
//!
//! A run's settings are resolved once, before any worker starts, into an
//! immutable [`RunOptions`] snapshot that every job shares by reference.
//! Dynamic lookups happen at construction time; workers only ever read
//! already-validated values.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::engine::router::OutputPolicy;

/// Fallback worker count when parallelism detection fails.
pub const FALLBACK_WORKER_COUNT: usize = 1;

/// Paper/layout profile a document is rendered for.
///
/// The selector travels through [`RunOptions`] as the raw string the user
/// entered; it is parsed per job so an unrecognized value surfaces as a
/// job failure rather than tearing down the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Medium {
    /// Full letter page.
    Carta,
    /// Chilean legal page.
    Oficio,
    /// 80mm thermal receipt roll.
    Thermal80mm,
}

impl Medium {
    /// All known mediums, in listing order.
    pub const ALL: [Medium; 3] = [Medium::Carta, Medium::Oficio, Medium::Thermal80mm];

    /// The selector string for this medium.
    pub fn as_str(&self) -> &'static str {
        match self {
            Medium::Carta => "carta",
            Medium::Oficio => "oficio",
            Medium::Thermal80mm => "thermal80mm",
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a medium selector is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMedium(pub String);

impl fmt::Display for UnknownMedium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown medium: {}", self.0)
    }
}

impl std::error::Error for UnknownMedium {}

impl FromStr for Medium {
    type Err = UnknownMedium;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "carta" => Ok(Medium::Carta),
            "oficio" => Ok(Medium::Oficio),
            "thermal80mm" => Ok(Medium::Thermal80mm),
            other => Err(UnknownMedium(other.to_string())),
        }
    }
}

/// Which artifact form a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Intermediate typeset template plus its named resources.
    Tex,
    /// Final rendered artifact.
    Pdf,
}

impl OutputFormat {
    /// All known output formats, in listing order.
    pub const ALL: [OutputFormat; 2] = [OutputFormat::Tex, OutputFormat::Pdf];

    /// The file extension written for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Tex => "tex",
            OutputFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// How job failures are handled across the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailMode {
    /// Log each failure and keep processing remaining jobs.
    #[default]
    Tolerant,
    /// Abort the whole run on the first job failure.
    FailFast,
}

/// Requested size of the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerCount {
    /// Single worker.
    #[default]
    Default,
    /// Available execution units minus one, floored at one.
    Auto,
    /// Explicit positive count.
    Fixed(usize),
}

impl WorkerCount {
    /// Resolves the request into a concrete pool size.
    pub fn resolve(&self) -> usize {
        match self {
            WorkerCount::Default => 1,
            WorkerCount::Auto => {
                let cpus = std::thread::available_parallelism()
                    .map(|p| p.get())
                    .unwrap_or(FALLBACK_WORKER_COUNT);
                cpus.saturating_sub(1).max(1)
            }
            WorkerCount::Fixed(n) => (*n).max(1),
        }
    }
}

impl FromStr for WorkerCount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(WorkerCount::Auto);
        }
        match s.parse::<usize>() {
            Ok(0) => Err("worker count must be at least 1".to_string()),
            Ok(n) => Ok(WorkerCount::Fixed(n)),
            Err(_) => Err(format!("invalid worker count: {s} (expected a number or 'auto')")),
        }
    }
}

/// Immutable snapshot of run-wide settings.
///
/// Built once by the supervisor and shared by every job through an `Arc`;
/// never mutated after dispatch begins.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Raw medium selector, validated per job.
    pub medium: String,
    /// Include the transferability ("cedible") declaration form.
    pub cedible: bool,
    /// Stamp a draft disclaimer on the rendered document.
    pub draft: bool,
    /// Documents were received from a third party; no company directory
    /// is resolved for them.
    pub extern_owned: bool,
    /// Artifact form this run produces.
    pub format: OutputFormat,
    /// Destination selection policy.
    pub policy: OutputPolicy,
    /// Directory derived destinations are resolved against. Explicit
    /// destinations are used as given.
    pub output_dir: Option<PathBuf>,
    /// Total number of jobs submitted in this run, for progress lines.
    pub total_jobs: usize,
    /// Emit a progress line per completed job.
    pub progress: bool,
    /// Failure handling mode.
    pub fail_mode: FailMode,
}

impl RunOptions {
    /// Options with everything off, rendering PDFs to standard output.
    pub fn new(format: OutputFormat, policy: OutputPolicy) -> Self {
        Self {
            medium: Medium::Carta.as_str().to_string(),
            cedible: false,
            draft: false,
            extern_owned: false,
            format,
            policy,
            output_dir: None,
            total_jobs: 0,
            progress: false,
            fail_mode: FailMode::default(),
        }
    }
}
