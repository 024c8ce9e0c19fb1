//! CLI error handling with user-friendly messages.
//!
//! Centralizes error formatting and exit codes for the CLI.

use std::fmt;
use std::io;
use std::process;

use dtepress::engine::EngineError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// The command line itself is unusable.
    Usage(String),
    /// An input document could not be read.
    Input { path: String, error: io::Error },
    /// The engine refused or aborted the run.
    Engine(EngineError),
    /// The run completed but some jobs failed.
    JobsFailed { failed: usize, total: usize },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Engine(EngineError::Configuration(_)) = self {
            eprintln!();
            eprintln!("Run `dtepress create pdf --help` for destination options.");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Input { path, error } => {
                write!(f, "could not read input '{path}': {error}")
            }
            CliError::Engine(e) => write!(f, "{e}"),
            CliError::JobsFailed { failed, total } => {
                write!(f, "{failed} of {total} documents failed")
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Input { error, .. } => Some(error),
            CliError::Engine(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        CliError::Engine(e)
    }
}
