//! Error taxonomy for the execution engine.
//!
//! Per-job errors ([`PipelineError`]) are caught at the worker boundary
//! and become `Failure` outcomes; they never stop the run unless it is in
//! fail-fast mode. Run-level errors ([`EngineError`]) abort the run
//! before dispatch, or during it for fail-fast runs.

use std::path::PathBuf;

use thiserror::Error;

use crate::company::PoolError;
use crate::document::DocumentError;
use crate::render::RenderError;

/// Business-rule violations detected in the per-job pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Credit and debit notes cannot carry a cedible declaration.
    #[error("document type {doc_type} is not subject to a cedible declaration")]
    CedibleNotAllowed { doc_type: u16 },

    /// The run's medium selector is not a known medium.
    #[error("unknown medium: {0}")]
    UnknownMedium(String),
}

/// Anything that can fail while processing a single job.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The raw bytes are not a well-formed document.
    #[error(transparent)]
    Parse(#[from] DocumentError),

    /// A business precondition was violated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The render backend failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The destination could not be written.
    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Run-level failures.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The run's configuration is unusable; detected before dispatch.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The company directory could not be loaded.
    #[error(transparent)]
    CompanyPool(#[from] PoolError),

    /// A fail-fast run aborted on its first job failure.
    #[error("run aborted: job {sequence_id} ({source_label}) failed: {description}")]
    Aborted {
        sequence_id: usize,
        source_label: String,
        description: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::CedibleNotAllowed { doc_type: 61 };
        assert!(err.to_string().contains("61"));

        let err = ValidationError::UnknownMedium("a4".to_string());
        assert_eq!(err.to_string(), "unknown medium: a4");
    }

    #[test]
    fn test_pipeline_error_wraps_validation() {
        let err: PipelineError = ValidationError::UnknownMedium("x".to_string()).into();
        assert!(matches!(err, PipelineError::Validation(_)));
    }
}
