//! dtepress - batch rendering for Chilean electronic tax documents.
//!
//! This library turns DTE XML documents into printable artifacts: an
//! intermediate TeX template, or a final PDF produced through a
//! pluggable [`render::RenderBackend`]. Many documents are processed
//! concurrently through the fixed-size worker pool in [`engine`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dtepress::engine::{OutputPolicy, SourceDocument, Supervisor};
//! use dtepress::options::{OutputFormat, RunOptions, WorkerCount};
//! use dtepress::render::LatexBackend;
//!
//! let supervisor = Supervisor::new(Arc::new(LatexBackend::default()));
//! let options = RunOptions::new(OutputFormat::Pdf, OutputPolicy::Generated);
//! let documents = vec![SourceDocument::new("invoice.xml", bytes)];
//!
//! let report = supervisor
//!     .run(documents, options, WorkerCount::Auto, Some(companies_path))
//!     .await?;
//! ```

pub mod company;
pub mod document;
pub mod engine;
pub mod logging;
pub mod options;
pub mod render;

/// Version of the dtepress library and CLI.
///
/// Synchronized across all workspace members; injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
