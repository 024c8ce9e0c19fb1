//! CLI command implementations.
//!
//! - [`list`] - enumerate supported mediums and output formats
//! - [`create`] - render documents to templates or final artifacts

pub mod create;
pub mod list;
