//! Render backend seam.
//!
//! The pipeline treats typesetting as a black box behind [`RenderBackend`]:
//! `render` turns a parsed document into a template plus named resources,
//! and `convert` turns that pair into the final artifact payload. The
//! bundled [`LatexBackend`] shells out to a TeX installation; tests swap
//! in mock implementations.

pub mod latex;

pub use latex::LatexBackend;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::company::CompanyPool;
use crate::document::Dte;
use crate::options::Medium;

/// Errors raised by a render backend.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template generation failed.
    #[error("template generation failed: {0}")]
    Template(String),

    /// The converter program could not be started.
    #[error("could not start converter `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The converter program ran and failed.
    #[error("converter `{program}` failed: {detail}")]
    Converter { program: String, detail: String },

    /// The artifact payload returned by the backend is not valid base64.
    #[error("artifact payload is not valid base64: {0}")]
    Payload(#[from] base64::DecodeError),

    /// Backend-specific failure.
    #[error("{0}")]
    Backend(String),
}

/// A named binary resource that accompanies a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// File name the resource must be written under, beside the template.
    pub filename: String,
    /// Raw resource bytes.
    pub data: Vec<u8>,
}

/// A rendered template and the resources it references.
#[derive(Debug, Clone, Default)]
pub struct RenderedTemplate {
    /// Template text.
    pub tex: String,
    /// Resources the template references, in emission order.
    pub resources: Vec<Resource>,
}

/// Boxed future returned by backend operations.
pub type RenderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RenderError>> + Send + 'a>>;

/// Converts parsed documents into templates and final artifacts.
///
/// Implementations must be safe to call concurrently from many workers;
/// they receive only shared references and per-call arguments.
pub trait RenderBackend: Send + Sync {
    /// Renders a parsed document into a template plus named resources.
    fn render<'a>(
        &'a self,
        dte: &'a Dte,
        medium: Medium,
        companies: Option<&'a CompanyPool>,
        cedible: bool,
        draft: bool,
    ) -> RenderFuture<'a, RenderedTemplate>;

    /// Converts a template and its resources into the final artifact,
    /// returned as a base64-encoded payload.
    fn convert<'a>(&'a self, template: &'a RenderedTemplate) -> RenderFuture<'a, String>;
}
