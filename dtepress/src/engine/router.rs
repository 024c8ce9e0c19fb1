//! Output routing.
//!
//! [`resolve_destination`] is a pure decision function mapping the run's
//! output policy plus a document's identifying fields to a concrete
//! destination. `Suffixed` and `Generated` names are derived from
//! per-document data, so concurrent workers never collide on a path
//! unless two inputs are genuinely identical in those fields.

use std::path::{Path, PathBuf};

use crate::document::DocumentIdentity;

/// How artifact destinations are chosen, resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPolicy {
    /// Source document's base name plus a fixed suffix.
    Suffixed,
    /// Name generated from the rendered document's identifying fields.
    Generated,
    /// One fixed path; only valid for single-job runs.
    Explicit(PathBuf),
    /// The process's standard output stream.
    Stream,
}

/// A resolved artifact destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Write to this path.
    File(PathBuf),
    /// Write to standard output. Interleaving between concurrent
    /// workers is not serialized.
    Stdout,
}

/// Suffix appended to derived names when the cedible form is included.
const CEDIBLE_SUFFIX: &str = "_cedible";

/// Resolves where one job's artifact goes.
///
/// Derived names (`Suffixed`, `Generated`) are joined onto `out_dir`
/// when one is given; an `Explicit` path is always used as-is.
pub fn resolve_destination(
    policy: &OutputPolicy,
    source_label: &str,
    identity: &DocumentIdentity,
    cedible: bool,
    extension: &str,
    out_dir: Option<&Path>,
) -> Destination {
    let cedible_part = if cedible { CEDIBLE_SUFFIX } else { "" };

    let name = match policy {
        OutputPolicy::Suffixed => {
            let base = base_name(source_label);
            format!("{base}{cedible_part}.{extension}")
        }
        OutputPolicy::Generated => format!(
            "{}_{}_{}{}.{}",
            identity.issuer, identity.doc_type, identity.serial, cedible_part, extension
        ),
        OutputPolicy::Explicit(path) => return Destination::File(path.clone()),
        OutputPolicy::Stream => return Destination::Stdout,
    };

    let path = match out_dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    };
    Destination::File(path)
}

/// Portion of a source label's file name before its first dot.
fn base_name(source_label: &str) -> &str {
    let file_name = Path::new(source_label)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(source_label);
    file_name.split('.').next().unwrap_or(file_name)
}
