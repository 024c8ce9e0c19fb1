//! List command - enumerate supported selector values.

use clap::Subcommand;
use dtepress::options::{Medium, OutputFormat};

/// What to enumerate.
#[derive(Debug, Clone, Subcommand)]
pub enum ListTarget {
    /// Paper/layout profiles documents can be rendered for.
    Mediums,
    /// Output formats a run can produce.
    Formats,
}

/// Run the list command.
pub fn run(target: ListTarget) {
    match target {
        ListTarget::Mediums => {
            for medium in Medium::ALL {
                println!("{medium}");
            }
        }
        ListTarget::Formats => {
            for format in OutputFormat::ALL {
                println!("{format}");
            }
        }
    }
}
