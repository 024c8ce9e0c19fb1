//! dtepress CLI - render DTE documents from the command line.

use clap::{Parser, Subcommand};

use dtepress::options::OutputFormat;

mod commands;
mod error;

use commands::create::CreateArgs;
use commands::list::ListTarget;

#[derive(Parser)]
#[command(name = "dtepress", version, about = "Render DTE documents to TeX templates and PDF artifacts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List supported selector values.
    List {
        #[command(subcommand)]
        target: ListTarget,
    },
    /// Render documents.
    Create {
        #[command(subcommand)]
        format: CreateFormat,
    },
}

#[derive(Subcommand)]
enum CreateFormat {
    /// Intermediate TeX template, resources written beside it.
    Tex(CreateArgs),
    /// Final PDF artifact.
    Pdf(CreateArgs),
}

#[tokio::main]
async fn main() {
    dtepress::logging::init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::List { target } => {
            commands::list::run(target);
            Ok(())
        }
        Command::Create { format } => match format {
            CreateFormat::Tex(args) => commands::create::run(OutputFormat::Tex, args).await,
            CreateFormat::Pdf(args) => commands::create::run(OutputFormat::Pdf, args).await,
        },
    };

    if let Err(err) = result {
        err.exit();
    }
}
