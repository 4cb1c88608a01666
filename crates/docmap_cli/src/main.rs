//! DocMap CLI
//!
//! Command-line tools for inspecting DocMap change detection on JSON files.
//!
//! # Commands
//!
//! - `diff` - Print the update statement between two documents
//! - `flatten` - Print a document in dotted-path form
//! - `unflatten` - Rebuild a nested document from dotted paths
//! - `encode` - Print the canonical CBOR of an update statement as hex

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// DocMap command-line tools.
#[derive(Parser)]
#[command(name = "docmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the update statement that turns OLD into NEW
    Diff {
        /// Snapshot document (JSON), or `-` for none
        old: String,

        /// Current document (JSON)
        new: PathBuf,

        /// Output format (json, text)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Read single-key `{"$inc": n}` objects as increments
        #[arg(long)]
        operators: bool,

        /// Replace whole subtrees on array/object shape changes instead of failing
        #[arg(long)]
        replace_on_conflict: bool,
    },

    /// Print a document in dotted-path form
    Flatten {
        /// Document (JSON)
        file: PathBuf,

        /// Keep query operators such as `$gt` attached to their field
        #[arg(short, long)]
        query: bool,
    },

    /// Rebuild a nested document from dotted paths
    Unflatten {
        /// Flat document (JSON)
        file: PathBuf,
    },

    /// Print the canonical CBOR update statement as hex
    Encode {
        /// Snapshot document (JSON), or `-` for none
        old: String,

        /// Current document (JSON)
        new: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Diff {
            old,
            new,
            format,
            operators,
            replace_on_conflict,
        } => {
            let options = commands::diff::DiffOptions {
                operators,
                replace_on_conflict,
            };
            commands::diff::run(&old, &new, &format, options)?;
        }
        Commands::Flatten { file, query } => {
            commands::flatten::run(&file, query)?;
        }
        Commands::Unflatten { file } => {
            commands::unflatten::run(&file)?;
        }
        Commands::Encode { old, new } => {
            commands::encode::run(&old, &new)?;
        }
        Commands::Version => {
            println!("DocMap CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
