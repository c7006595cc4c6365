//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `import`: Filesystem album import
//! - `library`: Roon Core probe and import
//! - `enrich`: AI credit enrichment

mod enrich;
mod import;
mod library;

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::jobs::{JobKind, Jobs};

pub use enrich::cmd_enrich;
pub use import::cmd_import;
pub use library::{cmd_roon_import, cmd_roon_probe};

/// Musicshelf CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Import albums from a directory tree of audio files
    Import {
        /// Root directory to scan
        path: PathBuf,
        /// Add every imported album to this collection
        #[arg(short, long)]
        collection: Option<i64>,
    },
    /// Import albums from the connected Roon library
    RoonImport {
        /// Roon Core host (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,
        /// Roon Core port
        #[arg(long)]
        port: Option<u16>,
        /// Add every imported album to this collection
        #[arg(short, long)]
        collection: Option<i64>,
        /// Run collection enrichment after the import completes
        #[arg(long)]
        auto_enrich: bool,
    },
    /// Show raw Roon browse data for the first few albums
    RoonProbe {
        /// Roon Core host (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,
        /// Roon Core port
        #[arg(long)]
        port: Option<u16>,
        /// How many albums to fetch (max 10)
        #[arg(long, default_value = "3")]
        count: u32,
    },
    /// Enrich album credits via the configured AI model
    Enrich {
        /// Enrich a single album by ID
        #[arg(long, conflicts_with = "collection")]
        album: Option<i64>,
        /// Enrich every album in a collection
        #[arg(long)]
        collection: Option<i64>,
    },
}

/// Run the specified CLI command.
///
/// Returns `Ok(true)` if a command was run, `Ok(false)` if no command was
/// specified (the caller prints usage).
pub async fn run_command(cli: &Cli) -> anyhow::Result<bool> {
    match &cli.command {
        Some(Commands::Import { path, collection }) => {
            cmd_import(path, *collection).await?;
            Ok(true)
        }
        Some(Commands::RoonImport {
            host,
            port,
            collection,
            auto_enrich,
        }) => {
            cmd_roon_import(host.as_deref(), *port, *collection, *auto_enrich).await?;
            Ok(true)
        }
        Some(Commands::RoonProbe { host, port, count }) => {
            cmd_roon_probe(host.as_deref(), *port, (*count).min(10)).await?;
            Ok(true)
        }
        Some(Commands::Enrich { album, collection }) => {
            cmd_enrich(*album, *collection).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Poll a job's progress until it reaches a terminal state, rendering a
/// single status line. Ctrl+C requests cooperative cancellation; already
/// processed units are kept.
pub(crate) async fn watch_job(jobs: &Jobs, kind: JobKind) {
    let mut poll = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = poll.tick() => {
                let progress = jobs.progress(kind);
                print!("\r\x1b[K{}", format_progress(&progress));
                let _ = std::io::stdout().flush();

                if progress.status.is_terminal() {
                    println!();
                    if !progress.error_list.is_empty() {
                        eprintln!("errors ({} total, most recent {}):",
                            progress.errors, progress.error_list.len());
                        for message in &progress.error_list {
                            eprintln!("  {}", message);
                        }
                    }
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\ncancellation requested, finishing current unit...");
                jobs.request_cancel(kind);
            }
        }
    }
}

fn format_progress(progress: &crate::jobs::Progress) -> String {
    let current = progress
        .current
        .as_deref()
        .map(|label| format!(" | {}", label))
        .unwrap_or_default();
    format!(
        "[{:?}] {}/{} imported={} updated={} skipped={} errors={}{}",
        progress.status,
        progress.done,
        progress.total,
        progress.imported,
        progress.updated,
        progress.skipped,
        progress.errors,
        current,
    )
}
