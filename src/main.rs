//! Musicshelf - a personal music-library cataloguing service.
//!
//! Imports albums from a local filesystem or a Roon library into a SQLite
//! catalog, resolves cover art with a rate-limited MusicBrainz fallback,
//! and fills in missing credits via AI enrichment. Long-running jobs run
//! in the background with pollable progress and cooperative cancellation.

pub mod app;
pub mod art;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod enrichment;
pub mod error;
pub mod importer;
pub mod jobs;
pub mod model;
pub mod musicbrainz;
pub mod roon;
pub mod scanner;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("musicshelf=info".parse().unwrap()))
        .init();

    let args = cli::Cli::parse();

    if !cli::run_command(&args).await? {
        // No command specified - show usage
        use clap::CommandFactory;
        cli::Cli::command().print_help()?;
    }
    Ok(())
}
