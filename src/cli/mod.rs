//! Command-line interface for musicshelf.
//!
//! This module provides CLI commands for importing albums from the
//! filesystem or a Roon library and for AI credit enrichment, with live
//! progress display and Ctrl+C cancellation.

mod commands;

pub use commands::{run_command, Cli, Commands};
