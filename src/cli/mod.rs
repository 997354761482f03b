//! cli
//!
//! Command-line interface for schemaref.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers build a [`RegistryFactory`](crate::registry::RegistryFactory)
//! from the loaded configuration and drive the [`crate::codec`]. Errors are
//! reported through `anyhow` at this boundary only.

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use anyhow::{Context as _, Result};
use std::path::PathBuf;

use crate::core::config::Config;

/// Everything a command handler needs besides its own arguments.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub cwd: PathBuf,
}

/// Run a parsed command line.
///
/// This is the main entry point called from `main.rs`, after logging is set up.
pub fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to determine working directory")?;

    let loaded = match &cli.config {
        Some(path) => Config::load_from(Some(path.as_path()), Some(&cwd)),
        None => Config::load(Some(&cwd)),
    }
    .context("failed to load configuration")?;
    for warning in &loaded.warnings {
        tracing::warn!(path = %warning.path.display(), "{}", warning.message);
    }

    let ctx = Context {
        config: loaded.config,
        cwd,
    };
    commands::dispatch(cli.command, &ctx)
}
