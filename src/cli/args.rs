//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Only log warnings and errors
//! - `--config <path>`: Global config file instead of the default search

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// schemaref - Inspect and round-trip JSON Schema documents through the reference registry
#[derive(Parser, Debug)]
#[command(name = "schemaref")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Global config file to use instead of the default locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Log filter directive implied by the global flags, if any.
    pub fn log_directive(&self) -> Option<&'static str> {
        if self.debug {
            Some("debug")
        } else if self.quiet {
            Some("warn")
        } else {
            None
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Unserialize a schema document and print the resulting references
    #[command(after_help = "\
EXAMPLES:
    # Classes, entities and properties of a document
    schemaref parse car.schema.json

    # Into a specific namespace, keeping the root a plain class
    schemaref parse car.schema.json --namespace fleet --as-class")]
    Parse {
        /// Schema document (JSON)
        file: PathBuf,

        /// Namespace the document's references are created in
        #[arg(long, short)]
        namespace: Option<String>,

        /// Keep the root a class instead of promoting it to an entity
        #[arg(long)]
        as_class: bool,
    },

    /// Unserialize a schema document and serialize it back
    Roundtrip {
        /// Schema document (JSON)
        file: PathBuf,

        /// Namespace the document's references are created in
        #[arg(long, short)]
        namespace: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_flags() {
        let cli = Cli::try_parse_from([
            "schemaref",
            "--debug",
            "parse",
            "car.json",
            "--namespace",
            "fleet",
            "--as-class",
        ])
        .unwrap();
        assert_eq!(cli.log_directive(), Some("debug"));
        match cli.command {
            Command::Parse {
                file,
                namespace,
                as_class,
            } => {
                assert_eq!(file, PathBuf::from("car.json"));
                assert_eq!(namespace.as_deref(), Some("fleet"));
                assert!(as_class);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn debug_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["schemaref", "--debug", "-q", "roundtrip", "a.json"]).is_err());
    }
}
