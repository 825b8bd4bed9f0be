// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// HTTP gateway for pre-installed device-control executables.
///
/// Without `--config`, `cmdgate.yaml` in the working directory is used when
/// present, otherwise the built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "cmdgate", version, disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server.
    Serve {
        /// Path to config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the listen address
        ///
        /// Example:
        /// --listen 127.0.0.1:5000
        #[arg(long)]
        listen: Option<String>,
    },

    /// Check that every configured executable exists and is executable.
    ///
    /// Exits non-zero if any entry fails.
    Check {
        /// Path to config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
