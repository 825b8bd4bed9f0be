// src/main.rs

//! Entry point for the cmdgate binary.
//!
//! Parses the CLI, sets up logging and configuration, then hands off to the
//! runtime or the registry check. No request handling lives here.

use anyhow::{bail, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cmdgate::checks::{check_registry, render_report};
use cmdgate::cli::{Cli, Command};
use cmdgate::config::Config;
use cmdgate::runtime::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // .env may carry RUST_LOG, so load it before the subscriber reads it
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, listen } => {
            let mut cfg = Config::discover(config.as_deref())?;

            if let Some(listen) = listen {
                cfg.listen = listen;
                cfg.validate()?;
            }

            let addr = cfg.listen_addr()?;
            let state = Arc::new(AppState::from_config(&cfg));

            runtime::serve(addr, state).await
        }

        Command::Check { config } => {
            let cfg = Config::discover(config.as_deref())?;
            let reports = check_registry(&cfg.registry());

            println!("{}", render_report(&reports));

            let failed = reports.iter().filter(|r| !r.is_ok()).count();
            if failed > 0 {
                bail!("{} of {} executables are not usable", failed, reports.len());
            }
            Ok(())
        }
    }
}
