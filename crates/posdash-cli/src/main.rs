//! posdash CLI - Command-line client for the guest and order dashboard
//!
//! One-shot CRUD commands talk to the REST API directly; `watch` and `sync`
//! keep a push channel open and render live updates.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use posdash_core::config::{ClientConfig, ConfigOverrides};

use crate::cli::{Cli, Commands};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("posdash=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::resolve(
        cli.config.as_deref(),
        ConfigOverrides {
            api_base_url: cli.api_url,
            push_url: cli.push_url,
            request_timeout_secs: cli.timeout,
        },
    )?;
    tracing::debug!("Using API at {}", config.api_base_url);

    match cli.command {
        Commands::Guests(command) => commands::guests::run(command, &config).await,
        Commands::Orders(command) => commands::orders::run(command, &config).await,
        Commands::Status { json } => commands::status::run_status(&config, json).await,
        Commands::Watch { target } => commands::watch::run_watch(target, &config).await,
        Commands::Sync { collection } => {
            commands::sync::run_sync(collection.into(), &config).await
        }
    }
}
