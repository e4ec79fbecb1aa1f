//! Task Board Stream Server
//!
//! Serves the task board REST API and the live event stream.

use anyhow::Result;
use clap::Parser;
use std::fs::OpenOptions;
use std::sync::Arc;
use taskboard_stream::api;
use taskboard_stream::cli::{Cli, Command};
use taskboard_stream::config::{StreamConfig, DEFAULT_PORT};
use taskboard_stream::db::Database;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new().create(true).append(true).open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    match cli.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(&cli).await,
    }
}

async fn serve(cli: &Cli) -> Result<()> {
    let db = Arc::new(Database::open(&cli.database)?);
    info!("Database initialized at {}", cli.database);

    let port = cli.port.unwrap_or(DEFAULT_PORT);
    let (shutdown_tx, bound_addr) =
        api::start_server(Arc::clone(&db), port, StreamConfig::default()).await?;
    info!("Task board available at http://{}", bound_addr);
    info!("Event stream at http://{}/api/events", bound_addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    let _ = shutdown_tx.send(());

    Ok(())
}
