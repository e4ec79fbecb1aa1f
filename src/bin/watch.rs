//! Terminal tail of the live task board: connects to a running server's
//! event stream and logs snapshots as they change.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use taskboard_stream::client::{
    BoardViewModel, SessionConfig, StreamObserver, StreamSession,
};
use taskboard_stream::config::BackoffConfig;
use taskboard_stream::types::{Task, TaskStatus, WatcherConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Watch a task board server for live changes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct WatchArgs {
    /// Base URL of the task board server
    #[arg(long, default_value = "http://127.0.0.1:31870")]
    url: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

struct WatchObserver {
    view: Arc<BoardViewModel>,
}

impl StreamObserver for WatchObserver {
    fn on_connect(&self) {
        info!("live updates connected");
    }

    fn on_disconnect(&self) {
        warn!("live updates disconnected");
    }

    fn on_tasks_update(&self, tasks: Vec<Task>) {
        // Merging filters out timestamp-only churn
        if self.view.apply_snapshot(tasks) {
            let tasks = self.view.tasks();
            let summary: Vec<String> = TaskStatus::ALL
                .iter()
                .map(|status| {
                    let count = tasks.iter().filter(|t| t.status == *status).count();
                    format!("{status}={count}")
                })
                .collect();
            info!(total = tasks.len(), "board changed: {}", summary.join(" "));
        }
    }

    fn on_watcher_update(&self, config: WatcherConfig) {
        info!(
            is_running = config.is_running,
            active = config.active_task_ids.len(),
            current = config.current_task_id.as_deref().unwrap_or("-"),
            "watcher changed"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = WatchArgs::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let view = Arc::new(BoardViewModel::new());
    let session = StreamSession::spawn(
        SessionConfig {
            base_url: args.url.clone(),
            backoff: BackoffConfig::default(),
        },
        Arc::new(WatchObserver {
            view: Arc::clone(&view),
        }),
    );

    let mut state_rx = session.state_watch();
    tokio::spawn(async move {
        loop {
            let state = *state_rx.borrow_and_update();
            info!(%state, "connection state");
            if state_rx.changed().await.is_err() {
                break;
            }
        }
    });

    info!("watching {} (ctrl-c to stop)", args.url);
    tokio::signal::ctrl_c().await?;
    session.disconnect();

    Ok(())
}
