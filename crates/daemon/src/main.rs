// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evaluation Board Daemon (ebd)
//!
//! Worker process that consumes the job queue and executes submitted
//! bundles. Horizontally replicable: every instance shares the queue and
//! state store named by `QUEUE_URL`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;

use eb_adapters::{
    FsBundleStore, MlflowTracker, RedisJobQueue, RedisJobStateStore, TracedTracker,
};
use eb_core::SystemClock;
use eb_engine::{JobWorker, StopSignal, WorkerConfig};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

/// Default tracker experiment id, matching the experiment the UI result
/// links point at.
const EXPERIMENT_ID: &str = "1";

/// Outcome of pre-startup argument handling.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ArgAction {
    /// No flags; proceed with startup.
    Start,
    /// Print the text to stdout and exit successfully.
    Info(String),
    /// Print the message to stderr and exit nonzero.
    Reject(String),
}

fn version_line() -> String {
    format!("ebd {}", env!("CARGO_PKG_VERSION"))
}

fn help_text() -> String {
    format!(
        "{}\n\
         Evaluation board worker daemon - consumes the job queue and runs submissions\n\
         \n\
         USAGE:\n\
         \x20   ebd\n\
         \n\
         Configuration is taken from the environment:\n\
         \x20   SUBMISSIONS_ROOT, LOGS_ROOT, ARTIFACTS_ROOT,\n\
         \x20   QUEUE_URL, TRACKING_URI, WORKER_CONCURRENCY,\n\
         \x20   DEQUEUE_TIMEOUT_SECS\n\
         \n\
         OPTIONS:\n\
         \x20   -h, --help       Print help information\n\
         \x20   -v, --version    Print version information",
        version_line()
    )
}

/// Handle info flags before any config loading or backend connection.
fn handle_args(arg: Option<&str>) -> ArgAction {
    match arg {
        None => ArgAction::Start,
        Some("--version" | "-V" | "-v") => ArgAction::Info(version_line()),
        Some("--help" | "-h" | "help") => ArgAction::Info(help_text()),
        Some(other) => ArgAction::Reject(format!(
            "error: unexpected argument '{other}'\nUsage: ebd [--help | --version]"
        )),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let arg = std::env::args().nth(1);
    match handle_args(arg.as_deref()) {
        ArgAction::Start => {}
        ArgAction::Info(text) => {
            println!("{text}");
            return Ok(());
        }
        ArgAction::Reject(message) => {
            eprintln!("{message}");
            std::process::exit(1);
        }
    }

    setup_logging();
    let config = env::Config::load()?;
    info!("evaluation worker daemon starting");

    let client = redis::Client::open(config.queue_url.as_str())?;
    let conn = client.get_connection_manager().await?;
    let state = RedisJobStateStore::new(conn.clone(), SystemClock);
    let queue = RedisJobQueue::new(conn);
    let store = FsBundleStore::new(&config.submissions_root, &config.logs_root)?;
    let tracker = TracedTracker::new(MlflowTracker::new(&config.tracking_uri, EXPERIMENT_ID));

    let mut worker_config = WorkerConfig::new(&config.artifacts_root, &config.logs_root);
    worker_config.dequeue_timeout = config.dequeue_timeout;

    let stop = StopSignal::new();
    let mut handles = Vec::with_capacity(config.worker_concurrency as usize);
    for n in 0..config.worker_concurrency {
        let worker = JobWorker::new(
            queue.clone(),
            state.clone(),
            store.clone(),
            tracker.clone(),
            worker_config.clone(),
            stop.clone(),
        );
        handles.push(tokio::spawn(async move {
            info!(worker = n, "worker task started");
            worker.run().await;
        }));
    }

    info!(
        workers = config.worker_concurrency,
        queue_url = config.queue_url,
        max_per_hour = config.limits.max_submissions_per_hour,
        max_running = config.limits.max_concurrent_running,
        api_tokens = config.api_tokens.len(),
        "daemon ready, waiting for jobs"
    );

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("received SIGINT, shutting down..."),
    }

    // Workers exit at the next blocking boundary; in-flight jobs run to
    // completion.
    stop.raise();
    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "worker task panicked");
        }
    }
    info!("daemon stopped");
    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
