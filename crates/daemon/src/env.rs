// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use eb_core::Limits;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Daemon configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub submissions_root: PathBuf,
    pub logs_root: PathBuf,
    pub artifacts_root: PathBuf,
    pub queue_url: String,
    pub tracking_uri: String,
    pub limits: Limits,
    pub api_tokens: Vec<String>,
    pub worker_concurrency: u32,
    pub dequeue_timeout: Duration,
}

fn path_var(name: &str, default: &str) -> PathBuf {
    std::env::var(name).map_or_else(|_| PathBuf::from(default), PathBuf::from)
}

fn parsed_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
            name,
            value,
        }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let limits = Limits {
            max_submissions_per_hour: parsed_var("MAX_SUBMISSIONS_PER_HOUR", 50)?,
            max_concurrent_running: parsed_var("MAX_CONCURRENT_RUNNING", 2)?,
        };
        Ok(Self {
            submissions_root: path_var("SUBMISSIONS_ROOT", "/shared/submissions"),
            logs_root: path_var("LOGS_ROOT", "/shared/logs"),
            artifacts_root: path_var("ARTIFACTS_ROOT", "/shared/artifacts"),
            queue_url: std::env::var("QUEUE_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            tracking_uri: std::env::var("TRACKING_URI")
                .unwrap_or_else(|_| "http://mlflow:5010".to_string()),
            limits,
            api_tokens: eb_core::auth::parse_token_allowlist(
                &std::env::var("API_TOKENS").unwrap_or_default(),
            ),
            worker_concurrency: parsed_var("WORKER_CONCURRENCY", 1)?,
            dequeue_timeout: Duration::from_secs(parsed_var("DEQUEUE_TIMEOUT_SECS", 30)?),
        })
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
