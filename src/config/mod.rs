//! Configuration management module.
//!
//! Handles loading configuration from environment variables.

use std::{env, time::Duration};

use crate::error::AppError;

/// Default backend address.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:4242";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the portfolio backend (without the `/api/1` suffix).
    pub backend_url: String,
    /// Delay between two polls of a running backend task.
    pub task_poll_interval: Duration,
    /// Timeout applied to each HTTP request.
    pub http_timeout: Duration,
    /// Assets excluded from every aggregate.
    pub ignored_assets: Vec<String>,
    /// Logging level (default: info).
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            task_poll_interval: Duration::from_millis(2000),
            http_timeout: Duration::from_secs(30),
            ignored_assets: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `BACKEND_URL`: backend base URL (default: http://127.0.0.1:4242)
    /// - `TASK_POLL_INTERVAL_MS`: task poll interval (default: 2000)
    /// - `HTTP_TIMEOUT_SECS`: HTTP request timeout (default: 30)
    /// - `IGNORED_ASSETS`: comma-separated asset identifiers
    /// - `LOG_LEVEL`: Logging level (default: info)
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let backend_url = env::var("BACKEND_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.backend_url);

        let task_poll_interval = match env::var("TASK_POLL_INTERVAL_MS") {
            Ok(raw) => Duration::from_millis(parse_number("TASK_POLL_INTERVAL_MS", &raw)?),
            Err(_) => defaults.task_poll_interval,
        };

        let http_timeout = match env::var("HTTP_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(parse_number("HTTP_TIMEOUT_SECS", &raw)?),
            Err(_) => defaults.http_timeout,
        };

        let ignored_assets =
            env::var("IGNORED_ASSETS").map(|raw| parse_list(&raw)).unwrap_or_default();

        let log_level = env::var("LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(Self { backend_url, task_poll_interval, http_timeout, ignored_assets, log_level })
    }
}

fn parse_number(name: &str, raw: &str) -> Result<u64, AppError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| AppError::Config(format!("{name} must be a positive integer: {e}")))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}
