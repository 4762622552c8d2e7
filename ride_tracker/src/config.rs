use std::{env, time::Duration};

use log::*;
use ride_common::helpers::env_or_default;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8460";
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;

/// Client-side configuration: where the ride service lives, and how trackers poll it.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub server_url: String,
    /// The time between polls while the tracked status is healthy.
    pub poll_interval: Duration,
    /// Upper bound on a single status fetch.
    pub fetch_timeout: Duration,
    /// Repeated fetch failures double the poll interval, up to this ceiling.
    pub max_backoff: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
        }
    }
}

impl TrackerConfig {
    pub fn from_env_or_default() -> Self {
        let server_url = env::var("RIDE_SERVER_URL").unwrap_or_else(|_| {
            debug!("🪛️ RIDE_SERVER_URL not set, using {DEFAULT_SERVER_URL}");
            DEFAULT_SERVER_URL.to_string()
        });
        let poll_interval = env_or_default("RIDE_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS).max(1);
        let fetch_timeout = env_or_default("RIDE_FETCH_TIMEOUT_MS", DEFAULT_FETCH_TIMEOUT_MS).max(1);
        let max_backoff = env_or_default("RIDE_MAX_BACKOFF_MS", DEFAULT_MAX_BACKOFF_MS).max(poll_interval);
        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(poll_interval),
            fetch_timeout: Duration::from_millis(fetch_timeout),
            max_backoff: Duration::from_millis(max_backoff),
        }
    }
}
