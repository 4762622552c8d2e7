use std::time::Duration;

use log::*;
use ride_common::{helpers::env_or_default, Secret};

const DEFAULT_DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct DirectionsConfig {
    /// Full URL of the JSON directions endpoint.
    pub base_url: String,
    pub api_key: Secret<String>,
    /// Upper bound on a single directions request.
    pub timeout: Duration,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DIRECTIONS_URL.to_string(),
            api_key: Secret::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl DirectionsConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("RIDE_DIRECTIONS_URL").unwrap_or_else(|_| {
            debug!("🪛️ RIDE_DIRECTIONS_URL not set, using {DEFAULT_DIRECTIONS_URL}");
            DEFAULT_DIRECTIONS_URL.to_string()
        });
        let api_key = Secret::new(std::env::var("RIDE_DIRECTIONS_API_KEY").unwrap_or_else(|_| {
            warn!("🪛️ RIDE_DIRECTIONS_API_KEY not set. Directions requests will probably be denied.");
            String::default()
        }));
        let timeout = Duration::from_secs(env_or_default("RIDE_DIRECTIONS_TIMEOUT", DEFAULT_TIMEOUT_SECS));
        Self { base_url, api_key, timeout }
    }
}
