use std::{env, time::Duration};

use directions_tools::DirectionsConfig;
use log::*;
use ride_common::helpers::env_or_default;
use ride_matching_engine::{RideTimeouts, DEFAULT_MAX_PICKUP_DISTANCE_KM};

const DEFAULT_RIDE_HOST: &str = "127.0.0.1";
const DEFAULT_RIDE_PORT: u16 = 8460;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/ride_status.db";
const DEFAULT_EXPIRY_INTERVAL_SECS: u64 = 30;
const DEFAULT_MATCHING_INTERVAL_SECS: u64 = 10;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// How long requests and pending rides stay open.
    pub timeouts: RideTimeouts,
    /// The period of the expiry sweep. Reads expire due records on their own, so the sweep only bounds how long an
    /// unobserved record stays open.
    pub expiry_interval: Duration,
    /// The period between matching rounds.
    pub matching_interval: Duration,
    /// Riders are only offered to drivers whose origin lies within this distance of their pickup point.
    pub max_pickup_distance_km: f64,
    pub directions: DirectionsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RIDE_HOST.to_string(),
            port: DEFAULT_RIDE_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            timeouts: RideTimeouts::default(),
            expiry_interval: Duration::from_secs(DEFAULT_EXPIRY_INTERVAL_SECS),
            matching_interval: Duration::from_secs(DEFAULT_MATCHING_INTERVAL_SECS),
            max_pickup_distance_km: DEFAULT_MAX_PICKUP_DISTANCE_KM,
            directions: DirectionsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("RIDE_HOST").ok().unwrap_or_else(|| DEFAULT_RIDE_HOST.into());
        let port = env::var("RIDE_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for RIDE_PORT. {e} Using the default, {DEFAULT_RIDE_PORT}, instead."
                    );
                    DEFAULT_RIDE_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_RIDE_PORT);
        let database_url = env::var("RIDE_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ RIDE_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let expiry_interval =
            Duration::from_secs(env_or_default("RIDE_EXPIRY_INTERVAL", DEFAULT_EXPIRY_INTERVAL_SECS).max(1));
        let matching_interval =
            Duration::from_secs(env_or_default("RIDE_MATCHING_INTERVAL", DEFAULT_MATCHING_INTERVAL_SECS).max(1));
        let max_pickup_distance_km = env_or_default("RIDE_MAX_PICKUP_DISTANCE_KM", DEFAULT_MAX_PICKUP_DISTANCE_KM);
        Self {
            host,
            port,
            database_url,
            timeouts: RideTimeouts::from_env_or_default(),
            expiry_interval,
            matching_interval,
            max_pickup_distance_km,
            directions: DirectionsConfig::new_from_env_or_default(),
        }
    }
}
