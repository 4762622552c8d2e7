//! # Ride server
//! The ride server is the ride service that clients poll. It is responsible for:
//! * Serving the current status of ride requests, pending rides and active rides.
//! * Accepting ride actions (submit, confirm, cancel, pickup, drop-off, finish) and passing them to the matching
//!   engine, which is the only thing allowed to change a status record.
//! * Running the background expiry sweep and matching rounds.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/errors`: The most recent failures reported by the background workers.
//! * `/requests`, `/requests/{user_id}/{request_id}[/cancel]`: ride requests.
//! * `/pending_rides/{id}[/confirm]`: pending rides.
//! * `/active_rides/{id}[/pickup|/dropoff|/finish|/cancel|/game_elements]`: active rides.

pub mod cli;
pub mod config;
pub mod context;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod matching_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
