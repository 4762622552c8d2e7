//! # Ride tracker
//!
//! Client-side status tracking for the ride service. The service only answers questions; it never pushes. This crate
//! turns repeated polling into change notifications.
//!
//! The building blocks, from the bottom up:
//! * [`RideService`] is the service as a client sees it. [`RideServiceClient`] implements it over HTTP.
//! * A [`StatusGetter`] fetches the current snapshot of one request, pending ride or active ride.
//! * A [`StatusTracker`] polls a getter while listeners are registered, and notifies them of every new version.
//! * The [`facades`] turn tracker notifications into ride events: matched, expired, status updated.
//!
//! Errors that happen while polling never reach the caller directly. They are passed to an [`ErrorHandler`], and
//! polling carries on.
mod client;
mod config;
mod error_handler;
mod errors;
mod status_getter;
mod tracker;

pub mod facades;

pub use client::{RideService, RideServiceClient};
pub use config::TrackerConfig;
pub use error_handler::{ErrorHandler, LoggingErrorHandler};
pub use errors::TrackerError;
pub use status_getter::{ActiveRideStatusGetter, PendingRideStatusGetter, RequestStatusGetter, StatusGetter};
pub use tracker::{ListenerHandle, StatusListener, StatusTracker, TrackerOptions};
