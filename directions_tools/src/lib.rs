//! Driving directions for the ride service.
//!
//! [`DirectionsApi`] talks to a Google-Directions-compatible JSON endpoint. [`RouteComputer`] sits on top of any
//! [`DirectionsProvider`] and turns provider responses into decoded [`ride_common::GeoPolyline`]s, one per leg when
//! waypoints are involved.
mod api;
mod config;
mod data_objects;
mod error;
pub mod polyline;
mod provider;
mod route_computer;

pub use api::DirectionsApi;
pub use config::DirectionsConfig;
pub use data_objects::{DirectionsRequest, DirectionsResponse, DirectionsRoute, EncodedPolyline, RouteLeg, RouteStep};
pub use error::DirectionsApiError;
pub use provider::DirectionsProvider;
pub use route_computer::RouteComputer;
