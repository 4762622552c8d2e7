mod geo;
pub mod helpers;
mod ids;
mod secret;

pub use geo::{GeoCoordinates, GeoParseError, GeoPolyline};
pub use ids::{ActiveRideId, PendingRideId, RequestId, UserId};
pub use secret::Secret;
