use ride_common::GeoCoordinates;
use serde::{Deserialize, Serialize};

/// A single driving-directions query. Waypoints are visited in the order given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRequest {
    pub origin: GeoCoordinates,
    pub destination: GeoCoordinates,
    #[serde(default)]
    pub waypoints: Vec<GeoCoordinates>,
}

impl DirectionsRequest {
    pub fn new(origin: GeoCoordinates, destination: GeoCoordinates) -> Self {
        Self { origin, destination, waypoints: Vec::new() }
    }

    pub fn with_waypoints(mut self, waypoints: Vec<GeoCoordinates>) -> Self {
        self.waypoints = waypoints;
        self
    }

    /// The query parameters for a Directions-style GET request, excluding the API key.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("origin", self.origin.to_string()),
            ("destination", self.destination.to_string()),
            ("mode", "driving".to_string()),
        ];
        if !self.waypoints.is_empty() {
            let waypoints = self.waypoints.iter().map(|w| w.to_string()).collect::<Vec<String>>().join("|");
            params.push(("waypoints", waypoints));
        }
        params
    }
}

/// The subset of the provider's JSON response that route computation needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionsResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
}

impl DirectionsResponse {
    pub fn ok(routes: Vec<DirectionsRoute>) -> Self {
        Self { status: "OK".to_string(), error_message: None, routes }
    }

    pub fn zero_results() -> Self {
        Self { status: "ZERO_RESULTS".to_string(), error_message: None, routes: Vec::new() }
    }

    pub fn error<S: Into<String>>(status: &str, message: S) -> Self {
        Self { status: status.to_string(), error_message: Some(message.into()), routes: Vec::new() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRoute {
    pub overview_polyline: EncodedPolyline,
    #[serde(default)]
    pub legs: Vec<RouteLeg>,
}

/// The part of a route between two consecutive stops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    #[serde(default)]
    pub steps: Vec<RouteStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub polyline: EncodedPolyline,
}

/// A compact-encoded point list, as produced by the polyline encoding algorithm.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodedPolyline {
    pub points: String,
}

impl EncodedPolyline {
    pub fn new<S: Into<String>>(points: S) -> Self {
        Self { points: points.into() }
    }
}
