use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const EARTH_RADIUS_KM: f64 = 6371.0;

//--------------------------------------   GeoCoordinates    ---------------------------------------------------------
/// A (latitude, longitude) pair, in decimal degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance to `other`, in kilometres.
    pub fn distance_km(&self, other: &GeoCoordinates) -> f64 {
        let (lat1, lon1) = (self.latitude.to_radians(), self.longitude.to_radians());
        let (lat2, lon2) = (other.latitude.to_radians(), other.longitude.to_radians());
        let sin_dlat = ((lat2 - lat1) * 0.5).sin();
        let sin_dlon = ((lon2 - lon1) * 0.5).sin();
        let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
        let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
        EARTH_RADIUS_KM * c
    }
}

/// Formats as `lat,lng`, which is also the format mapping providers expect in query strings.
impl Display for GeoCoordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid coordinates '{0}'. Expected 'latitude,longitude'")]
pub struct GeoParseError(String);

impl FromStr for GeoCoordinates {
    type Err = GeoParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s.split_once(',').ok_or_else(|| GeoParseError(s.to_string()))?;
        let latitude = lat.trim().parse::<f64>().map_err(|_| GeoParseError(s.to_string()))?;
        let longitude = lng.trim().parse::<f64>().map_err(|_| GeoParseError(s.to_string()))?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoParseError(s.to_string()));
        }
        Ok(Self { latitude, longitude })
    }
}

//--------------------------------------     GeoPolyline       ---------------------------------------------------------
/// An ordered sequence of points describing a path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeoPolyline(Vec<GeoCoordinates>);

impl GeoPolyline {
    pub fn new(points: Vec<GeoCoordinates>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[GeoCoordinates] {
        &self.0
    }

    pub fn into_points(self) -> Vec<GeoCoordinates> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&GeoCoordinates> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&GeoCoordinates> {
        self.0.last()
    }

    /// Appends `other` to this polyline. When this polyline ends on exactly the point `other` starts with, that point
    /// is kept only once.
    pub fn append(&mut self, other: GeoPolyline) {
        let mut points = other.0.into_iter();
        let shared_boundary = matches!((self.0.last(), points.as_slice().first()), (Some(a), Some(b)) if a == b);
        if shared_boundary {
            points.next();
        }
        self.0.extend(points);
    }

    /// Concatenates consecutive polylines into one, removing the duplicated boundary point wherever one polyline
    /// ends where the next begins.
    pub fn join<I>(polylines: I) -> GeoPolyline
    where I: IntoIterator<Item = GeoPolyline> {
        polylines.into_iter().fold(GeoPolyline::default(), |mut acc, next| {
            acc.append(next);
            acc
        })
    }
}

impl From<Vec<GeoCoordinates>> for GeoPolyline {
    fn from(points: Vec<GeoCoordinates>) -> Self {
        Self(points)
    }
}

impl FromIterator<GeoCoordinates> for GeoPolyline {
    fn from_iter<T: IntoIterator<Item = GeoCoordinates>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
