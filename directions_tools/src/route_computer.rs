use log::*;
use ride_common::{GeoCoordinates, GeoPolyline};

use crate::{
    polyline::decode_polyline,
    DirectionsApiError,
    DirectionsProvider,
    DirectionsRequest,
    DirectionsResponse,
    DirectionsRoute,
    RouteLeg,
};

/// Turns directions queries into decoded driving polylines.
///
/// Results distinguish three outcomes:
/// * `Ok(Some(..))` - a route was found.
/// * `Ok(None)` - the provider was reached and answered, but there is no drivable route between the points.
/// * `Err(..)` - the provider could not be reached, reported an explicit error, or sent a malformed payload.
#[derive(Debug, Clone)]
pub struct RouteComputer<P> {
    provider: P,
}

impl<P> RouteComputer<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P> RouteComputer<P>
where P: DirectionsProvider
{
    /// Computes a single route from `origin` to `destination` and returns the decoded overview polyline of the first
    /// route the provider suggests.
    pub async fn compute_route(
        &self,
        origin: GeoCoordinates,
        destination: GeoCoordinates,
    ) -> Result<Option<GeoPolyline>, DirectionsApiError> {
        let request = DirectionsRequest::new(origin, destination);
        let Some(route) = self.first_route(&request).await? else {
            return Ok(None);
        };
        let polyline = decode_polyline(&route.overview_polyline.points)?;
        debug!("🗺️ Route {origin} -> {destination} has {} points", polyline.len());
        Ok(Some(polyline))
    }

    /// Computes a route from `origin` to `destination` through `waypoints`, in order.
    ///
    /// With no waypoints this is [`Self::compute_route`] wrapped in a one-element vector. Otherwise the result holds
    /// one polyline per leg (`origin -> wp1`, `wp1 -> wp2`, ..., `wpN -> destination`), each being the step polylines of
    /// that leg joined end to end.
    pub async fn compute_route_with_waypoints(
        &self,
        origin: GeoCoordinates,
        destination: GeoCoordinates,
        waypoints: &[GeoCoordinates],
    ) -> Result<Option<Vec<GeoPolyline>>, DirectionsApiError> {
        if waypoints.is_empty() {
            let route = self.compute_route(origin, destination).await?;
            return Ok(route.map(|r| vec![r]));
        }
        let request = DirectionsRequest::new(origin, destination).with_waypoints(waypoints.to_vec());
        let Some(route) = self.first_route(&request).await? else {
            return Ok(None);
        };
        let expected_legs = waypoints.len() + 1;
        if route.legs.len() != expected_legs {
            return Err(DirectionsApiError::MalformedResponse(format!(
                "expected {expected_legs} legs for {} waypoints, but the route has {}",
                waypoints.len(),
                route.legs.len()
            )));
        }
        let legs = route.legs.iter().map(join_leg).collect::<Result<Vec<GeoPolyline>, DirectionsApiError>>()?;
        debug!("🗺️ Route {origin} -> {destination} via {} waypoints computed", waypoints.len());
        Ok(Some(legs))
    }

    async fn first_route(&self, request: &DirectionsRequest) -> Result<Option<DirectionsRoute>, DirectionsApiError> {
        let response = self.provider.directions(request).await?;
        first_route(response)
    }
}

fn first_route(response: DirectionsResponse) -> Result<Option<DirectionsRoute>, DirectionsApiError> {
    if let Some(message) = response.error_message {
        warn!("🗺️ Directions provider returned an error ({}): {message}", response.status);
        return Err(DirectionsApiError::ProviderError { status: response.status, message });
    }
    let route = response.routes.into_iter().next();
    if route.is_none() {
        info!("🗺️ Directions provider found no route (status {})", response.status);
    }
    Ok(route)
}

fn join_leg(leg: &RouteLeg) -> Result<GeoPolyline, DirectionsApiError> {
    let steps = leg
        .steps
        .iter()
        .map(|step| decode_polyline(&step.polyline.points))
        .collect::<Result<Vec<GeoPolyline>, DirectionsApiError>>()?;
    Ok(GeoPolyline::join(steps))
}
