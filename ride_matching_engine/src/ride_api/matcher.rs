use chrono::{DateTime, Utc};
use directions_tools::{DirectionsProvider, RouteComputer};
use log::*;
use ride_common::GeoCoordinates;

use crate::{
    ride_api::{
        errors::{MatcherError, RideStateError},
        matching_api::RideMatchingApi,
    },
    status_types::{PendingRideStatus, RideRelatedRequestStatus, RideRole},
    store::StatusStore,
};

pub const DEFAULT_MAX_PICKUP_DISTANCE_KM: f64 = 5.0;

/// Pairs open driver requests with open rider requests, first come first served.
///
/// Each round walks the unmatched driver requests oldest first. Every driver takes up to `seats` of the oldest
/// unmatched rider requests whose pickup point lies within `max_pickup_distance_km` of the driver's origin. The
/// driver's route goes from their origin, through every pickup and then every drop-off (in the same order), to their
/// destination.
pub struct RideMatcher<B, P> {
    api: RideMatchingApi<B>,
    routes: RouteComputer<P>,
    max_pickup_distance_km: f64,
}

impl<B, P> RideMatcher<B, P> {
    pub fn new(api: RideMatchingApi<B>, routes: RouteComputer<P>, max_pickup_distance_km: f64) -> Self {
        Self { api, routes, max_pickup_distance_km }
    }

    pub fn api(&self) -> &RideMatchingApi<B> {
        &self.api
    }
}

impl<B, P> RideMatcher<B, P>
where
    B: StatusStore,
    P: DirectionsProvider,
{
    pub async fn run_round(&self) -> Result<Vec<PendingRideStatus>, MatcherError> {
        self.run_round_at(Utc::now()).await
    }

    /// Runs one matching round and returns the pending rides it created.
    ///
    /// A driver with no route to their riders is skipped. A directions provider failure ends the round early; rides
    /// created before the failure stand.
    pub async fn run_round_at(&self, now: DateTime<Utc>) -> Result<Vec<PendingRideStatus>, MatcherError> {
        let mut open = self.api.open_unmatched_requests_at(now).await?;
        open.sort_by(|a, b| a.post_time.cmp(&b.post_time).then_with(|| a.id.cmp(&b.id)));
        let (drivers, riders): (Vec<_>, Vec<_>) = open.into_iter().partition(|r| r.details.role.is_driver());
        let mut available = riders.into_iter().map(Some).collect::<Vec<Option<RideRelatedRequestStatus>>>();
        let mut created = Vec::new();
        for driver in drivers {
            let RideRole::Driver { seats } = driver.details.role else { continue };
            let chosen = available
                .iter()
                .enumerate()
                .filter_map(|(i, r)| r.as_ref().map(|r| (i, r)))
                .filter(|(_, r)| r.user_id != driver.user_id)
                .filter(|(_, r)| r.details.origin.distance_km(&driver.details.origin) <= self.max_pickup_distance_km)
                .take(seats as usize)
                .map(|(i, _)| i)
                .collect::<Vec<usize>>();
            if chosen.is_empty() {
                continue;
            }
            let chosen_riders = chosen.iter().filter_map(|&i| available[i].as_ref()).collect::<Vec<_>>();
            let waypoints = waypoints_for(&chosen_riders);
            let route = self
                .routes
                .compute_route_with_waypoints(driver.details.origin, driver.details.destination, &waypoints)
                .await?;
            let Some(route) = route else {
                warn!("🚗 No route for driver request {} and {} riders. Skipping", driver.id, chosen.len());
                continue;
            };
            let rider_ids = chosen_riders.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
            match self.api.match_requests_at(&driver.id, &rider_ids, waypoints, route, now).await {
                Ok(pending) => {
                    for i in chosen {
                        available[i] = None;
                    }
                    created.push(pending);
                },
                Err(e @ RideStateError::StoreError(_)) => return Err(e.into()),
                Err(e) => warn!("🚗 Could not match driver request {}: {e}", driver.id),
            }
        }
        if !created.is_empty() {
            info!("🚗 Matching round created {} pending rides", created.len());
        }
        Ok(created)
    }
}

/// Every pickup, then every drop-off, in rider order.
fn waypoints_for(riders: &[&RideRelatedRequestStatus]) -> Vec<GeoCoordinates> {
    riders.iter().map(|r| r.details.origin).chain(riders.iter().map(|r| r.details.destination)).collect()
}
