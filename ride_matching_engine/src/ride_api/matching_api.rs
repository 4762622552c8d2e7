use std::{collections::HashSet, fmt::Debug, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use log::*;
use ride_common::{
    helpers::env_duration_secs,
    ActiveRideId,
    GeoCoordinates,
    GeoPolyline,
    PendingRideId,
    RequestId,
    UserId,
};

use crate::{
    events::{
        ActiveRideChangedEvent,
        EventProducers,
        PendingRideChangedEvent,
        RequestExpiredEvent,
        RequestMatchedEvent,
    },
    lock_registry::{LockKey, LockRegistry},
    ride_api::errors::RideStateError,
    status_types::{
        ActiveRideStatus,
        PendingRideState,
        PendingRideStatus,
        RequestDetails,
        RideInfo,
        RideParticipant,
        RideRelatedRequestStatus,
        RideRole,
        RideState,
        RiderState,
        StateMachine,
        StatusRecord,
        TransitionError,
    },
    store::{ChangeSet, StatusStore},
};

/// How often the related-record discovery in [`RideMatchingApi::post_request_cancel`] is retried when the set of
/// records changes between discovery and locking.
const MAX_LOCK_ATTEMPTS: usize = 3;

/// How long requests and pending rides stay open before they expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RideTimeouts {
    pub request_timeout: Duration,
    pub pending_ride_timeout: Duration,
}

impl Default for RideTimeouts {
    fn default() -> Self {
        Self { request_timeout: Duration::seconds(900), pending_ride_timeout: Duration::seconds(300) }
    }
}

impl RideTimeouts {
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        Self {
            request_timeout: env_duration_secs("RIDE_REQUEST_TIMEOUT", defaults.request_timeout),
            pending_ride_timeout: env_duration_secs("RIDE_PENDING_RIDE_TIMEOUT", defaults.pending_ride_timeout),
        }
    }
}

fn key<R: StatusRecord>(id: &R::Id) -> LockKey {
    LockKey::new(R::KIND, id)
}

fn bump<R: StatusRecord>(record: &mut R) {
    record.set_version(record.version() + 1);
}

/// `RideMatchingApi` is the only component that changes status records. It moves requests, pending rides and active
/// rides through their lifecycles.
///
/// Every mutation
/// * takes the write lock of every record it touches (in sorted order when there are several),
/// * re-reads those records and validates the requested transition before writing anything,
/// * commits all of its changes as one [`ChangeSet`], bumping each touched record's version by exactly one,
/// * and only then publishes the matching events.
///
/// The `*_at` variants take the current time as a parameter. The plain variants use the wall clock.
#[derive(Clone)]
pub struct RideMatchingApi<B> {
    db: B,
    locks: Arc<LockRegistry>,
    producers: EventProducers,
    timeouts: RideTimeouts,
}

impl<B> Debug for RideMatchingApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RideMatchingApi ({:?})", self.timeouts)
    }
}

impl<B> RideMatchingApi<B> {
    pub fn new(db: B, producers: EventProducers, timeouts: RideTimeouts) -> Self {
        Self { db, locks: Arc::new(LockRegistry::new()), producers, timeouts }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn timeouts(&self) -> RideTimeouts {
        self.timeouts
    }
}

impl<B> RideMatchingApi<B>
where B: StatusStore
{
    async fn load<R: StatusRecord>(&self, id: &R::Id) -> Result<R, RideStateError> {
        self.db.fetch::<R>(id).await?.ok_or_else(|| RideStateError::not_found(R::KIND, id))
    }

    async fn load_owned_request(
        &self,
        user_id: &UserId,
        request_id: &RequestId,
    ) -> Result<RideRelatedRequestStatus, RideStateError> {
        let request = self.load::<RideRelatedRequestStatus>(request_id).await?;
        if request.user_id != *user_id {
            return Err(RideStateError::NotOwner(request_id.clone(), user_id.clone()));
        }
        Ok(request)
    }

    //-------------------------------------------   Requests   -------------------------------------------------------

    pub async fn submit_request(
        &self,
        user_id: &UserId,
        details: RequestDetails,
    ) -> Result<RideRelatedRequestStatus, RideStateError> {
        self.submit_request_at(user_id, details, Utc::now()).await
    }

    /// Creates a new request at version 1. It stays open for the configured request timeout.
    pub async fn submit_request_at(
        &self,
        user_id: &UserId,
        details: RequestDetails,
        now: DateTime<Utc>,
    ) -> Result<RideRelatedRequestStatus, RideStateError> {
        if user_id.is_empty() {
            return Err(RideStateError::InvalidRequest("A user id is required".into()));
        }
        if let RideRole::Driver { seats: 0 } = details.role {
            return Err(RideStateError::InvalidRequest("A driver must offer at least one seat".into()));
        }
        let request = RideRelatedRequestStatus::new(user_id.clone(), details, now, self.timeouts.request_timeout);
        let mut changes = ChangeSet::new();
        changes.insert(&request)?;
        self.db.commit(changes).await?;
        debug!("🚗 New {} request {} from {user_id}", request.details.role, request.id);
        Ok(request)
    }

    pub async fn fetch_request_status(
        &self,
        user_id: &UserId,
        request_id: &RequestId,
    ) -> Result<RideRelatedRequestStatus, RideStateError> {
        self.fetch_request_status_at(user_id, request_id, Utc::now()).await
    }

    /// Fetches a request's status. If the request (or the pending ride it belongs to) is past its deadline, it is
    /// expired first, so the caller always sees an up-to-date expiry flag.
    pub async fn fetch_request_status_at(
        &self,
        user_id: &UserId,
        request_id: &RequestId,
        now: DateTime<Utc>,
    ) -> Result<RideRelatedRequestStatus, RideStateError> {
        let request = self.load_owned_request(user_id, request_id).await?;
        if request.is_due(now) {
            self.expire_request(request_id, now).await?;
            return self.load(request_id).await;
        }
        if let (true, Some(pending_id)) = (request.is_open(), &request.pending_ride_id) {
            let pending = self.load::<PendingRideStatus>(pending_id).await?;
            if pending.is_due(now) {
                self.expire_pending_ride(pending_id, now).await?;
                return self.load(request_id).await;
            }
        }
        Ok(request)
    }

    /// Every open request that is not part of a ride yet and has not passed its deadline.
    pub async fn open_unmatched_requests_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<RideRelatedRequestStatus>, RideStateError> {
        let open = self.db.fetch_open::<RideRelatedRequestStatus>().await?;
        Ok(open.into_iter().filter(|r| !r.is_matched() && !r.is_due(now)).collect())
    }

    pub async fn post_request_cancel(
        &self,
        user_id: &UserId,
        request_id: &RequestId,
    ) -> Result<RideRelatedRequestStatus, RideStateError> {
        for attempt in 1..=MAX_LOCK_ATTEMPTS {
            let request = self.load_owned_request(user_id, request_id).await?;
            let (keys, _) = self.keys_related_to(&request).await?;
            let locks = self.locks.lock_all(keys).await;
            let request = self.load_owned_request(user_id, request_id).await?;
            let (keys, pending) = self.keys_related_to(&request).await?;
            if locks.holds_all(&keys) {
                return self.cancel_request_locked(request, pending).await;
            }
            debug!("🚗 Records related to {request_id} changed while locking (attempt {attempt}). Retrying");
        }
        Err(RideStateError::ConcurrentModification(format!("request {request_id}")))
    }

    /// The request, its pending ride, the other member requests, and the active ride if there is one.
    async fn keys_related_to(
        &self,
        request: &RideRelatedRequestStatus,
    ) -> Result<(Vec<LockKey>, Option<PendingRideStatus>), RideStateError> {
        let mut keys = vec![key::<RideRelatedRequestStatus>(&request.id)];
        let Some(pending_id) = &request.pending_ride_id else {
            return Ok((keys, None));
        };
        let pending = self.load::<PendingRideStatus>(pending_id).await?;
        keys.push(key::<PendingRideStatus>(&pending.id));
        keys.extend(pending.ride_info.participants().map(|p| key::<RideRelatedRequestStatus>(&p.request_id)));
        if let Some(active_id) = &pending.active_ride_id {
            keys.push(key::<ActiveRideStatus>(active_id));
        }
        Ok((keys, Some(pending)))
    }

    async fn cancel_request_locked(
        &self,
        mut request: RideRelatedRequestStatus,
        pending: Option<PendingRideStatus>,
    ) -> Result<RideRelatedRequestStatus, RideStateError> {
        if !request.is_open() {
            return Err(RideStateError::RequestClosed(request.id.clone()));
        }
        let mut changes = ChangeSet::new();
        let mut changed_pending = None;
        let mut changed_active = None;
        match pending {
            Some(mut pending) if !pending.state.is_terminal() => {
                pending.state = pending.state.validate_transition(PendingRideState::Canceled)?;
                bump(&mut pending);
                changes.update(&pending)?;
                // Everyone else goes back into the matching pool
                for member in pending.ride_info.participants().filter(|p| p.request_id != request.id) {
                    let mut other = self.load::<RideRelatedRequestStatus>(&member.request_id).await?;
                    if other.pending_ride_id.as_ref() == Some(&pending.id) {
                        other.pending_ride_id = None;
                        bump(&mut other);
                        changes.update(&other)?;
                    }
                }
                changed_pending = Some(pending);
            },
            Some(pending) if pending.state == PendingRideState::Confirmed => {
                if let Some(active_id) = &pending.active_ride_id {
                    let mut active = self.load::<ActiveRideStatus>(active_id).await?;
                    if active.driver_id == request.user_id {
                        cancel_whole_ride(&mut active)?;
                    } else {
                        let state = active
                            .riders_state
                            .get_mut(&request.user_id)
                            .ok_or_else(|| RideStateError::NotParticipant(request.user_id.clone(), active_id.to_string()))?;
                        *state = state.validate_transition(RiderState::Canceled)?;
                    }
                    bump(&mut active);
                    changes.update(&active)?;
                    changed_active = Some(active);
                }
            },
            _ => {},
        }
        request.is_canceled = true;
        bump(&mut request);
        changes.update(&request)?;
        self.db.commit(changes).await?;
        debug!("🚗 Request {} was canceled by {}", request.id, request.user_id);
        if let Some(pending) = changed_pending {
            info!("🚗 Pending ride {} was canceled because request {} was withdrawn", pending.id, request.id);
            self.producers.publish_pending_ride_changed(PendingRideChangedEvent::new(pending)).await;
        }
        if let Some(active) = changed_active {
            self.producers.publish_active_ride_changed(ActiveRideChangedEvent::new(active)).await;
        }
        Ok(request)
    }

    //-------------------------------------------   Matching   -------------------------------------------------------

    pub async fn match_requests(
        &self,
        driver_request: &RequestId,
        rider_requests: &[RequestId],
        waypoints: Vec<GeoCoordinates>,
        route: Vec<GeoPolyline>,
    ) -> Result<PendingRideStatus, RideStateError> {
        self.match_requests_at(driver_request, rider_requests, waypoints, route, Utc::now()).await
    }

    /// Puts a driver request and some rider requests into a new pending ride.
    ///
    /// Every request must be open and unmatched, the first must come from a driver with enough seats for all the
    /// riders, and nobody may appear twice. The pending ride starts off waiting on the driver, and every member request
    /// is stamped with its id.
    pub async fn match_requests_at(
        &self,
        driver_request: &RequestId,
        rider_requests: &[RequestId],
        waypoints: Vec<GeoCoordinates>,
        route: Vec<GeoPolyline>,
        now: DateTime<Utc>,
    ) -> Result<PendingRideStatus, RideStateError> {
        if rider_requests.is_empty() {
            return Err(RideStateError::InvalidMatch("A ride needs at least one rider".into()));
        }
        let unique = rider_requests.iter().chain(std::iter::once(driver_request)).collect::<HashSet<_>>();
        if unique.len() != rider_requests.len() + 1 {
            return Err(RideStateError::InvalidMatch("A request cannot appear in a ride more than once".into()));
        }
        let keys = rider_requests.iter().chain(std::iter::once(driver_request)).map(key::<RideRelatedRequestStatus>);
        let _locks = self.locks.lock_all(keys).await;

        let driver = self.load::<RideRelatedRequestStatus>(driver_request).await?;
        let mut riders = Vec::with_capacity(rider_requests.len());
        for id in rider_requests {
            riders.push(self.load::<RideRelatedRequestStatus>(id).await?);
        }
        for request in std::iter::once(&driver).chain(riders.iter()) {
            if !request.is_open() || request.is_due(now) {
                return Err(RideStateError::RequestClosed(request.id.clone()));
            }
            if let Some(pending_id) = &request.pending_ride_id {
                return Err(RideStateError::AlreadyMatched(request.id.clone(), pending_id.clone()));
            }
        }
        let RideRole::Driver { seats } = driver.details.role else {
            return Err(RideStateError::InvalidMatch(format!("Request {} is not from a driver", driver.id)));
        };
        if let Some(r) = riders.iter().find(|r| r.details.role.is_driver()) {
            return Err(RideStateError::InvalidMatch(format!("Request {} is not from a rider", r.id)));
        }
        if riders.len() > seats as usize {
            return Err(RideStateError::InvalidMatch(format!(
                "The driver has {seats} seats, but {} riders were matched",
                riders.len()
            )));
        }
        let users = riders.iter().chain(std::iter::once(&driver)).map(|r| &r.user_id).collect::<HashSet<_>>();
        if users.len() != riders.len() + 1 {
            return Err(RideStateError::InvalidMatch("A user cannot appear in a ride more than once".into()));
        }

        let ride_info = RideInfo {
            driver: RideParticipant::new(driver.user_id.clone(), driver.id.clone()),
            riders: riders.iter().map(|r| RideParticipant::new(r.user_id.clone(), r.id.clone())).collect(),
            origin: driver.details.origin,
            destination: driver.details.destination,
            waypoints,
            route,
        };
        let pending = PendingRideStatus::new(ride_info, now, self.timeouts.pending_ride_timeout);
        let mut changes = ChangeSet::new();
        changes.insert(&pending)?;
        let mut members = Vec::with_capacity(riders.len() + 1);
        for mut request in std::iter::once(driver).chain(riders) {
            request.pending_ride_id = Some(pending.id.clone());
            bump(&mut request);
            changes.update(&request)?;
            members.push(request);
        }
        self.db.commit(changes).await?;
        info!("🚗 Pending ride {} created for {} requests", pending.id, members.len());
        for request in members {
            self.producers.publish_request_matched(RequestMatchedEvent::new(request, pending.clone())).await;
        }
        self.producers.publish_pending_ride_changed(PendingRideChangedEvent::new(pending.clone())).await;
        Ok(pending)
    }

    //-------------------------------------------  Pending rides  ----------------------------------------------------

    pub async fn fetch_pending_ride_status(&self, id: &PendingRideId) -> Result<PendingRideStatus, RideStateError> {
        self.fetch_pending_ride_status_at(id, Utc::now()).await
    }

    /// Fetches a pending ride's status, expiring it first if it is past its deadline.
    pub async fn fetch_pending_ride_status_at(
        &self,
        id: &PendingRideId,
        now: DateTime<Utc>,
    ) -> Result<PendingRideStatus, RideStateError> {
        let pending = self.load::<PendingRideStatus>(id).await?;
        if pending.is_due(now) {
            self.expire_pending_ride(id, now).await?;
            return self.load(id).await;
        }
        Ok(pending)
    }

    pub async fn post_confirm(&self, user_id: &UserId, id: &PendingRideId) -> Result<PendingRideStatus, RideStateError> {
        self.post_confirm_at(user_id, id, Utc::now()).await
    }

    /// Records a confirmation of a pending ride.
    ///
    /// The driver confirms first, which moves the ride on to waiting for riders. Once every rider has confirmed, the
    /// pending ride is confirmed and its active ride is created.
    pub async fn post_confirm_at(
        &self,
        user_id: &UserId,
        id: &PendingRideId,
        now: DateTime<Utc>,
    ) -> Result<PendingRideStatus, RideStateError> {
        let locks = self.locks.lock_all([key::<PendingRideStatus>(id)]).await;
        let mut pending = self.load::<PendingRideStatus>(id).await?;
        if !pending.ride_info.is_participant(user_id) {
            return Err(RideStateError::NotParticipant(user_id.clone(), id.to_string()));
        }
        if pending.is_due(now) {
            drop(locks);
            self.expire_pending_ride(id, now).await?;
            return Err(RideStateError::PendingRideExpired(id.clone()));
        }
        let mut changes = ChangeSet::new();
        let mut active = None;
        if pending.ride_info.driver.user_id == *user_id {
            pending.state = pending.state.validate_transition(PendingRideState::WaitingOnRiders)?;
        } else {
            match pending.state {
                PendingRideState::WaitingOnDriver => return Err(RideStateError::DriverNotConfirmed(id.clone())),
                PendingRideState::WaitingOnRiders => {
                    if pending.confirmed_riders.contains(user_id) {
                        return Err(RideStateError::AlreadyConfirmed(user_id.clone(), id.clone()));
                    }
                    pending.confirmed_riders.push(user_id.clone());
                    if pending.all_riders_confirmed() {
                        pending.state = pending.state.validate_transition(PendingRideState::Confirmed)?;
                        let ride = ActiveRideStatus::new(&pending);
                        pending.active_ride_id = Some(ride.id.clone());
                        changes.insert(&ride)?;
                        active = Some(ride);
                    }
                },
                state => {
                    let to = PendingRideState::Confirmed.to_string();
                    return Err(TransitionError { from: state.to_string(), to }.into());
                },
            }
        }
        bump(&mut pending);
        changes.update(&pending)?;
        self.db.commit(changes).await?;
        debug!("🚗 {user_id} confirmed pending ride {id}. It is now {}", pending.state);
        if let Some(ride) = active {
            info!("🚗 Everyone confirmed. Active ride {} has started", ride.id);
            self.producers.publish_active_ride_changed(ActiveRideChangedEvent::new(ride)).await;
        }
        self.producers.publish_pending_ride_changed(PendingRideChangedEvent::new(pending.clone())).await;
        Ok(pending)
    }

    //-------------------------------------------     Expiry    ------------------------------------------------------

    /// Expires every request and pending ride whose deadline is at or before `now`. Returns how many records expired.
    pub async fn expire_due(&self, now: DateTime<Utc>) -> Result<usize, RideStateError> {
        let mut count = 0;
        for pending in self.db.fetch_due::<PendingRideStatus>(now).await? {
            if self.expire_pending_ride(&pending.id, now).await? {
                count += 1;
            }
        }
        for request in self.db.fetch_due::<RideRelatedRequestStatus>(now).await? {
            if self.expire_request(&request.id, now).await? {
                count += 1;
            }
        }
        if count > 0 {
            debug!("🚗 {count} requests and pending rides expired");
        }
        Ok(count)
    }

    /// Returns false if the request was no longer due once its lock was taken.
    async fn expire_request(&self, id: &RequestId, now: DateTime<Utc>) -> Result<bool, RideStateError> {
        let _locks = self.locks.lock_all([key::<RideRelatedRequestStatus>(id)]).await;
        let mut request = self.load::<RideRelatedRequestStatus>(id).await?;
        if !request.is_due(now) {
            return Ok(false);
        }
        request.is_expired = true;
        bump(&mut request);
        let mut changes = ChangeSet::new();
        changes.update(&request)?;
        self.db.commit(changes).await?;
        debug!("🚗 Request {id} expired");
        self.producers.publish_request_expired(RequestExpiredEvent::new(request)).await;
        Ok(true)
    }

    /// Cancels a pending ride that passed its deadline and expires every request in it.
    async fn expire_pending_ride(&self, id: &PendingRideId, now: DateTime<Utc>) -> Result<bool, RideStateError> {
        // Membership never changes, so the keys can be worked out before locking
        let pending = self.load::<PendingRideStatus>(id).await?;
        let keys = std::iter::once(key::<PendingRideStatus>(id))
            .chain(pending.ride_info.participants().map(|p| key::<RideRelatedRequestStatus>(&p.request_id)));
        let _locks = self.locks.lock_all(keys).await;
        let mut pending = self.load::<PendingRideStatus>(id).await?;
        if !pending.is_due(now) {
            return Ok(false);
        }
        pending.state = pending.state.validate_transition(PendingRideState::Canceled)?;
        bump(&mut pending);
        let mut changes = ChangeSet::new();
        changes.update(&pending)?;
        let mut expired = Vec::new();
        for member in pending.ride_info.participants() {
            let mut request = self.load::<RideRelatedRequestStatus>(&member.request_id).await?;
            if request.is_open() && request.pending_ride_id.as_ref() == Some(id) {
                request.is_expired = true;
                bump(&mut request);
                changes.update(&request)?;
                expired.push(request);
            }
        }
        self.db.commit(changes).await?;
        info!("🚗 Pending ride {id} expired, taking {} requests with it", expired.len());
        self.producers.publish_pending_ride_changed(PendingRideChangedEvent::new(pending)).await;
        for request in expired {
            self.producers.publish_request_expired(RequestExpiredEvent::new(request)).await;
        }
        Ok(true)
    }

    //-------------------------------------------  Active rides  -----------------------------------------------------

    pub async fn fetch_active_ride_status(&self, id: &ActiveRideId) -> Result<ActiveRideStatus, RideStateError> {
        self.load(id).await
    }

    pub async fn pick_up_rider(
        &self,
        driver_id: &UserId,
        id: &ActiveRideId,
        rider_id: &UserId,
    ) -> Result<ActiveRideStatus, RideStateError> {
        self.update_active_ride(driver_id, id, true, |ride| move_rider(ride, rider_id, RiderState::InRide)).await
    }

    pub async fn drop_off_rider(
        &self,
        driver_id: &UserId,
        id: &ActiveRideId,
        rider_id: &UserId,
    ) -> Result<ActiveRideStatus, RideStateError> {
        self.update_active_ride(driver_id, id, true, |ride| move_rider(ride, rider_id, RiderState::DroppedOff)).await
    }

    /// Ends a ride. Every rider must have been dropped off or have canceled.
    pub async fn finish_ride(&self, driver_id: &UserId, id: &ActiveRideId) -> Result<ActiveRideStatus, RideStateError> {
        self.update_active_ride(driver_id, id, true, |ride| {
            ensure_in_progress(ride)?;
            if !ride.all_riders_done() {
                return Err(RideStateError::RidersStillOnBoard(ride.id.clone()));
            }
            ride.ride_state = ride.ride_state.validate_transition(RideState::Finished)?;
            Ok(())
        })
        .await
    }

    pub async fn cancel_active_ride(
        &self,
        driver_id: &UserId,
        id: &ActiveRideId,
    ) -> Result<ActiveRideStatus, RideStateError> {
        self.update_active_ride(driver_id, id, true, cancel_whole_ride).await
    }

    /// Replaces the game elements of the driver or of one rider. The server never looks inside the payload.
    pub async fn update_game_elements(
        &self,
        user_id: &UserId,
        id: &ActiveRideId,
        elements: serde_json::Value,
    ) -> Result<ActiveRideStatus, RideStateError> {
        self.update_active_ride(user_id, id, false, |ride| {
            ensure_in_progress(ride)?;
            if ride.driver_id == *user_id {
                ride.driver_game_elements = elements;
            } else if ride.riders_state.contains_key(user_id) {
                ride.riders_game_elements.insert(user_id.clone(), elements);
            } else {
                return Err(RideStateError::NotParticipant(user_id.clone(), ride.id.to_string()));
            }
            Ok(())
        })
        .await
    }

    async fn update_active_ride<F>(
        &self,
        user_id: &UserId,
        id: &ActiveRideId,
        driver_only: bool,
        update: F,
    ) -> Result<ActiveRideStatus, RideStateError>
    where
        F: FnOnce(&mut ActiveRideStatus) -> Result<(), RideStateError>,
    {
        let _locks = self.locks.lock_all([key::<ActiveRideStatus>(id)]).await;
        let mut ride = self.load::<ActiveRideStatus>(id).await?;
        if driver_only && ride.driver_id != *user_id {
            return Err(RideStateError::NotDriver(user_id.clone(), id.clone()));
        }
        update(&mut ride)?;
        bump(&mut ride);
        let mut changes = ChangeSet::new();
        changes.update(&ride)?;
        self.db.commit(changes).await?;
        debug!("🚗 Active ride {id} updated by {user_id}. It is now {}", ride.ride_state);
        self.producers.publish_active_ride_changed(ActiveRideChangedEvent::new(ride.clone())).await;
        Ok(ride)
    }
}

fn ensure_in_progress(ride: &ActiveRideStatus) -> Result<(), RideStateError> {
    if ride.ride_state.is_terminal() {
        return Err(RideStateError::RideClosed(ride.id.clone()));
    }
    Ok(())
}

fn move_rider(ride: &mut ActiveRideStatus, rider_id: &UserId, next: RiderState) -> Result<(), RideStateError> {
    ensure_in_progress(ride)?;
    let ride_id = ride.id.to_string();
    let state =
        ride.riders_state.get_mut(rider_id).ok_or_else(|| RideStateError::NotParticipant(rider_id.clone(), ride_id))?;
    *state = state.validate_transition(next)?;
    Ok(())
}

/// Cancels the ride along with every rider who has not finished yet.
fn cancel_whole_ride(ride: &mut ActiveRideStatus) -> Result<(), RideStateError> {
    ride.ride_state = ride.ride_state.validate_transition(RideState::Canceled)?;
    for state in ride.riders_state.values_mut().filter(|s| !s.is_terminal()) {
        *state = RiderState::Canceled;
    }
    Ok(())
}
