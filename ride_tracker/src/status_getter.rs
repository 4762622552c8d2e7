use std::future::Future;

use ride_common::{ActiveRideId, PendingRideId, RequestId, UserId};
use ride_matching_engine::status_types::{ActiveRideStatus, PendingRideStatus, RideRelatedRequestStatus, Status};

use crate::{RideService, TrackerError};

/// Pulls the current snapshot of one entity. Fetching has no side effects on the client and may be repeated freely.
pub trait StatusGetter: Send + Sync + 'static {
    type Status: Status;

    fn fetch(&self) -> impl Future<Output = Result<Self::Status, TrackerError>> + Send;

    /// A short description of what is being fetched, for log messages.
    fn describe(&self) -> String;
}

/// Fetches a ride request, on behalf of the user who owns it.
#[derive(Clone)]
pub struct RequestStatusGetter<S> {
    service: S,
    user_id: UserId,
    request_id: RequestId,
}

impl<S: RideService> RequestStatusGetter<S> {
    pub fn new(service: S, user_id: UserId, request_id: RequestId) -> Self {
        Self { service, user_id, request_id }
    }
}

impl<S: RideService> StatusGetter for RequestStatusGetter<S> {
    type Status = RideRelatedRequestStatus;

    fn fetch(&self) -> impl Future<Output = Result<RideRelatedRequestStatus, TrackerError>> + Send {
        self.service.fetch_request_status(&self.user_id, &self.request_id)
    }

    fn describe(&self) -> String {
        format!("request {}", self.request_id)
    }
}

#[derive(Clone)]
pub struct PendingRideStatusGetter<S> {
    service: S,
    id: PendingRideId,
}

impl<S: RideService> PendingRideStatusGetter<S> {
    pub fn new(service: S, id: PendingRideId) -> Self {
        Self { service, id }
    }
}

impl<S: RideService> StatusGetter for PendingRideStatusGetter<S> {
    type Status = PendingRideStatus;

    fn fetch(&self) -> impl Future<Output = Result<PendingRideStatus, TrackerError>> + Send {
        self.service.fetch_pending_ride_status(&self.id)
    }

    fn describe(&self) -> String {
        format!("pending ride {}", self.id)
    }
}

#[derive(Clone)]
pub struct ActiveRideStatusGetter<S> {
    service: S,
    id: ActiveRideId,
}

impl<S: RideService> ActiveRideStatusGetter<S> {
    pub fn new(service: S, id: ActiveRideId) -> Self {
        Self { service, id }
    }
}

impl<S: RideService> StatusGetter for ActiveRideStatusGetter<S> {
    type Status = ActiveRideStatus;

    fn fetch(&self) -> impl Future<Output = Result<ActiveRideStatus, TrackerError>> + Send {
        self.service.fetch_active_ride_status(&self.id)
    }

    fn describe(&self) -> String {
        format!("active ride {}", self.id)
    }
}
