use crate::status_types::{ActiveRideStatus, PendingRideStatus, RideRelatedRequestStatus};

/// A request was put into a pending ride. Published once per member request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestMatchedEvent {
    pub request: RideRelatedRequestStatus,
    pub pending_ride: PendingRideStatus,
}

/// A request passed its deadline, either on its own or along with its pending ride.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestExpiredEvent {
    pub request: RideRelatedRequestStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingRideChangedEvent {
    pub pending_ride: PendingRideStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRideChangedEvent {
    pub active_ride: ActiveRideStatus,
}

impl RequestMatchedEvent {
    pub fn new(request: RideRelatedRequestStatus, pending_ride: PendingRideStatus) -> Self {
        Self { request, pending_ride }
    }
}

impl RequestExpiredEvent {
    pub fn new(request: RideRelatedRequestStatus) -> Self {
        Self { request }
    }
}

impl PendingRideChangedEvent {
    pub fn new(pending_ride: PendingRideStatus) -> Self {
        Self { pending_ride }
    }
}

impl ActiveRideChangedEvent {
    pub fn new(active_ride: ActiveRideStatus) -> Self {
        Self { active_ride }
    }
}
