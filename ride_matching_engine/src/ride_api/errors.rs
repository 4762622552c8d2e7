use directions_tools::DirectionsApiError;
use ride_common::{ActiveRideId, PendingRideId, RequestId, UserId};
use thiserror::Error;

use crate::{
    status_types::{StatusKind, TransitionError},
    store::StatusStoreError,
};

/// Reasons a ride operation was refused, or could not be carried out.
///
/// Apart from [`RideStateError::StoreError`], these are all domain failures: the operation does not make sense for the
/// records in their current state. A refused operation never leaves a partial change behind.
#[derive(Debug, Error)]
pub enum RideStateError {
    #[error("Status store error: {0}")]
    StoreError(StatusStoreError),
    #[error("{kind} {id} does not exist")]
    NotFound { kind: StatusKind, id: String },
    #[error("Request {0} does not belong to user {1}")]
    NotOwner(RequestId, UserId),
    #[error("User {0} is not part of ride {1}")]
    NotParticipant(UserId, String),
    #[error("Only the driver can do that on ride {1}, and {0} is not the driver")]
    NotDriver(UserId, ActiveRideId),
    #[error("Invalid transition. {0}")]
    InvalidTransition(#[from] TransitionError),
    #[error("Request {0} is already matched to {1}")]
    AlreadyMatched(RequestId, PendingRideId),
    #[error("Request {0} has expired or was canceled")]
    RequestClosed(RequestId),
    #[error("User {0} has already confirmed pending ride {1}")]
    AlreadyConfirmed(UserId, PendingRideId),
    #[error("The driver has not accepted pending ride {0} yet")]
    DriverNotConfirmed(PendingRideId),
    #[error("Ride {0} still has riders on board or waiting")]
    RidersStillOnBoard(ActiveRideId),
    #[error("Pending ride {0} has expired")]
    PendingRideExpired(PendingRideId),
    #[error("Ride {0} is already over")]
    RideClosed(ActiveRideId),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Invalid match: {0}")]
    InvalidMatch(String),
    #[error("{0} was modified concurrently. Try again")]
    ConcurrentModification(String),
}

impl RideStateError {
    pub fn not_found<S: ToString>(kind: StatusKind, id: &S) -> Self {
        Self::NotFound { kind, id: id.to_string() }
    }
}

impl From<StatusStoreError> for RideStateError {
    fn from(e: StatusStoreError) -> Self {
        match e {
            StatusStoreError::VersionConflict { kind, id, .. } => Self::ConcurrentModification(format!("{kind} {id}")),
            e => Self::StoreError(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("Could not compute a route: {0}")]
    DirectionsError(#[from] DirectionsApiError),
    #[error("Could not load or store ride statuses: {0}")]
    StateError(#[from] RideStateError),
}
