//! The versioned status records that describe a ride from the first request through to the end of the ride.
//!
//! There are three kinds of record:
//! * [`RideRelatedRequestStatus`] - a rider looking for a ride, or a driver offering seats.
//! * [`PendingRideStatus`] - a proposed ride that is collecting confirmations from its driver and riders.
//! * [`ActiveRideStatus`] - a confirmed ride that is in progress, or has concluded.
//!
//! Every record carries a `version` that starts at 1 and grows by exactly one with every change. Clients use the
//! version to tell whether a freshly fetched snapshot carries anything new.
//!
//! The state enums each encode their own transition graph. See [`StateMachine`].
use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use ride_common::{helpers::duration_secs, ActiveRideId, GeoCoordinates, GeoPolyline, PendingRideId, RequestId, UserId};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

pub type Version = i64;

/// The version every new record starts at.
pub const INITIAL_VERSION: Version = 1;

//--------------------------------------     Status traits     ---------------------------------------------------------
/// A versioned snapshot of some entity.
pub trait Status: Clone + std::fmt::Debug + Send + Sync + 'static {
    type Id: Clone + std::fmt::Debug + Display + PartialEq + Send + Sync + 'static;

    fn id(&self) -> &Self::Id;

    fn version(&self) -> Version;

    /// True once the entity has reached a state from which no further legitimate change is possible.
    fn is_terminal(&self) -> bool;
}

/// A status that can be persisted in a status store.
pub trait StatusRecord: Status + Serialize + DeserializeOwned {
    const KIND: StatusKind;

    fn set_version(&mut self, version: Version);

    /// When the record should be expired, if it is still open by then.
    fn expires_at(&self) -> Option<DateTime<Utc>>;

    fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    fn key(&self) -> String {
        self.id().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Request,
    PendingRide,
    ActiveRide,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Request => "request",
            StatusKind::PendingRide => "pending_ride",
            StatusKind::ActiveRide => "active_ride",
        }
    }
}

impl Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//--------------------------------------     StateMachine      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot move from {from} to {to}")]
pub struct TransitionError {
    pub from: String,
    pub to: String,
}

/// A state enum with an explicit graph of allowed transitions.
pub trait StateMachine: Copy + Display + PartialEq {
    fn can_transition_to(&self, next: Self) -> bool;

    fn is_terminal(&self) -> bool;

    /// Returns `next` if the move from `self` is allowed.
    fn validate_transition(self, next: Self) -> Result<Self, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError { from: self.to_string(), to: next.to_string() })
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid state: {0}")]
pub struct StateParseError(String);

/// Implements `Display` and `FromStr` for a fieldless state enum using the variant names.
macro_rules! state_names {
    ($name:ident { $($variant:ident),+ $(,)? }) => {
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $($name::$variant => f.write_str(stringify!($variant)),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = StateParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok($name::$variant),)+
                    s => Err(StateParseError(s.to_string())),
                }
            }
        }
    };
}

//--------------------------------------   PendingRideState    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingRideState {
    /// The ride has been proposed and the driver has not accepted it yet.
    WaitingOnDriver,
    /// The driver accepted. Waiting for every rider to confirm.
    WaitingOnRiders,
    /// Everyone confirmed and an active ride was created.
    Confirmed,
    Canceled,
}

state_names!(PendingRideState { WaitingOnDriver, WaitingOnRiders, Confirmed, Canceled });

impl StateMachine for PendingRideState {
    fn can_transition_to(&self, next: Self) -> bool {
        use PendingRideState::*;
        matches!(
            (self, next),
            (WaitingOnDriver, WaitingOnRiders) |
                (WaitingOnRiders, Confirmed) |
                (WaitingOnDriver, Canceled) |
                (WaitingOnRiders, Canceled)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, PendingRideState::Confirmed | PendingRideState::Canceled)
    }
}

//--------------------------------------       RideState       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RideState {
    InProgress,
    Finished,
    Canceled,
}

state_names!(RideState { InProgress, Finished, Canceled });

impl StateMachine for RideState {
    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (RideState::InProgress, RideState::Finished) | (RideState::InProgress, RideState::Canceled)
        )
    }

    fn is_terminal(&self) -> bool {
        !matches!(self, RideState::InProgress)
    }
}

//--------------------------------------       RiderState      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiderState {
    /// Waiting to be picked up.
    Waiting,
    InRide,
    DroppedOff,
    Canceled,
}

state_names!(RiderState { Waiting, InRide, DroppedOff, Canceled });

impl StateMachine for RiderState {
    fn can_transition_to(&self, next: Self) -> bool {
        use RiderState::*;
        matches!((self, next), (Waiting, InRide) | (InRide, DroppedOff) | (Waiting, Canceled) | (InRide, Canceled))
    }

    fn is_terminal(&self) -> bool {
        matches!(self, RiderState::DroppedOff | RiderState::Canceled)
    }
}

//--------------------------------------    RequestDetails     ---------------------------------------------------------
/// What the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum RideRole {
    /// A driver offering `seats` places in their car.
    Driver { seats: u32 },
    Rider,
}

impl RideRole {
    pub fn is_driver(&self) -> bool {
        matches!(self, RideRole::Driver { .. })
    }
}

impl Display for RideRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RideRole::Driver { seats } => write!(f, "driver ({seats} seats)"),
            RideRole::Rider => write!(f, "rider"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequestDetails {
    #[serde(flatten)]
    pub role: RideRole,
    pub origin: GeoCoordinates,
    pub destination: GeoCoordinates,
}

impl RequestDetails {
    pub fn driver(seats: u32, origin: GeoCoordinates, destination: GeoCoordinates) -> Self {
        Self { role: RideRole::Driver { seats }, origin, destination }
    }

    pub fn rider(origin: GeoCoordinates, destination: GeoCoordinates) -> Self {
        Self { role: RideRole::Rider, origin, destination }
    }
}

//--------------------------------------  RideRelatedRequest   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRelatedRequestStatus {
    pub id: RequestId,
    pub version: Version,
    pub user_id: UserId,
    pub details: RequestDetails,
    /// Set while the request is part of a pending (or confirmed) ride. Cleared if that ride is canceled by another
    /// member, which puts the request back in the matching pool.
    pub pending_ride_id: Option<PendingRideId>,
    pub is_expired: bool,
    pub is_canceled: bool,
    pub post_time: DateTime<Utc>,
    #[serde(with = "duration_secs")]
    pub time_till_expire: Duration,
}

impl RideRelatedRequestStatus {
    pub fn new(user_id: UserId, details: RequestDetails, post_time: DateTime<Utc>, time_till_expire: Duration) -> Self {
        Self {
            id: RequestId::random(),
            version: INITIAL_VERSION,
            user_id,
            details,
            pending_ride_id: None,
            is_expired: false,
            is_canceled: false,
            post_time,
            time_till_expire,
        }
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.post_time + self.time_till_expire
    }

    pub fn is_matched(&self) -> bool {
        self.pending_ride_id.is_some()
    }

    /// An open request can still be matched, confirmed or canceled.
    pub fn is_open(&self) -> bool {
        !self.is_expired && !self.is_canceled
    }

    /// True when an open, unmatched request has outlived its deadline. Matched requests expire along with their
    /// pending ride instead.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && !self.is_matched() && now >= self.deadline()
    }
}

impl Status for RideRelatedRequestStatus {
    type Id = RequestId;

    fn id(&self) -> &RequestId {
        &self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn is_terminal(&self) -> bool {
        !self.is_open()
    }
}

impl StatusRecord for RideRelatedRequestStatus {
    const KIND: StatusKind = StatusKind::Request;

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        (self.is_open() && !self.is_matched()).then(|| self.deadline())
    }
}

//--------------------------------------       RideInfo        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideParticipant {
    pub user_id: UserId,
    pub request_id: RequestId,
}

impl RideParticipant {
    pub fn new(user_id: UserId, request_id: RequestId) -> Self {
        Self { user_id, request_id }
    }
}

/// Who is sharing the ride, and how the driver gets everyone where they are going.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideInfo {
    pub driver: RideParticipant,
    pub riders: Vec<RideParticipant>,
    pub origin: GeoCoordinates,
    pub destination: GeoCoordinates,
    /// The stops between origin and destination, in visiting order.
    pub waypoints: Vec<GeoCoordinates>,
    /// One polyline per leg: origin to the first waypoint, between consecutive waypoints, and the last waypoint to
    /// the destination.
    #[serde(default)]
    pub route: Vec<GeoPolyline>,
}

impl RideInfo {
    pub fn participants(&self) -> impl Iterator<Item = &RideParticipant> {
        std::iter::once(&self.driver).chain(self.riders.iter())
    }

    pub fn is_rider(&self, user_id: &UserId) -> bool {
        self.riders.iter().any(|r| &r.user_id == user_id)
    }

    pub fn is_participant(&self, user_id: &UserId) -> bool {
        self.driver.user_id == *user_id || self.is_rider(user_id)
    }
}

//--------------------------------------   PendingRideStatus   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRideStatus {
    pub id: PendingRideId,
    pub version: Version,
    pub state: PendingRideState,
    pub ride_info: RideInfo,
    pub post_time: DateTime<Utc>,
    #[serde(with = "duration_secs")]
    pub time_till_expire: Duration,
    pub active_ride_id: Option<ActiveRideId>,
    /// Riders that have confirmed while the ride was waiting on riders.
    #[serde(default)]
    pub confirmed_riders: Vec<UserId>,
}

impl PendingRideStatus {
    pub fn new(ride_info: RideInfo, post_time: DateTime<Utc>, time_till_expire: Duration) -> Self {
        Self {
            id: PendingRideId::random(),
            version: INITIAL_VERSION,
            state: PendingRideState::WaitingOnDriver,
            ride_info,
            post_time,
            time_till_expire,
            active_ride_id: None,
            confirmed_riders: Vec::new(),
        }
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.post_time + self.time_till_expire
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.state.is_terminal() && now >= self.deadline()
    }

    pub fn all_riders_confirmed(&self) -> bool {
        self.ride_info.riders.iter().all(|r| self.confirmed_riders.contains(&r.user_id))
    }
}

impl Status for PendingRideStatus {
    type Id = PendingRideId;

    fn id(&self) -> &PendingRideId {
        &self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

impl StatusRecord for PendingRideStatus {
    const KIND: StatusKind = StatusKind::PendingRide;

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        (!self.state.is_terminal()).then(|| self.deadline())
    }
}

//--------------------------------------   ActiveRideStatus    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveRideStatus {
    pub id: ActiveRideId,
    pub version: Version,
    pub pending_ride_id: PendingRideId,
    pub driver_id: UserId,
    pub ride_state: RideState,
    pub riders_state: BTreeMap<UserId, RiderState>,
    /// Opaque client payloads. The server stores them but never looks inside.
    #[serde(default)]
    pub riders_game_elements: BTreeMap<UserId, serde_json::Value>,
    #[serde(default)]
    pub driver_game_elements: serde_json::Value,
}

impl ActiveRideStatus {
    /// Starts a ride for a confirmed pending ride. Every rider starts off waiting to be picked up.
    pub fn new(pending: &PendingRideStatus) -> Self {
        let riders_state = pending.ride_info.riders.iter().map(|r| (r.user_id.clone(), RiderState::Waiting)).collect();
        Self {
            id: ActiveRideId::random(),
            version: INITIAL_VERSION,
            pending_ride_id: pending.id.clone(),
            driver_id: pending.ride_info.driver.user_id.clone(),
            ride_state: RideState::InProgress,
            riders_state,
            riders_game_elements: BTreeMap::new(),
            driver_game_elements: serde_json::Value::Null,
        }
    }

    pub fn all_riders_done(&self) -> bool {
        self.riders_state.values().all(|s| s.is_terminal())
    }
}

impl Status for ActiveRideStatus {
    type Id = ActiveRideId;

    fn id(&self) -> &ActiveRideId {
        &self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn is_terminal(&self) -> bool {
        self.ride_state.is_terminal()
    }
}

impl StatusRecord for ActiveRideStatus {
    const KIND: StatusKind = StatusKind::ActiveRide;

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}
