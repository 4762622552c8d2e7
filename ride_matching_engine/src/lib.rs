//! Ride Matching Engine
//!
//! The engine is the single authority over ride status records. It is made up of:
//! 1. The status model ([`mod@status_types`]): versioned request, pending-ride and active-ride records, and the
//!    transition graph of each state enum.
//! 2. The status store ([`mod@store`]): a read/write contract for versioned records, with SQLite and in-memory
//!    backends. Every write is an atomic, version-checked [`ChangeSet`].
//! 3. The ride API ([`RideMatchingApi`]): the state machine that moves records through their lifecycles, and the
//!    first-come-first-served [`RideMatcher`] that proposes rides.
//!
//! Every committed change is announced through the hooks in [`mod@events`].
pub mod events;
mod lock_registry;
mod ride_api;
pub mod status_types;
pub mod store;

#[cfg(all(feature = "sqlite", any(feature = "test_utils", test)))]
pub mod test_utils;

pub use lock_registry::{LockKey, LockRegistry, LockSet};
pub use ride_api::{
    errors::{MatcherError, RideStateError},
    matcher::{RideMatcher, DEFAULT_MAX_PICKUP_DISTANCE_KM},
    matching_api::{RideMatchingApi, RideTimeouts},
};
#[cfg(feature = "sqlite")]
pub use store::sqlite::SqliteStatusStore;
pub use store::{ChangeSet, MemoryStatusStore, StatusStore, StatusStoreError};
