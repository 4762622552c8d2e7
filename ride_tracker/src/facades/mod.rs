//! Facades that put a user-facing API on top of status trackers.
//!
//! * [`PendingRideRelatedRequest`] follows a request until it is matched or expires.
//! * [`MatchedRideRelatedRequest`] follows the pending ride a request was matched into, and lets the user confirm or
//!   decline it.
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use crate::ListenerHandle;

mod matched_request;
mod pending_request;

pub use matched_request::{MatchedRideRelatedRequest, StatusUpdateListener};
pub use pending_request::{ExpiredListener, MatchedListener, PendingRideRelatedRequest};

/// Caller listeners, keyed by identity, mapped to the handle of the adapter registered for them.
pub(crate) type Listeners = Mutex<HashMap<usize, ListenerHandle>>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
