use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
        Mutex,
    },
};

use log::*;
use ride_common::{PendingRideId, RequestId, UserId};
use ride_matching_engine::status_types::RideRelatedRequestStatus;

use crate::{
    facades::{lock, MatchedRideRelatedRequest},
    tracker::identity,
    ErrorHandler,
    ListenerHandle,
    RequestStatusGetter,
    RideService,
    StatusListener,
    StatusTracker,
    TrackerError,
    TrackerOptions,
};

/// Called with a new [`MatchedRideRelatedRequest`] each time the request is matched into a pending ride. The facade it
/// receives has not fetched anything yet; call [`MatchedRideRelatedRequest::initialize`] (from a task) to load it.
pub type MatchedListener<S> = Arc<dyn Fn(MatchedRideRelatedRequest<S>) + Send + Sync>;

/// Called once when the request expires.
pub type ExpiredListener = Arc<dyn Fn(&RideRelatedRequestStatus) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EventKind {
    Matched,
    Expired,
    Canceled,
}

/// Fires whenever a snapshot carries a pending ride id other than the last one seen.
///
/// A request released and matched again between two polls shows up as one pending ride id replacing another, and
/// fires for the new ride.
struct MatchedAdapter<S: RideService> {
    caller: MatchedListener<S>,
    service: S,
    user_id: UserId,
    request_id: RequestId,
    options: TrackerOptions,
    error_handler: Arc<dyn ErrorHandler>,
    previous: Mutex<Option<PendingRideId>>,
}

impl<S: RideService> StatusListener<RideRelatedRequestStatus> for MatchedAdapter<S> {
    fn on_status(&self, status: &RideRelatedRequestStatus) -> Result<(), TrackerError> {
        let newly_matched = {
            let mut previous = lock(&self.previous);
            let changed = status.pending_ride_id.is_some() && *previous != status.pending_ride_id;
            previous.clone_from(&status.pending_ride_id);
            if changed {
                status.pending_ride_id.clone()
            } else {
                None
            }
        };
        if let Some(pending_ride_id) = newly_matched {
            debug!("📡 Request {} was matched into pending ride {pending_ride_id}", self.request_id);
            let matched = MatchedRideRelatedRequest::new(
                self.service.clone(),
                self.user_id.clone(),
                self.request_id.clone(),
                pending_ride_id,
                self.options,
                Arc::clone(&self.error_handler),
            );
            (self.caller)(matched);
        }
        Ok(())
    }
}

/// Fires once, on the first snapshot that shows the request as expired.
struct ExpiredAdapter {
    caller: ExpiredListener,
    fired: AtomicBool,
}

impl StatusListener<RideRelatedRequestStatus> for ExpiredAdapter {
    fn on_status(&self, status: &RideRelatedRequestStatus) -> Result<(), TrackerError> {
        if status.is_expired && !self.fired.swap(true, Ordering::SeqCst) {
            (self.caller)(status);
        }
        Ok(())
    }
}

/// A ride request that is waiting to be matched.
///
/// The facade tracks the request's status and turns its changes into three events:
/// * `matched`, each time the request is put into a pending ride,
/// * `expired`, when the request times out,
/// * `canceled`, which currently fires on exactly the same condition as `expired`.
///
/// Each caller listener is wrapped in an adapter keyed by the listener's identity, so adding the same listener twice
/// registers it once, and removing it removes exactly what was added.
pub struct PendingRideRelatedRequest<S: RideService> {
    service: S,
    user_id: UserId,
    request_id: RequestId,
    options: TrackerOptions,
    error_handler: Arc<dyn ErrorHandler>,
    tracker: StatusTracker<RequestStatusGetter<S>>,
    adapters: Mutex<HashMap<(EventKind, usize), ListenerHandle>>,
}

impl<S: RideService> PendingRideRelatedRequest<S> {
    pub fn new(
        service: S,
        user_id: UserId,
        request_id: RequestId,
        options: TrackerOptions,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Self {
        let getter = RequestStatusGetter::new(service.clone(), user_id.clone(), request_id.clone());
        let tracker = StatusTracker::new(getter, options, Arc::clone(&error_handler));
        Self { service, user_id, request_id, options, error_handler, tracker, adapters: Mutex::new(HashMap::new()) }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn most_recent_status(&self) -> Option<RideRelatedRequestStatus> {
        self.tracker.most_recent()
    }

    fn add_adapter<F>(&self, kind: EventKind, key: usize, adapter: F) -> ListenerHandle
    where F: FnOnce() -> Arc<dyn StatusListener<RideRelatedRequestStatus>> {
        let mut adapters = lock(&self.adapters);
        if let Some(handle) = adapters.get(&(kind, key)) {
            return *handle;
        }
        let handle = self.tracker.start_tracking(adapter());
        adapters.insert((kind, key), handle);
        handle
    }

    fn remove_adapter(&self, kind: EventKind, key: usize) -> bool {
        match lock(&self.adapters).remove(&(kind, key)) {
            Some(handle) => self.tracker.remove_listener(handle),
            None => false,
        }
    }

    pub fn on_matched(&self, listener: &MatchedListener<S>) -> ListenerHandle {
        self.add_adapter(EventKind::Matched, identity(listener), || {
            Arc::new(MatchedAdapter {
                caller: Arc::clone(listener),
                service: self.service.clone(),
                user_id: self.user_id.clone(),
                request_id: self.request_id.clone(),
                options: self.options,
                error_handler: Arc::clone(&self.error_handler),
                previous: Mutex::new(None),
            })
        })
    }

    pub fn remove_on_matched(&self, listener: &MatchedListener<S>) -> bool {
        self.remove_adapter(EventKind::Matched, identity(listener))
    }

    pub fn on_expired(&self, listener: &ExpiredListener) -> ListenerHandle {
        self.add_adapter(EventKind::Expired, identity(listener), || {
            Arc::new(ExpiredAdapter { caller: Arc::clone(listener), fired: AtomicBool::new(false) })
        })
    }

    pub fn remove_on_expired(&self, listener: &ExpiredListener) -> bool {
        self.remove_adapter(EventKind::Expired, identity(listener))
    }

    /// Fires exactly when [`Self::on_expired`] does. A request withdrawn through [`Self::cancel`] does not trigger it.
    pub fn on_canceled(&self, listener: &ExpiredListener) -> ListenerHandle {
        self.add_adapter(EventKind::Canceled, identity(listener), || {
            Arc::new(ExpiredAdapter { caller: Arc::clone(listener), fired: AtomicBool::new(false) })
        })
    }

    pub fn remove_on_canceled(&self, listener: &ExpiredListener) -> bool {
        self.remove_adapter(EventKind::Canceled, identity(listener))
    }

    /// Withdraws the request. `Ok(false)` means the service refused.
    pub async fn cancel(&self) -> Result<bool, TrackerError> {
        self.service.post_request_cancel(&self.user_id, &self.request_id).await
    }

    pub fn is_polling(&self) -> bool {
        self.tracker.is_polling()
    }

    /// Stops tracking the request.
    pub fn shutdown(&self) {
        self.tracker.shutdown();
    }
}
