use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use log::*;
use ride_common::{PendingRideId, RequestId, UserId};
use ride_matching_engine::status_types::PendingRideStatus;

use crate::{
    facades::{lock, Listeners},
    tracker::identity,
    ErrorHandler,
    ListenerHandle,
    PendingRideStatusGetter,
    RideService,
    StatusGetter,
    StatusListener,
    StatusTracker,
    TrackerError,
    TrackerOptions,
};

/// Called with every new version of the pending ride.
pub type StatusUpdateListener = Arc<dyn Fn(&PendingRideStatus) + Send + Sync>;

struct UpdateAdapter {
    caller: StatusUpdateListener,
}

impl StatusListener<PendingRideStatus> for UpdateAdapter {
    fn on_status(&self, status: &PendingRideStatus) -> Result<(), TrackerError> {
        (self.caller)(status);
        Ok(())
    }
}

/// A request that has been matched into a pending ride. Tracks the pending ride, and lets the user confirm or decline
/// it.
///
/// [`MatchedRideRelatedRequest::new`] does no I/O, so [`MatchedRideRelatedRequest::most_recent_status`] is empty until
/// the first snapshot arrives. Use [`MatchedRideRelatedRequest::connect`] to construct it with the current status
/// already in hand.
pub struct MatchedRideRelatedRequest<S: RideService> {
    service: S,
    user_id: UserId,
    request_id: RequestId,
    pending_ride_id: PendingRideId,
    options: TrackerOptions,
    tracker: StatusTracker<PendingRideStatusGetter<S>>,
    listeners: Listeners,
}

impl<S: RideService> MatchedRideRelatedRequest<S> {
    pub fn new(
        service: S,
        user_id: UserId,
        request_id: RequestId,
        pending_ride_id: PendingRideId,
        options: TrackerOptions,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Self {
        let getter = PendingRideStatusGetter::new(service.clone(), pending_ride_id.clone());
        let tracker = StatusTracker::new(getter, options, error_handler);
        Self { service, user_id, request_id, pending_ride_id, options, tracker, listeners: Mutex::new(HashMap::new()) }
    }

    /// Constructs the facade and waits for the first snapshot of the pending ride.
    pub async fn connect(
        service: S,
        user_id: UserId,
        request_id: RequestId,
        pending_ride_id: PendingRideId,
        options: TrackerOptions,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Result<Self, TrackerError> {
        let result = Self::new(service, user_id, request_id, pending_ride_id, options, error_handler);
        result.initialize().await?;
        Ok(result)
    }

    /// Fetches the pending ride once, outside the polling task, and caches the snapshot.
    pub async fn initialize(&self) -> Result<PendingRideStatus, TrackerError> {
        let timeout = self.options.fetch_timeout;
        let status = tokio::time::timeout(timeout, self.tracker.getter().fetch())
            .await
            .map_err(|_| TrackerError::Timeout(timeout))??;
        debug!("📡 Pending ride {} is {} (v{})", status.id, status.state, status.version);
        self.tracker.prime(status.clone());
        Ok(status)
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn pending_ride_id(&self) -> &PendingRideId {
        &self.pending_ride_id
    }

    /// The latest snapshot of the pending ride.
    ///
    /// The tracker only polls while a listener is registered, so after [`Self::connect`] this stays at the connected
    /// snapshot until [`Self::on_status_updated`] is called.
    pub fn most_recent_status(&self) -> Option<PendingRideStatus> {
        self.tracker.most_recent()
    }

    /// Registers `listener` for every new version of the pending ride. Registering the same listener again is a no-op.
    pub fn on_status_updated(&self, listener: &StatusUpdateListener) -> ListenerHandle {
        let key = identity(listener);
        let mut listeners = lock(&self.listeners);
        if let Some(handle) = listeners.get(&key) {
            return *handle;
        }
        let handle = self.tracker.start_tracking(Arc::new(UpdateAdapter { caller: Arc::clone(listener) }));
        listeners.insert(key, handle);
        handle
    }

    pub fn remove_listener(&self, listener: &StatusUpdateListener) -> bool {
        match lock(&self.listeners).remove(&identity(listener)) {
            Some(handle) => self.tracker.remove_listener(handle),
            None => false,
        }
    }

    /// Confirms the pending ride on behalf of the user. `Ok(false)` means the service refused.
    pub async fn confirm(&self) -> Result<bool, TrackerError> {
        self.service.post_confirm(&self.user_id, &self.pending_ride_id).await
    }

    /// Declines the pending ride by withdrawing the user's request.
    pub async fn decline(&self) -> Result<bool, TrackerError> {
        self.service.post_request_cancel(&self.user_id, &self.request_id).await
    }

    pub fn is_polling(&self) -> bool {
        self.tracker.is_polling()
    }

    /// Stops tracking the pending ride.
    pub fn shutdown(&self) {
        self.tracker.shutdown();
    }
}
