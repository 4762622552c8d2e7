//! Facade behaviour against a real ride engine, running in process on an in-memory store.
//!
//! The engine's clock and tokio's clock are separate: the engine sees whatever time the test sets on the service, and
//! tokio's clock is paused so polling happens on cue.
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration as StdDuration,
};

use chrono::{DateTime, Duration, Utc};
use ride_common::{ActiveRideId, GeoCoordinates, PendingRideId, RequestId, UserId};
use ride_matching_engine::{
    events::EventProducers,
    status_types::{ActiveRideStatus, PendingRideState, PendingRideStatus, RequestDetails, RideRelatedRequestStatus},
    MemoryStatusStore,
    RideMatchingApi,
    RideStateError,
    RideTimeouts,
};
use ride_tracker::{
    facades::{
        ExpiredListener,
        MatchedListener,
        MatchedRideRelatedRequest,
        PendingRideRelatedRequest,
        StatusUpdateListener,
    },
    ErrorHandler,
    RideService,
    TrackerError,
    TrackerOptions,
};

/// The ride service, served straight from an engine whose clock the test controls.
#[derive(Clone)]
struct EngineService {
    api: RideMatchingApi<MemoryStatusStore>,
    clock: Arc<Mutex<DateTime<Utc>>>,
}

impl EngineService {
    fn new(start: DateTime<Utc>) -> Self {
        let timeouts =
            RideTimeouts { request_timeout: Duration::minutes(15), pending_ride_timeout: Duration::minutes(5) };
        let api = RideMatchingApi::new(MemoryStatusStore::new(), EventProducers::default(), timeouts);
        Self { api, clock: Arc::new(Mutex::new(start)) }
    }

    fn now(&self) -> DateTime<Utc> {
        *self.clock.lock().unwrap()
    }

    fn set_time(&self, t: DateTime<Utc>) {
        *self.clock.lock().unwrap() = t;
    }
}

fn rejected(e: RideStateError) -> TrackerError {
    TrackerError::HttpStatus { status: 400, message: e.to_string() }
}

impl RideService for EngineService {
    async fn submit_request(
        &self,
        user_id: &UserId,
        details: RequestDetails,
    ) -> Result<RideRelatedRequestStatus, TrackerError> {
        self.api.submit_request_at(user_id, details, self.now()).await.map_err(rejected)
    }

    async fn fetch_request_status(
        &self,
        user_id: &UserId,
        request_id: &RequestId,
    ) -> Result<RideRelatedRequestStatus, TrackerError> {
        self.api.fetch_request_status_at(user_id, request_id, self.now()).await.map_err(rejected)
    }

    async fn fetch_pending_ride_status(&self, id: &PendingRideId) -> Result<PendingRideStatus, TrackerError> {
        self.api.fetch_pending_ride_status_at(id, self.now()).await.map_err(rejected)
    }

    async fn fetch_active_ride_status(&self, id: &ActiveRideId) -> Result<ActiveRideStatus, TrackerError> {
        self.api.fetch_active_ride_status(id).await.map_err(rejected)
    }

    async fn post_confirm(&self, user_id: &UserId, id: &PendingRideId) -> Result<bool, TrackerError> {
        Ok(self.api.post_confirm_at(user_id, id, self.now()).await.is_ok())
    }

    async fn post_request_cancel(&self, user_id: &UserId, request_id: &RequestId) -> Result<bool, TrackerError> {
        Ok(self.api.post_request_cancel(user_id, request_id).await.is_ok())
    }
}

#[derive(Default)]
struct CollectingHandler {
    errors: Mutex<Vec<TrackerError>>,
}

impl ErrorHandler for CollectingHandler {
    fn handle(&self, error: TrackerError) {
        self.errors.lock().unwrap().push(error);
    }
}

fn options() -> TrackerOptions {
    TrackerOptions {
        poll_interval: StdDuration::from_secs(1),
        fetch_timeout: StdDuration::from_millis(500),
        max_backoff: StdDuration::from_secs(10),
    }
}

fn user(name: &str) -> UserId {
    UserId::from(name)
}

fn rider_trip() -> RequestDetails {
    RequestDetails::rider(GeoCoordinates::new(36.97, -122.03), GeoCoordinates::new(37.05, -122.01))
}

fn driver_trip() -> RequestDetails {
    RequestDetails::driver(2, GeoCoordinates::new(36.97, -122.03), GeoCoordinates::new(37.05, -122.01))
}

async fn wait(ms: u64) {
    tokio::time::sleep(StdDuration::from_millis(ms)).await;
}

fn counting_listener() -> (Arc<AtomicUsize>, ExpiredListener) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    let listener: ExpiredListener = Arc::new(move |status: &RideRelatedRequestStatus| {
        assert!(status.is_expired);
        c.fetch_add(1, Ordering::SeqCst);
    });
    (count, listener)
}

/// Dave drives, Alice rides. Both submit at `t` and are matched at `t`.
async fn matched_pair(
    service: &EngineService,
    t: DateTime<Utc>,
) -> (RideRelatedRequestStatus, RideRelatedRequestStatus, PendingRideStatus) {
    let dave = service.submit_request(&user("dave"), driver_trip()).await.unwrap();
    let alice = service.submit_request(&user("alice"), rider_trip()).await.unwrap();
    let pending = service.api.match_requests_at(&dave.id, &[alice.id.clone()], vec![], vec![], t).await.unwrap();
    (dave, alice, pending)
}

#[tokio::test(start_paused = true)]
async fn an_expired_pending_ride_fires_matched_then_expired_once() {
    let _ = env_logger::try_init();
    let t = Utc::now();
    let service = EngineService::new(t);
    let handler = Arc::new(CollectingHandler::default());
    let dave = service.submit_request(&user("dave"), driver_trip()).await.unwrap();
    let alice = service.submit_request(&user("alice"), rider_trip()).await.unwrap();

    let facade = PendingRideRelatedRequest::new(
        service.clone(),
        user("alice"),
        alice.id.clone(),
        options(),
        handler.clone(),
    );
    let matches = Arc::new(Mutex::new(Vec::<MatchedRideRelatedRequest<EngineService>>::new()));
    let sink = Arc::clone(&matches);
    let on_matched: MatchedListener<EngineService> =
        Arc::new(move |m: MatchedRideRelatedRequest<EngineService>| sink.lock().unwrap().push(m));
    let (expired_a, on_expired_a) = counting_listener();
    let (expired_b, on_expired_b) = counting_listener();
    let (canceled, on_canceled) = counting_listener();
    facade.on_matched(&on_matched);
    let first = facade.on_expired(&on_expired_a);
    let second = facade.on_expired(&on_expired_a);
    assert_eq!(first, second);
    facade.on_expired(&on_expired_b);
    facade.on_canceled(&on_canceled);

    wait(500).await;
    assert!(facade.is_polling());
    assert!(matches.lock().unwrap().is_empty());
    assert_eq!(facade.most_recent_status().map(|s| s.version), Some(1));

    let pending = service.api.match_requests_at(&dave.id, &[alice.id.clone()], vec![], vec![], t).await.unwrap();
    wait(1000).await;
    {
        let matches = matches.lock().unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pending_ride_id(), &pending.id);
        assert_eq!(matches[0].request_id(), &alice.id);
        assert!(matches[0].most_recent_status().is_none());
    }
    assert_eq!(expired_a.load(Ordering::SeqCst), 0);

    // The pending ride times out after five minutes
    service.set_time(t + Duration::minutes(6));
    wait(1000).await;
    assert_eq!(expired_a.load(Ordering::SeqCst), 1);
    assert_eq!(expired_b.load(Ordering::SeqCst), 1);
    assert_eq!(canceled.load(Ordering::SeqCst), 1);
    let latest = facade.most_recent_status().unwrap();
    assert!(latest.is_expired);
    assert_eq!(latest.version, 3);

    wait(5000).await;
    assert!(!facade.is_polling());
    assert_eq!(expired_a.load(Ordering::SeqCst), 1);
    assert_eq!(matches.lock().unwrap().len(), 1);
    assert!(handler.errors.lock().unwrap().is_empty());

    let matched = matches.lock().unwrap().pop().unwrap();
    let status = matched.initialize().await.unwrap();
    assert_eq!(status.state, PendingRideState::Canceled);
    assert_eq!(matched.most_recent_status(), Some(status));
}

#[tokio::test(start_paused = true)]
async fn removed_listeners_are_not_called() {
    let t = Utc::now();
    let service = EngineService::new(t);
    let alice = service.submit_request(&user("alice"), rider_trip()).await.unwrap();
    let handler = Arc::new(CollectingHandler::default());
    let facade = PendingRideRelatedRequest::new(service.clone(), user("alice"), alice.id.clone(), options(), handler);
    let (kept, on_kept) = counting_listener();
    let (removed, on_removed) = counting_listener();
    facade.on_expired(&on_kept);
    facade.on_expired(&on_removed);
    wait(500).await;
    assert!(facade.remove_on_expired(&on_removed));
    assert!(!facade.remove_on_expired(&on_removed));
    assert!(!facade.remove_on_canceled(&on_kept));

    // Unmatched requests expire after fifteen minutes
    service.set_time(t + Duration::minutes(16));
    wait(1000).await;
    assert_eq!(kept.load(Ordering::SeqCst), 1);
    assert_eq!(removed.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_withdraws_the_request() {
    let t = Utc::now();
    let service = EngineService::new(t);
    let alice = service.submit_request(&user("alice"), rider_trip()).await.unwrap();
    let handler = Arc::new(CollectingHandler::default());
    let facade = PendingRideRelatedRequest::new(service.clone(), user("alice"), alice.id.clone(), options(), handler);
    let (expired, on_expired) = counting_listener();
    facade.on_expired(&on_expired);
    assert!(facade.cancel().await.unwrap());
    // A second cancel is refused
    assert!(!facade.cancel().await.unwrap());
    wait(1500).await;
    let latest = facade.most_recent_status().unwrap();
    assert!(latest.is_canceled);
    assert_eq!(expired.load(Ordering::SeqCst), 0);
    assert!(!facade.is_polling());
}

#[tokio::test(start_paused = true)]
async fn matched_requests_follow_the_pending_ride_to_confirmation() {
    let t = Utc::now();
    let service = EngineService::new(t);
    let handler: Arc<dyn ErrorHandler> = Arc::new(CollectingHandler::default());
    let (dave, alice, pending) = matched_pair(&service, t).await;

    let alice_ride = MatchedRideRelatedRequest::connect(
        service.clone(),
        user("alice"),
        alice.id.clone(),
        pending.id.clone(),
        options(),
        Arc::clone(&handler),
    )
    .await
    .unwrap();
    let first = alice_ride.most_recent_status().unwrap();
    assert_eq!(first.state, PendingRideState::WaitingOnDriver);
    assert_eq!(first.version, 1);

    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    let on_update: StatusUpdateListener = Arc::new(move |s: &PendingRideStatus| sink.lock().unwrap().push(s.state));
    let handle = alice_ride.on_status_updated(&on_update);
    assert_eq!(alice_ride.on_status_updated(&on_update), handle);
    wait(500).await;

    // Riders confirm after the driver
    assert!(!alice_ride.confirm().await.unwrap());
    let dave_ride =
        MatchedRideRelatedRequest::new(service.clone(), user("dave"), dave.id, pending.id.clone(), options(), handler);
    assert!(dave_ride.confirm().await.unwrap());
    wait(1000).await;
    assert!(alice_ride.confirm().await.unwrap());
    wait(1000).await;

    assert_eq!(*states.lock().unwrap(), vec![
        PendingRideState::WaitingOnDriver,
        PendingRideState::WaitingOnRiders,
        PendingRideState::Confirmed
    ]);
    let last = alice_ride.most_recent_status().unwrap();
    assert_eq!(last.version, 3);
    assert!(last.active_ride_id.is_some());
    assert!(!alice_ride.is_polling());
}

#[tokio::test(start_paused = true)]
async fn declining_cancels_the_pending_ride() {
    let t = Utc::now();
    let service = EngineService::new(t);
    let (_, alice, pending) = matched_pair(&service, t).await;
    let alice_ride = MatchedRideRelatedRequest::new(
        service.clone(),
        user("alice"),
        alice.id.clone(),
        pending.id.clone(),
        options(),
        Arc::new(CollectingHandler::default()),
    );
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    let on_update: StatusUpdateListener = Arc::new(move |s: &PendingRideStatus| sink.lock().unwrap().push(s.state));
    alice_ride.on_status_updated(&on_update);
    wait(500).await;
    assert!(alice_ride.decline().await.unwrap());
    wait(1000).await;
    assert_eq!(*states.lock().unwrap(), vec![PendingRideState::WaitingOnDriver, PendingRideState::Canceled]);
    // Nothing left to confirm
    assert!(!alice_ride.confirm().await.unwrap());
    assert!(alice_ride.remove_listener(&on_update));
}

fn recording_matched_listener() -> (Arc<Mutex<Vec<PendingRideId>>>, MatchedListener<EngineService>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let listener: MatchedListener<EngineService> = Arc::new(move |m: MatchedRideRelatedRequest<EngineService>| {
        sink.lock().unwrap().push(m.pending_ride_id().clone());
    });
    (seen, listener)
}

/// Dave drops out of Alice's pending ride, and Erin picks her up instead.
async fn rematch_with_erin(
    service: &EngineService,
    alice: &RideRelatedRequestStatus,
    dave: &RideRelatedRequestStatus,
    t: DateTime<Utc>,
) -> PendingRideStatus {
    assert!(service.post_request_cancel(&user("dave"), &dave.id).await.unwrap());
    let released = service.fetch_request_status(&user("alice"), &alice.id).await.unwrap();
    assert!(released.pending_ride_id.is_none());
    let erin = service.submit_request(&user("erin"), driver_trip()).await.unwrap();
    service.api.match_requests_at(&erin.id, &[alice.id.clone()], vec![], vec![], t).await.unwrap()
}

#[tokio::test(start_paused = true)]
async fn a_released_request_is_matched_again_after_a_poll_sees_it_unmatched() {
    let t = Utc::now();
    let service = EngineService::new(t);
    let dave = service.submit_request(&user("dave"), driver_trip()).await.unwrap();
    let alice = service.submit_request(&user("alice"), rider_trip()).await.unwrap();
    let handler = Arc::new(CollectingHandler::default());
    let facade =
        PendingRideRelatedRequest::new(service.clone(), user("alice"), alice.id.clone(), options(), handler.clone());
    let (seen, on_matched) = recording_matched_listener();
    facade.on_matched(&on_matched);
    wait(500).await;

    let first = service.api.match_requests_at(&dave.id, &[alice.id.clone()], vec![], vec![], t).await.unwrap();
    wait(1000).await;
    assert_eq!(*seen.lock().unwrap(), vec![first.id.clone()]);

    assert!(service.post_request_cancel(&user("dave"), &dave.id).await.unwrap());
    wait(1000).await;
    let latest = facade.most_recent_status().unwrap();
    assert!(latest.pending_ride_id.is_none());
    assert_eq!(latest.version, 3);
    assert_eq!(seen.lock().unwrap().len(), 1);

    let erin = service.submit_request(&user("erin"), driver_trip()).await.unwrap();
    let second = service.api.match_requests_at(&erin.id, &[alice.id.clone()], vec![], vec![], t).await.unwrap();
    wait(1000).await;
    assert_eq!(*seen.lock().unwrap(), vec![first.id.clone(), second.id.clone()]);

    // Nothing more while the match stands
    wait(3000).await;
    assert_eq!(seen.lock().unwrap().len(), 2);
    assert!(handler.errors.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn a_rematch_between_polls_is_still_reported() {
    let t = Utc::now();
    let service = EngineService::new(t);
    let dave = service.submit_request(&user("dave"), driver_trip()).await.unwrap();
    let alice = service.submit_request(&user("alice"), rider_trip()).await.unwrap();
    let handler = Arc::new(CollectingHandler::default());
    let facade =
        PendingRideRelatedRequest::new(service.clone(), user("alice"), alice.id.clone(), options(), handler.clone());
    let (seen, on_matched) = recording_matched_listener();
    facade.on_matched(&on_matched);
    wait(500).await;

    let first = service.api.match_requests_at(&dave.id, &[alice.id.clone()], vec![], vec![], t).await.unwrap();
    wait(1000).await;
    assert_eq!(*seen.lock().unwrap(), vec![first.id.clone()]);

    // Released and matched again before the next poll
    let second = rematch_with_erin(&service, &alice, &dave, t).await;
    assert_ne!(first.id, second.id);
    wait(1000).await;
    let latest = facade.most_recent_status().unwrap();
    assert_eq!(latest.pending_ride_id.as_ref(), Some(&second.id));
    assert_eq!(latest.version, 4);
    assert_eq!(*seen.lock().unwrap(), vec![first.id.clone(), second.id.clone()]);

    wait(3000).await;
    assert_eq!(seen.lock().unwrap().len(), 2);
    assert!(handler.errors.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn a_connected_ride_refreshes_only_while_someone_listens() {
    let t = Utc::now();
    let service = EngineService::new(t);
    let (dave, alice, pending) = matched_pair(&service, t).await;
    let alice_ride = MatchedRideRelatedRequest::connect(
        service.clone(),
        user("alice"),
        alice.id.clone(),
        pending.id.clone(),
        options(),
        Arc::new(CollectingHandler::default()),
    )
    .await
    .unwrap();
    assert!(!alice_ride.is_polling());

    let dave_ride = MatchedRideRelatedRequest::new(
        service.clone(),
        user("dave"),
        dave.id,
        pending.id.clone(),
        options(),
        Arc::new(CollectingHandler::default()),
    );
    assert!(dave_ride.confirm().await.unwrap());
    wait(3000).await;
    assert_eq!(alice_ride.most_recent_status().map(|s| s.version), Some(1));

    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    let on_update: StatusUpdateListener = Arc::new(move |s: &PendingRideStatus| sink.lock().unwrap().push(s.state));
    alice_ride.on_status_updated(&on_update);
    wait(500).await;
    assert!(alice_ride.is_polling());
    let latest = alice_ride.most_recent_status().unwrap();
    assert_eq!(latest.version, 2);
    assert_eq!(latest.state, PendingRideState::WaitingOnRiders);
    assert_eq!(*states.lock().unwrap(), vec![PendingRideState::WaitingOnRiders]);
}
