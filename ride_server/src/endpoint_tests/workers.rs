use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use ride_common::UserId;
use ride_matching_engine::{
    status_types::{PendingRideStatus, RequestDetails, RideRelatedRequestStatus},
    StatusStore,
};

use super::helpers::{new_api, santa_cruz, scotts_valley};
use crate::{context::ErrorLog, expiry_worker::start_expiry_worker, matching_worker::start_matching_worker};

async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn expiry_worker_expires_stale_requests() {
    let _ = env_logger::try_init();
    let api = new_api();
    let long_ago = Utc::now() - chrono::Duration::minutes(20);
    let details = RequestDetails::rider(santa_cruz(), scotts_valley());
    let stale = api.submit_request_at(&UserId::from("alice"), details, long_ago).await.unwrap();
    let fresh = api.submit_request(&UserId::from("bob"), details).await.unwrap();

    let errors = ErrorLog::default();
    let worker_api = api.clone();
    let worker = start_expiry_worker(Duration::from_millis(10), errors.clone(), move |now: DateTime<Utc>| {
        let api = worker_api.clone();
        async move { api.expire_due(now).await }
    });
    let mut expired = false;
    for _ in 0..200 {
        let request = api.db().fetch::<RideRelatedRequestStatus>(&stale.id).await.unwrap().unwrap();
        if request.is_expired {
            assert_eq!(request.version, 2);
            expired = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    worker.abort();
    assert!(expired, "The stale request was never expired");
    let fresh = api.db().fetch::<RideRelatedRequestStatus>(&fresh.id).await.unwrap().unwrap();
    assert!(!fresh.is_expired);
    assert!(errors.is_empty());
}

#[tokio::test]
async fn worker_failures_are_recorded_and_survived() {
    let _ = env_logger::try_init();
    let errors = ErrorLog::default();
    let rounds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&rounds);
    let worker = start_matching_worker(Duration::from_millis(10), errors.clone(), move || {
        let round = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if round == 0 {
                Err("OVER_QUERY_LIMIT".to_string())
            } else {
                Ok(Vec::<PendingRideStatus>::new())
            }
        }
    });
    let survived = wait_for(|| rounds.load(Ordering::SeqCst) >= 3).await;
    worker.abort();
    assert!(survived, "The worker stopped after a failed round");
    let entries = errors.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].source, "matching_worker");
    assert_eq!(entries[0].message, "OVER_QUERY_LIMIT");
}

#[tokio::test]
async fn expiry_failures_are_recorded() {
    let _ = env_logger::try_init();
    let errors = ErrorLog::default();
    let worker =
        start_expiry_worker(Duration::from_millis(10), errors.clone(), |_| async { Err::<usize, _>("database is locked") });
    let recorded = wait_for(|| errors.len() >= 2).await;
    worker.abort();
    assert!(recorded);
    assert!(errors.entries().iter().all(|e| e.source == "expiry_worker" && e.message == "database is locked"));
}
