use actix_web::http::StatusCode;
use ride_common::{GeoPolyline, UserId};
use ride_matching_engine::status_types::{
    ActiveRideStatus,
    PendingRideState,
    PendingRideStatus,
    RequestDetails,
    RideState,
    RiderState,
};
use serde_json::json;

use super::helpers::{get_request, new_api, post_request, santa_cruz, scotts_valley, TestApi};
use crate::{
    context::ErrorLog,
    data_objects::{GameElements, JsonResponse, RiderAction, UserAction},
};

async fn pending_ride(api: &TestApi) -> PendingRideStatus {
    let driver = RequestDetails::driver(2, santa_cruz(), scotts_valley());
    let driver = api.submit_request(&UserId::from("dave"), driver).await.unwrap();
    let rider = RequestDetails::rider(santa_cruz(), scotts_valley());
    let rider = api.submit_request(&UserId::from("alice"), rider).await.unwrap();
    let waypoints = vec![santa_cruz(), scotts_valley()];
    let route = vec![
        GeoPolyline::new(vec![santa_cruz()]),
        GeoPolyline::new(vec![santa_cruz(), scotts_valley()]),
        GeoPolyline::new(vec![scotts_valley()]),
    ];
    api.match_requests(&driver.id, &[rider.id], waypoints, route).await.unwrap()
}

async fn confirm(api: &TestApi, errors: &ErrorLog, pending: &PendingRideStatus, user: &str) -> JsonResponse {
    let path = format!("/pending_rides/{}/confirm", pending.id);
    let (status, body) = post_request(api, errors, &path, &UserAction { user_id: UserId::from(user) }).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    serde_json::from_str(&body).unwrap()
}

async fn fetch_pending(api: &TestApi, errors: &ErrorLog, pending: &PendingRideStatus) -> PendingRideStatus {
    let (status, body) = get_request(api, errors, &format!("/pending_rides/{}", pending.id)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    serde_json::from_str(&body).unwrap()
}

#[actix_web::test]
async fn confirm_ride_through_to_active() {
    let _ = env_logger::try_init();
    let api = new_api();
    let errors = ErrorLog::default();
    let pending = pending_ride(&api).await;

    // Riders have to wait for the driver
    let response = confirm(&api, &errors, &pending, "alice").await;
    assert!(!response.success);
    assert_eq!(fetch_pending(&api, &errors, &pending).await.state, PendingRideState::WaitingOnDriver);

    assert!(confirm(&api, &errors, &pending, "dave").await.success);
    let status = fetch_pending(&api, &errors, &pending).await;
    assert_eq!(status.state, PendingRideState::WaitingOnRiders);
    assert_eq!(status.version, 2);

    assert!(confirm(&api, &errors, &pending, "alice").await.success);
    let status = fetch_pending(&api, &errors, &pending).await;
    assert_eq!(status.state, PendingRideState::Confirmed);
    let active_id = status.active_ride_id.expect("confirmed rides have an active ride");

    let (code, body) = get_request(&api, &errors, &format!("/active_rides/{active_id}")).await;
    assert_eq!(code, StatusCode::OK);
    let active: ActiveRideStatus = serde_json::from_str(&body).unwrap();
    assert_eq!(active.ride_state, RideState::InProgress);
    assert_eq!(active.riders_state.get(&UserId::from("alice")), Some(&RiderState::Waiting));
}

#[actix_web::test]
async fn strangers_cannot_confirm() {
    let _ = env_logger::try_init();
    let api = new_api();
    let errors = ErrorLog::default();
    let pending = pending_ride(&api).await;
    let response = confirm(&api, &errors, &pending, "mallory").await;
    assert!(!response.success);
    assert_eq!(fetch_pending(&api, &errors, &pending).await.version, 1);
}

#[actix_web::test]
async fn unknown_pending_ride() {
    let _ = env_logger::try_init();
    let (status, _) = get_request(&new_api(), &ErrorLog::default(), "/pending_rides/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn active_ride_lifecycle() {
    let _ = env_logger::try_init();
    let api = new_api();
    let errors = ErrorLog::default();
    let pending = pending_ride(&api).await;
    api.post_confirm(&UserId::from("dave"), &pending.id).await.unwrap();
    let confirmed = api.post_confirm(&UserId::from("alice"), &pending.id).await.unwrap();
    let active_id = confirmed.active_ride_id.unwrap();
    let dave = UserId::from("dave");
    let alice = UserId::from("alice");

    // Alice hasn't been dropped off yet
    let path = format!("/active_rides/{active_id}/finish");
    let (status, body) = post_request(&api, &errors, &path, &UserAction { user_id: dave.clone() }).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    // Only the driver picks riders up
    let path = format!("/active_rides/{active_id}/pickup");
    let action = RiderAction { driver_id: alice.clone(), rider_id: alice.clone() };
    let (status, _) = post_request(&api, &errors, &path, &action).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let action = RiderAction { driver_id: dave.clone(), rider_id: alice.clone() };
    let (status, body) = post_request(&api, &errors, &path, &action).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let ride: ActiveRideStatus = serde_json::from_str(&body).unwrap();
    assert_eq!(ride.riders_state.get(&alice), Some(&RiderState::InRide));

    let path = format!("/active_rides/{active_id}/game_elements");
    let elements = GameElements { user_id: alice.clone(), elements: json!({"score": 12}) };
    let (status, body) = post_request(&api, &errors, &path, &elements).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let ride: ActiveRideStatus = serde_json::from_str(&body).unwrap();
    assert_eq!(ride.riders_game_elements.get(&alice), Some(&json!({"score": 12})));

    let path = format!("/active_rides/{active_id}/dropoff");
    let (status, _) = post_request(&api, &errors, &path, &action).await;
    assert_eq!(status, StatusCode::OK);

    let path = format!("/active_rides/{active_id}/finish");
    let (status, body) = post_request(&api, &errors, &path, &UserAction { user_id: dave.clone() }).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let ride: ActiveRideStatus = serde_json::from_str(&body).unwrap();
    assert_eq!(ride.ride_state, RideState::Finished);

    // Nothing more can happen to a finished ride
    let path = format!("/active_rides/{active_id}/cancel");
    let (status, _) = post_request(&api, &errors, &path, &UserAction { user_id: dave }).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
