use actix_web::http::StatusCode;
use ride_common::UserId;
use ride_matching_engine::status_types::{RequestDetails, RideRelatedRequestStatus};
use serde_json::json;

use super::helpers::{get_request, new_api, post_empty, post_request, santa_cruz, scotts_valley};
use crate::{context::ErrorLog, data_objects::JsonResponse};

fn rider_body(user: &str) -> serde_json::Value {
    json!({
        "user_id": user,
        "role": "rider",
        "origin": santa_cruz(),
        "destination": scotts_valley(),
    })
}

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init();
    let (status, body) = get_request(&new_api(), &ErrorLog::default(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn submit_and_fetch_request() -> anyhow::Result<()> {
    let _ = env_logger::try_init();
    let api = new_api();
    let errors = ErrorLog::default();
    let (status, body) = post_request(&api, &errors, "/requests", &rider_body("alice")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let request: RideRelatedRequestStatus = serde_json::from_str(&body)?;
    assert_eq!(request.version, 1);
    assert_eq!(request.user_id, UserId::from("alice"));
    assert!(request.pending_ride_id.is_none());
    assert!(!request.is_expired);

    let path = format!("/requests/alice/{}", request.id);
    let (status, body) = get_request(&api, &errors, &path).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: RideRelatedRequestStatus = serde_json::from_str(&body)?;
    assert_eq!(fetched.id, request.id);
    assert_eq!(fetched.version, 1);
    Ok(())
}

#[actix_web::test]
async fn drivers_must_offer_seats() {
    let _ = env_logger::try_init();
    let body = json!({
        "user_id": "dave",
        "role": "driver",
        "seats": 0,
        "origin": santa_cruz(),
        "destination": scotts_valley(),
    });
    let (status, body) = post_request(&new_api(), &ErrorLog::default(), "/requests", &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("at least one seat"), "{body}");
}

#[actix_web::test]
async fn other_users_cannot_see_a_request() {
    let _ = env_logger::try_init();
    let api = new_api();
    let errors = ErrorLog::default();
    let request = api.submit_request(&UserId::from("alice"), RequestDetails::rider(santa_cruz(), scotts_valley())).await.unwrap();
    let (status, body) = get_request(&api, &errors, &format!("/requests/mallory/{}", request.id)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.starts_with("{\"error\":"), "{body}");
}

#[actix_web::test]
async fn unknown_request() {
    let _ = env_logger::try_init();
    let (status, _) = get_request(&new_api(), &ErrorLog::default(), "/requests/alice/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn cancel_is_acknowledged_once() {
    let _ = env_logger::try_init();
    let api = new_api();
    let errors = ErrorLog::default();
    let request = api.submit_request(&UserId::from("alice"), RequestDetails::rider(santa_cruz(), scotts_valley())).await.unwrap();
    let path = format!("/requests/alice/{}/cancel", request.id);
    let (status, body) = post_empty(&api, &errors, &path).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success, "{}", response.message);

    // A request can only be withdrawn once
    let (status, body) = post_empty(&api, &errors, &path).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(!response.success);

    let status = api.fetch_request_status(&UserId::from("alice"), &request.id).await.unwrap();
    assert!(status.is_canceled);
    assert_eq!(status.version, 2);
}

#[actix_web::test]
async fn error_log_is_exposed() {
    let _ = env_logger::try_init();
    let errors = ErrorLog::default();
    errors.record("matching_worker", "Directions provider said no");
    let (status, body) = get_request(&new_api(), &errors, "/errors").await;
    assert_eq!(status, StatusCode::OK);
    let entries: Vec<crate::context::ErrorEntry> = serde_json::from_str(&body).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].source, "matching_worker");
    assert_eq!(entries[0].message, "Directions provider said no");
}
