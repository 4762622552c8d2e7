use actix_web::{http::StatusCode, test, web, web::ServiceConfig, App};
use chrono::Duration;
use log::debug;
use ride_common::GeoCoordinates;
use ride_matching_engine::{events::EventProducers, MemoryStatusStore, RideMatchingApi, RideTimeouts};
use serde::Serialize;

use crate::{
    context::ErrorLog,
    routes::{
        error_log,
        health,
        ActiveRideStatusRoute,
        CancelActiveRideRoute,
        CancelRequestRoute,
        ConfirmPendingRideRoute,
        DropOffRiderRoute,
        FinishRideRoute,
        PendingRideStatusRoute,
        PickUpRiderRoute,
        RequestStatusRoute,
        SubmitRequestRoute,
        UpdateGameElementsRoute,
    },
};

pub type TestApi = RideMatchingApi<MemoryStatusStore>;

pub fn new_api() -> TestApi {
    let timeouts = RideTimeouts { request_timeout: Duration::minutes(15), pending_ride_timeout: Duration::minutes(5) };
    RideMatchingApi::new(MemoryStatusStore::new(), EventProducers::default(), timeouts)
}

pub fn santa_cruz() -> GeoCoordinates {
    GeoCoordinates::new(36.97, -122.03)
}

pub fn scotts_valley() -> GeoCoordinates {
    GeoCoordinates::new(37.05, -122.01)
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(health)
        .service(error_log)
        .service(SubmitRequestRoute::<MemoryStatusStore>::new())
        .service(RequestStatusRoute::<MemoryStatusStore>::new())
        .service(CancelRequestRoute::<MemoryStatusStore>::new())
        .service(PendingRideStatusRoute::<MemoryStatusStore>::new())
        .service(ConfirmPendingRideRoute::<MemoryStatusStore>::new())
        .service(ActiveRideStatusRoute::<MemoryStatusStore>::new())
        .service(PickUpRiderRoute::<MemoryStatusStore>::new())
        .service(DropOffRiderRoute::<MemoryStatusStore>::new())
        .service(FinishRideRoute::<MemoryStatusStore>::new())
        .service(CancelActiveRideRoute::<MemoryStatusStore>::new())
        .service(UpdateGameElementsRoute::<MemoryStatusStore>::new());
}

async fn send(api: &TestApi, errors: &ErrorLog, req: actix_http::Request) -> (StatusCode, String) {
    let app = App::new()
        .app_data(web::Data::new(api.clone()))
        .app_data(web::Data::new(errors.clone()))
        .configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub async fn get_request(api: &TestApi, errors: &ErrorLog, path: &str) -> (StatusCode, String) {
    let req = test::TestRequest::get().uri(path).to_request();
    send(api, errors, req).await
}

pub async fn post_request<T: Serialize>(api: &TestApi, errors: &ErrorLog, path: &str, body: &T) -> (StatusCode, String) {
    let req = test::TestRequest::post().uri(path).set_json(body).to_request();
    send(api, errors, req).await
}

pub async fn post_empty(api: &TestApi, errors: &ErrorLog, path: &str) -> (StatusCode, String) {
    let req = test::TestRequest::post().uri(path).to_request();
    send(api, errors, req).await
}
