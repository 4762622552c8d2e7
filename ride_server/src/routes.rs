//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every status store call is asynchronous, so handlers never block.
//!
//! Ride actions that callers treat as a yes/no question (`confirm` and `cancel`) answer with a [`JsonResponse`]. A
//! refusal is `200 OK` with `success: false`; only server failures are reported as errors. Every other route answers
//! with the affected status record, or with a [`ServerError`].
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use ride_common::{ActiveRideId, PendingRideId, RequestId, UserId};
use ride_matching_engine::{RideMatchingApi, RideStateError, StatusStore};

use crate::{
    context::ErrorLog,
    data_objects::{GameElements, JsonResponse, RiderAction, SubmitRequest, UserAction},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

/// Turns the outcome of a yes/no ride action into a [`JsonResponse`]. Refusals are answers, not errors.
fn action_response<T>(result: Result<T, RideStateError>, message: String) -> Result<HttpResponse, ServerError> {
    match result.map_err(ServerError::from) {
        Ok(_) => Ok(HttpResponse::Ok().json(JsonResponse::success(message))),
        Err(e) if e.is_rejection() => {
            debug!("💻️ Ride action refused. {e}");
            Ok(HttpResponse::Ok().json(JsonResponse::failure(e)))
        },
        Err(e) => {
            warn!("💻️ Ride action failed. {e}");
            Err(e)
        },
    }
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------   Errors  ----------------------------------------------------
/// The most recent failures reported by the background workers, oldest first.
#[get("/errors")]
pub async fn error_log(errors: web::Data<ErrorLog>) -> impl Responder {
    trace!("💻️ GET error log");
    HttpResponse::Ok().json(errors.entries())
}

//----------------------------------------------   Requests  ----------------------------------------------------
route!(submit_request => Post "/requests" impl StatusStore);
/// Submits a new ride request. The body carries the user id and the request details, e.g.
/// ```json
/// { "user_id": "dave", "role": "driver", "seats": 3, "origin": {..}, "destination": {..} }
/// ```
/// The response is the new request status, at version 1.
pub async fn submit_request<B: StatusStore>(
    body: web::Json<SubmitRequest>,
    api: web::Data<RideMatchingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let SubmitRequest { user_id, details } = body.into_inner();
    debug!("💻️ POST new {} request for {user_id}", details.role);
    let request = api.submit_request(&user_id, details).await?;
    Ok(HttpResponse::Ok().json(request))
}

route!(request_status => Get "/requests/{user_id}/{request_id}" impl StatusStore);
pub async fn request_status<B: StatusStore>(
    path: web::Path<(UserId, RequestId)>,
    api: web::Data<RideMatchingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (user_id, request_id) = path.into_inner();
    trace!("💻️ GET request status for {request_id}");
    let request = api.fetch_request_status(&user_id, &request_id).await?;
    Ok(HttpResponse::Ok().json(request))
}

route!(cancel_request => Post "/requests/{user_id}/{request_id}/cancel" impl StatusStore);
/// Withdraws a request. If the request is part of a pending ride, the pending ride is canceled too; if it is part of an
/// active ride, the user leaves the ride.
pub async fn cancel_request<B: StatusStore>(
    path: web::Path<(UserId, RequestId)>,
    api: web::Data<RideMatchingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (user_id, request_id) = path.into_inner();
    debug!("💻️ POST cancel request {request_id} for {user_id}");
    let result = api.post_request_cancel(&user_id, &request_id).await;
    action_response(result, format!("Request {request_id} canceled"))
}

//----------------------------------------------   Pending rides  ----------------------------------------------------
route!(pending_ride_status => Get "/pending_rides/{id}" impl StatusStore);
pub async fn pending_ride_status<B: StatusStore>(
    path: web::Path<PendingRideId>,
    api: web::Data<RideMatchingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ GET pending ride status for {id}");
    let pending = api.fetch_pending_ride_status(&id).await?;
    Ok(HttpResponse::Ok().json(pending))
}

route!(confirm_pending_ride => Post "/pending_rides/{id}/confirm" impl StatusStore);
pub async fn confirm_pending_ride<B: StatusStore>(
    path: web::Path<PendingRideId>,
    body: web::Json<UserAction>,
    api: web::Data<RideMatchingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let user_id = body.into_inner().user_id;
    debug!("💻️ POST confirm pending ride {id} for {user_id}");
    let result = api.post_confirm(&user_id, &id).await;
    action_response(result, format!("{user_id} confirmed pending ride {id}"))
}

//----------------------------------------------   Active rides  ----------------------------------------------------
route!(active_ride_status => Get "/active_rides/{id}" impl StatusStore);
pub async fn active_ride_status<B: StatusStore>(
    path: web::Path<ActiveRideId>,
    api: web::Data<RideMatchingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ GET active ride status for {id}");
    let ride = api.fetch_active_ride_status(&id).await?;
    Ok(HttpResponse::Ok().json(ride))
}

route!(pick_up_rider => Post "/active_rides/{id}/pickup" impl StatusStore);
pub async fn pick_up_rider<B: StatusStore>(
    path: web::Path<ActiveRideId>,
    body: web::Json<RiderAction>,
    api: web::Data<RideMatchingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let RiderAction { driver_id, rider_id } = body.into_inner();
    debug!("💻️ POST pick up {rider_id} on ride {id}");
    let ride = api.pick_up_rider(&driver_id, &id, &rider_id).await?;
    Ok(HttpResponse::Ok().json(ride))
}

route!(drop_off_rider => Post "/active_rides/{id}/dropoff" impl StatusStore);
pub async fn drop_off_rider<B: StatusStore>(
    path: web::Path<ActiveRideId>,
    body: web::Json<RiderAction>,
    api: web::Data<RideMatchingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let RiderAction { driver_id, rider_id } = body.into_inner();
    debug!("💻️ POST drop off {rider_id} on ride {id}");
    let ride = api.drop_off_rider(&driver_id, &id, &rider_id).await?;
    Ok(HttpResponse::Ok().json(ride))
}

route!(finish_ride => Post "/active_rides/{id}/finish" impl StatusStore);
pub async fn finish_ride<B: StatusStore>(
    path: web::Path<ActiveRideId>,
    body: web::Json<UserAction>,
    api: web::Data<RideMatchingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let user_id = body.into_inner().user_id;
    debug!("💻️ POST finish ride {id} for {user_id}");
    let ride = api.finish_ride(&user_id, &id).await?;
    Ok(HttpResponse::Ok().json(ride))
}

route!(cancel_active_ride => Post "/active_rides/{id}/cancel" impl StatusStore);
pub async fn cancel_active_ride<B: StatusStore>(
    path: web::Path<ActiveRideId>,
    body: web::Json<UserAction>,
    api: web::Data<RideMatchingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let user_id = body.into_inner().user_id;
    debug!("💻️ POST cancel ride {id} for {user_id}");
    let ride = api.cancel_active_ride(&user_id, &id).await?;
    Ok(HttpResponse::Ok().json(ride))
}

route!(update_game_elements => Post "/active_rides/{id}/game_elements" impl StatusStore);
pub async fn update_game_elements<B: StatusStore>(
    path: web::Path<ActiveRideId>,
    body: web::Json<GameElements>,
    api: web::Data<RideMatchingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let GameElements { user_id, elements } = body.into_inner();
    trace!("💻️ POST game elements for {user_id} on ride {id}");
    let ride = api.update_game_elements(&user_id, &id, elements).await?;
    Ok(HttpResponse::Ok().json(ride))
}
