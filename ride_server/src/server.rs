use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use chrono::{DateTime, Utc};
use directions_tools::{DirectionsApi, RouteComputer};
use log::*;
use ride_matching_engine::{
    events::{EventHandlers, EventHooks},
    RideMatcher,
    RideMatchingApi,
    SqliteStatusStore,
};

use crate::{
    config::ServerConfig,
    context::{ErrorLog, ServerContext},
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    matching_worker::start_matching_worker,
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

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteStatusStore::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, logging_hooks());
    let producers = handlers.producers();
    handlers.start_handlers();
    let api = RideMatchingApi::new(db, producers, config.timeouts);
    let context = create_server_context(&config, api)?;
    let srv = create_server_instance(&config, context.api().clone(), context.errors().clone())?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    context.shutdown().await;
    result
}

/// Builds the process context and starts the expiry and matching workers.
pub fn create_server_context(
    config: &ServerConfig,
    api: RideMatchingApi<SqliteStatusStore>,
) -> Result<ServerContext<SqliteStatusStore>, ServerError> {
    let errors = ErrorLog::default();
    let directions =
        DirectionsApi::new(config.directions.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let matcher = Arc::new(RideMatcher::new(api.clone(), RouteComputer::new(directions), config.max_pickup_distance_km));
    let mut context = ServerContext::new(api.clone(), errors.clone());
    let expiry = start_expiry_worker(config.expiry_interval, errors.clone(), move |now: DateTime<Utc>| {
        let api = api.clone();
        async move { api.expire_due(now).await }
    });
    context.add_worker(expiry);
    let matching = start_matching_worker(config.matching_interval, errors, move || {
        let matcher = Arc::clone(&matcher);
        async move { matcher.run_round().await }
    });
    context.add_worker(matching);
    Ok(context)
}

pub fn create_server_instance(
    config: &ServerConfig,
    api: RideMatchingApi<SqliteStatusStore>,
    errors: ErrorLog,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("ride::access_log"))
            .app_data(web::Data::new(api.clone()))
            .app_data(web::Data::new(errors.clone()))
            .service(health)
            .service(error_log)
            .service(SubmitRequestRoute::<SqliteStatusStore>::new())
            .service(RequestStatusRoute::<SqliteStatusStore>::new())
            .service(CancelRequestRoute::<SqliteStatusStore>::new())
            .service(PendingRideStatusRoute::<SqliteStatusStore>::new())
            .service(ConfirmPendingRideRoute::<SqliteStatusStore>::new())
            .service(ActiveRideStatusRoute::<SqliteStatusStore>::new())
            .service(PickUpRiderRoute::<SqliteStatusStore>::new())
            .service(DropOffRiderRoute::<SqliteStatusStore>::new())
            .service(FinishRideRoute::<SqliteStatusStore>::new())
            .service(CancelActiveRideRoute::<SqliteStatusStore>::new())
            .service(UpdateGameElementsRoute::<SqliteStatusStore>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Hooks that write every domain event to the log.
fn logging_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_request_matched(|ev| {
            Box::pin(async move {
                info!("📬️ Request {} matched into pending ride {}", ev.request.id, ev.pending_ride.id);
            })
        })
        .on_request_expired(|ev| {
            Box::pin(async move {
                info!("📬️ Request {} from {} expired", ev.request.id, ev.request.user_id);
            })
        })
        .on_pending_ride_changed(|ev| {
            Box::pin(async move {
                info!("📬️ Pending ride {} is now {} (v{})", ev.pending_ride.id, ev.pending_ride.state, ev.pending_ride.version);
            })
        })
        .on_active_ride_changed(|ev| {
            Box::pin(async move {
                info!("📬️ Active ride {} is now {} (v{})", ev.active_ride.id, ev.active_ride.ride_state, ev.active_ride.version);
            })
        });
    hooks
}
