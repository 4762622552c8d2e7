use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use directions_tools::{DirectionsApi, DirectionsConfig, RouteComputer};
use log::*;
use ride_common::{RequestId, UserId};
use ride_matching_engine::status_types::{PendingRideState, PendingRideStatus, RequestDetails, RideRelatedRequestStatus};
use ride_tracker::{
    facades::{
        ExpiredListener,
        MatchedListener,
        MatchedRideRelatedRequest,
        PendingRideRelatedRequest,
        StatusUpdateListener,
    },
    ErrorHandler,
    LoggingErrorHandler,
    RideService,
    RideServiceClient,
    TrackerConfig,
    TrackerOptions,
};
use tokio::sync::mpsc;

use crate::{
    formatting::{format_active_ride, format_pending_ride, format_request, format_route},
    Arguments,
    Command,
    RouteParams,
    SubmitParams,
};

pub async fn handle_command(cli: Arguments) -> Result<()> {
    let mut config = TrackerConfig::from_env_or_default();
    if let Some(server) = cli.server {
        config.server_url = server.trim_end_matches('/').to_string();
    }
    use Command::*;
    match cli.command {
        Submit(params) => submit_request(&config, params).await,
        Status { user, request_id } => {
            let status = new_client(&config)?.fetch_request_status(&user, &request_id).await?;
            print!("{}", format_request(&status)?);
            Ok(())
        },
        Pending { id } => {
            let status = new_client(&config)?.fetch_pending_ride_status(&id).await?;
            print!("{}", format_pending_ride(&status)?);
            Ok(())
        },
        Active { id } => {
            let status = new_client(&config)?.fetch_active_ride_status(&id).await?;
            print!("{}", format_active_ride(&status)?);
            Ok(())
        },
        Watch { user, request_id } => watch_request(&config, user, request_id).await,
        Confirm { user, pending_ride_id } => {
            let accepted = new_client(&config)?.post_confirm(&user, &pending_ride_id).await?;
            print_outcome(accepted, &format!("Pending ride {pending_ride_id} confirmed"));
            Ok(())
        },
        Cancel { user, request_id } => {
            let accepted = new_client(&config)?.post_request_cancel(&user, &request_id).await?;
            print_outcome(accepted, &format!("Request {request_id} withdrawn"));
            Ok(())
        },
        Route(params) => print_route(params).await,
    }
}

fn new_client(config: &TrackerConfig) -> Result<RideServiceClient> {
    RideServiceClient::new(config).context("Could not create the ride service client")
}

fn print_outcome(accepted: bool, message: &str) {
    if accepted {
        println!("✅️ {message}");
    } else {
        println!("❌️ The ride server refused the request. Run with RUST_LOG=debug for its reason.");
    }
}

async fn submit_request(config: &TrackerConfig, params: SubmitParams) -> Result<()> {
    let details = match params.seats {
        Some(seats) => RequestDetails::driver(seats, params.origin, params.destination),
        None => RequestDetails::rider(params.origin, params.destination),
    };
    let status = new_client(config)?.submit_request(&params.user, details).await?;
    print!("{}", format_request(&status)?);
    Ok(())
}

enum WatchEvent {
    Matched(MatchedRideRelatedRequest<RideServiceClient>),
    PendingRide(PendingRideStatus),
    Expired(RideRelatedRequestStatus),
}

/// Follows a request through matching and the life of its pending ride. Listeners only forward events to this task,
/// which does the printing.
async fn watch_request(config: &TrackerConfig, user: UserId, request_id: RequestId) -> Result<()> {
    let client = new_client(config)?;
    let options = TrackerOptions::from(config);
    let handler: Arc<dyn ErrorHandler> = Arc::new(LoggingErrorHandler);
    let current = client.fetch_request_status(&user, &request_id).await?;
    print!("{}", format_request(&current)?);
    if current.is_canceled || current.is_expired {
        return Ok(());
    }

    let request = PendingRideRelatedRequest::new(client, user, request_id, options, handler);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let matched_tx = tx.clone();
    let on_matched: MatchedListener<RideServiceClient> =
        Arc::new(move |ride: MatchedRideRelatedRequest<RideServiceClient>| {
            let _ = matched_tx.send(WatchEvent::Matched(ride));
        });
    let expired_tx = tx.clone();
    let on_expired: ExpiredListener = Arc::new(move |status: &RideRelatedRequestStatus| {
        let _ = expired_tx.send(WatchEvent::Expired(status.clone()));
    });
    let update_tx = tx;
    let on_update: StatusUpdateListener = Arc::new(move |status: &PendingRideStatus| {
        let _ = update_tx.send(WatchEvent::PendingRide(status.clone()));
    });
    request.on_matched(&on_matched);
    request.on_expired(&on_expired);
    println!("Watching request {}. Press Ctrl-C to stop.", request.request_id());

    let mut ride = None;
    loop {
        let event = tokio::select! {
            event = rx.recv() => event.ok_or_else(|| anyhow!("The status trackers stopped unexpectedly"))?,
            _ = tokio::signal::ctrl_c() => break,
        };
        match event {
            WatchEvent::Matched(matched) => {
                println!("🚗 Matched into pending ride {}", matched.pending_ride_id());
                matched.on_status_updated(&on_update);
                ride = Some(matched);
            },
            WatchEvent::PendingRide(status) => {
                print!("{}", format_pending_ride(&status)?);
                match status.state {
                    PendingRideState::Confirmed => {
                        let active = status.active_ride_id.map(|id| id.to_string()).unwrap_or_default();
                        println!("🚗 Everyone confirmed. Active ride {active} has started");
                        break;
                    },
                    PendingRideState::Canceled => {
                        println!("🚗 Pending ride {} was canceled. Waiting for another match", status.id);
                        // A re-match may already have replaced it
                        if ride.as_ref().is_some_and(|r| r.pending_ride_id() == &status.id) {
                            if let Some(r) = ride.take() {
                                r.shutdown();
                            }
                        }
                    },
                    _ => {},
                }
            },
            WatchEvent::Expired(status) => {
                print!("{}", format_request(&status)?);
                println!("⌛️ The request expired");
                break;
            },
        }
    }
    debug!("📡 Stopping trackers for {}", request.request_id());
    request.shutdown();
    if let Some(r) = ride {
        r.shutdown();
    }
    Ok(())
}

async fn print_route(params: RouteParams) -> Result<()> {
    let config = DirectionsConfig::new_from_env_or_default();
    let api = DirectionsApi::new(config).context("Could not create the directions client")?;
    let computer = RouteComputer::new(api);
    let legs = computer.compute_route_with_waypoints(params.origin, params.destination, &params.waypoints).await?;
    match legs {
        Some(legs) => println!("{}", format_route(&legs)),
        None => println!("The directions provider found no route"),
    }
    Ok(())
}
