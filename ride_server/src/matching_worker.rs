use std::{fmt::Display, future::Future, time::Duration};

use log::*;
use ride_matching_engine::status_types::PendingRideStatus;
use tokio::task::JoinHandle;

use crate::context::ErrorLog;

/// Starts the matching worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// `run_round` runs a single matching round (see [`ride_matching_engine::RideMatcher::run_round`]) and returns the
/// pending rides it created. A failed round is logged and recorded in `errors`; the next round starts on the next tick
/// as usual.
pub fn start_matching_worker<F, Fut, E>(period: Duration, errors: ErrorLog, run_round: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<PendingRideStatus>, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(period);
        info!("🕰️ Matching worker started. Matching every {}s", period.as_secs_f64());
        loop {
            timer.tick().await;
            trace!("🕰️ Running matching round");
            match run_round().await {
                Ok(rides) if rides.is_empty() => {},
                Ok(rides) => {
                    info!("🕰️ {} pending rides created", rides.len());
                    debug!("🕰️ New pending rides: {}", ride_list(&rides));
                },
                Err(e) => {
                    error!("🕰️ Error running matching round: {e}");
                    errors.record("matching_worker", e);
                },
            }
        }
    })
}

fn ride_list(rides: &[PendingRideStatus]) -> String {
    rides
        .iter()
        .map(|r| format!("[{}] driver: {} riders: {}", r.id, r.ride_info.driver.user_id, r.ride_info.riders.len()))
        .collect::<Vec<String>>()
        .join(", ")
}
