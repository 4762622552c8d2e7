use std::{fmt::Display, future::Future, time::Duration};

use chrono::{DateTime, Utc};
use log::*;
use tokio::task::JoinHandle;

use crate::context::ErrorLog;

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `period`, the worker calls `expire` with the current time. `expire` should expire every record that is due
/// and report how many there were; typically it is a thin wrapper around
/// [`ride_matching_engine::RideMatchingApi::expire_due`]. Failures are logged and recorded in `errors`, and the
/// worker carries on with the next tick.
pub fn start_expiry_worker<F, Fut, E>(period: Duration, errors: ErrorLog, expire: F) -> JoinHandle<()>
where
    F: Fn(DateTime<Utc>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<usize, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(period);
        info!("🕰️ Expiry worker started. Sweeping every {}s", period.as_secs_f64());
        loop {
            timer.tick().await;
            trace!("🕰️ Running expiry job");
            match expire(Utc::now()).await {
                Ok(0) => {},
                Ok(count) => info!("🕰️ {count} requests and pending rides expired"),
                Err(e) => {
                    error!("🕰️ Error running expiry job: {e}");
                    errors.record("expiry_worker", e);
                },
            }
        }
    })
}
