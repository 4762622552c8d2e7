use log::*;

use crate::TrackerError;

/// Sink for failures that must not stop a tracker: fetch errors and misbehaving listeners.
///
/// Implementations are called from tracker tasks and must never panic.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, error: TrackerError);
}

/// Writes every error to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingErrorHandler;

impl ErrorHandler for LoggingErrorHandler {
    fn handle(&self, error: TrackerError) {
        match error {
            TrackerError::Listener(_) | TrackerError::ListenerPanic(_) => error!("📡 {error}"),
            _ => warn!("📡 {error}"),
        }
    }
}
