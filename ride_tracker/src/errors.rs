use std::time::Duration;

use thiserror::Error;

/// Failures on the client side of the ride service.
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    #[error("Could not initialize the ride service client. {0}")]
    Initialization(String),
    #[error("Could not reach the ride service. {0}")]
    Transport(String),
    #[error("The ride service answered with HTTP {status}. {message}")]
    HttpStatus { status: u16, message: String },
    #[error("Could not read the ride service response. {0}")]
    Json(String),
    #[error("The status fetch did not complete within {0:?}")]
    Timeout(Duration),
    #[error("A status listener failed. {0}")]
    Listener(String),
    #[error("A status listener panicked. {0}")]
    ListenerPanic(String),
}

impl TrackerError {
    /// True when the service was reached but refused the request.
    pub fn is_rejection(&self) -> bool {
        matches!(self, TrackerError::HttpStatus { status, .. } if (400..500).contains(status))
    }
}
