use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use ride_matching_engine::RideStateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The request conflicts with the current state of the ride. {0}")]
    StateConflict(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::StateConflict(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl ServerError {
    /// True for failures caused by the state of the records rather than by the server itself.
    pub fn is_rejection(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl From<RideStateError> for ServerError {
    fn from(e: RideStateError) -> Self {
        match e {
            RideStateError::StoreError(e) => Self::BackendError(format!("Status store error: {e}")),
            RideStateError::NotFound { .. } => Self::NoRecordFound(e.to_string()),
            RideStateError::NotOwner(..) | RideStateError::NotParticipant(..) | RideStateError::NotDriver(..) => {
                Self::InsufficientPermissions(e.to_string())
            },
            RideStateError::InvalidRequest(_) | RideStateError::InvalidMatch(_) => {
                Self::InvalidRequestBody(e.to_string())
            },
            RideStateError::InvalidTransition(_) |
            RideStateError::AlreadyMatched(..) |
            RideStateError::RequestClosed(_) |
            RideStateError::AlreadyConfirmed(..) |
            RideStateError::DriverNotConfirmed(_) |
            RideStateError::RidersStillOnBoard(_) |
            RideStateError::PendingRideExpired(_) |
            RideStateError::RideClosed(_) |
            RideStateError::ConcurrentModification(_) => Self::StateConflict(e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use ride_common::{PendingRideId, RequestId, UserId};
    use ride_matching_engine::status_types::{StatusKind, TransitionError};

    use super::*;

    #[test]
    fn domain_failures_map_to_client_errors() {
        let not_found: ServerError = RideStateError::not_found(StatusKind::Request, &"r1").into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
        let not_owner: ServerError = RideStateError::NotOwner(RequestId::from("r1"), UserId::from("mallory")).into();
        assert_eq!(not_owner.status_code(), StatusCode::FORBIDDEN);
        let transition = TransitionError { from: "Canceled".into(), to: "Confirmed".into() };
        let conflict: ServerError = RideStateError::InvalidTransition(transition).into();
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);
        let expired: ServerError = RideStateError::PendingRideExpired(PendingRideId::from("p1")).into();
        assert!(expired.is_rejection());
        let bad: ServerError = RideStateError::InvalidRequest("no seats".into()).into();
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn error_body_is_json() {
        let err = ServerError::NoRecordFound("request r1".into());
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!ServerError::BackendError("disk full".into()).is_rejection());
    }
}
