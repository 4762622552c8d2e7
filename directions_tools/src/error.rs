use thiserror::Error;

/// API-access failures. Every variant means the provider could not be reached or did not give a usable answer.
/// "No route between these points" is not an error; see [`crate::RouteComputer`].
#[derive(Debug, Error)]
pub enum DirectionsApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Directions request failed: {0}")]
    RequestError(String),
    #[error("Directions query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("The directions provider returned an error ({status}): {message}")]
    ProviderError { status: String, message: String },
    #[error("Malformed directions response: {0}")]
    MalformedResponse(String),
    #[error("Invalid encoded polyline: {0}")]
    InvalidPolyline(String),
}
