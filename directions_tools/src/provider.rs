use crate::{DirectionsApiError, DirectionsRequest, DirectionsResponse};

/// Anything that can answer a driving-directions query.
///
/// Implementations return the provider's response as-is, including responses that carry an `error_message` or no
/// routes. Interpreting those is the job of [`crate::RouteComputer`]. An `Err` means the provider could not be
/// reached or answered with something that is not a directions response at all.
#[allow(async_fn_in_trait)]
pub trait DirectionsProvider {
    async fn directions(&self, request: &DirectionsRequest) -> Result<DirectionsResponse, DirectionsApiError>;
}
