use std::{future::Future, sync::Arc};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Response,
};
use ride_common::{ActiveRideId, PendingRideId, RequestId, UserId};
use ride_matching_engine::status_types::{
    ActiveRideStatus,
    PendingRideStatus,
    RequestDetails,
    RideRelatedRequestStatus,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{TrackerConfig, TrackerError};

/// The ride service, as seen by a client.
///
/// `post_confirm` and `post_request_cancel` answer a yes/no question: `Ok(false)` means the service refused the action,
/// while `Err` means the question never got an answer.
pub trait RideService: Clone + Send + Sync + 'static {
    fn submit_request(
        &self,
        user_id: &UserId,
        details: RequestDetails,
    ) -> impl Future<Output = Result<RideRelatedRequestStatus, TrackerError>> + Send;

    fn fetch_request_status(
        &self,
        user_id: &UserId,
        request_id: &RequestId,
    ) -> impl Future<Output = Result<RideRelatedRequestStatus, TrackerError>> + Send;

    fn fetch_pending_ride_status(
        &self,
        id: &PendingRideId,
    ) -> impl Future<Output = Result<PendingRideStatus, TrackerError>> + Send;

    fn fetch_active_ride_status(
        &self,
        id: &ActiveRideId,
    ) -> impl Future<Output = Result<ActiveRideStatus, TrackerError>> + Send;

    fn post_confirm(
        &self,
        user_id: &UserId,
        id: &PendingRideId,
    ) -> impl Future<Output = Result<bool, TrackerError>> + Send;

    fn post_request_cancel(
        &self,
        user_id: &UserId,
        request_id: &RequestId,
    ) -> impl Future<Output = Result<bool, TrackerError>> + Send;
}

#[derive(Debug, Serialize)]
struct UserActionBody<'a> {
    user_id: &'a UserId,
}

#[derive(Debug, Serialize)]
struct SubmitRequestBody<'a> {
    user_id: &'a UserId,
    #[serde(flatten)]
    details: RequestDetails,
}

#[derive(Debug, Deserialize)]
struct ActionResponse {
    success: bool,
    message: String,
}

/// [`RideService`] over HTTP, talking to a ride server.
#[derive(Clone)]
pub struct RideServiceClient {
    base_url: String,
    client: Arc<Client>,
}

impl RideServiceClient {
    pub fn new(config: &TrackerConfig) -> Result<Self, TrackerError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| TrackerError::Initialization(e.to_string()))?;
        Ok(Self { base_url: config.server_url.trim_end_matches('/').to_string(), client: Arc::new(client) })
    }

    pub fn url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TrackerError> {
        let url = self.endpoint(path);
        trace!("📡 GET {url}");
        let response = self.client.get(url).send().await.map_err(|e| TrackerError::Transport(e.to_string()))?;
        read_json(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, TrackerError> {
        let url = self.endpoint(path);
        trace!("📡 POST {url}");
        let response =
            self.client.post(url).json(body).send().await.map_err(|e| TrackerError::Transport(e.to_string()))?;
        read_json(response).await
    }

    async fn post_action<B: Serialize>(&self, path: &str, body: &B) -> Result<bool, TrackerError> {
        let response = self.post::<B, ActionResponse>(path, body).await?;
        if !response.success {
            debug!("📡 The ride service refused {path}. {}", response.message);
        }
        Ok(response.success)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, TrackerError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.map_err(|e| TrackerError::Transport(e.to_string()))?;
        return Err(TrackerError::HttpStatus { status: status.as_u16(), message });
    }
    response.json::<T>().await.map_err(|e| TrackerError::Json(e.to_string()))
}

impl RideService for RideServiceClient {
    async fn submit_request(
        &self,
        user_id: &UserId,
        details: RequestDetails,
    ) -> Result<RideRelatedRequestStatus, TrackerError> {
        self.post("/requests", &SubmitRequestBody { user_id, details }).await
    }

    async fn fetch_request_status(
        &self,
        user_id: &UserId,
        request_id: &RequestId,
    ) -> Result<RideRelatedRequestStatus, TrackerError> {
        self.get(&format!("/requests/{user_id}/{request_id}")).await
    }

    async fn fetch_pending_ride_status(&self, id: &PendingRideId) -> Result<PendingRideStatus, TrackerError> {
        self.get(&format!("/pending_rides/{id}")).await
    }

    async fn fetch_active_ride_status(&self, id: &ActiveRideId) -> Result<ActiveRideStatus, TrackerError> {
        self.get(&format!("/active_rides/{id}")).await
    }

    async fn post_confirm(&self, user_id: &UserId, id: &PendingRideId) -> Result<bool, TrackerError> {
        self.post_action(&format!("/pending_rides/{id}/confirm"), &UserActionBody { user_id }).await
    }

    async fn post_request_cancel(&self, user_id: &UserId, request_id: &RequestId) -> Result<bool, TrackerError> {
        self.post_action(&format!("/requests/{user_id}/{request_id}/cancel"), &UserActionBody { user_id }).await
    }
}
