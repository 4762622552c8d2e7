use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};

use crate::{DirectionsApiError, DirectionsConfig, DirectionsProvider, DirectionsRequest, DirectionsResponse};

/// HTTP client for a Google-Directions-compatible JSON endpoint.
#[derive(Clone)]
pub struct DirectionsApi {
    config: DirectionsConfig,
    client: Arc<Client>,
}

impl DirectionsApi {
    pub fn new(config: DirectionsConfig) -> Result<Self, DirectionsApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| DirectionsApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self) -> &str {
        self.config.base_url.as_str()
    }
}

impl DirectionsProvider for DirectionsApi {
    async fn directions(&self, request: &DirectionsRequest) -> Result<DirectionsResponse, DirectionsApiError> {
        let mut params = request.query_params();
        trace!("🗺️ Sending directions query to {}: {params:?}", self.url());
        let key = self.config.api_key.reveal();
        if !key.is_empty() {
            params.push(("key", key.clone()));
        }
        let response = self
            .client
            .get(self.url())
            .query(&params)
            .send()
            .await
            .map_err(|e| DirectionsApiError::RequestError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| DirectionsApiError::RequestError(e.to_string()))?;
            return Err(DirectionsApiError::QueryError { status, message });
        }
        let result = response.json::<DirectionsResponse>().await.map_err(|e| DirectionsApiError::JsonError(e.to_string()))?;
        debug!("🗺️ Directions query returned status {} with {} routes", result.status, result.routes.len());
        Ok(result)
    }
}
