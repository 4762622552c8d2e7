use std::fmt::Display;

use ride_common::UserId;
use ride_matching_engine::status_types::RequestDetails;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Body of `POST /requests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub user_id: UserId,
    #[serde(flatten)]
    pub details: RequestDetails,
}

/// Body of ride actions that only need to know who is acting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAction {
    pub user_id: UserId,
}

/// Body of the driver's pickup and drop-off actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderAction {
    pub driver_id: UserId,
    pub rider_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameElements {
    pub user_id: UserId,
    #[serde(default)]
    pub elements: serde_json::Value,
}
