use serde::{Deserialize, Serialize};

/// Payload shown on the device.
#[derive(Debug, Clone, Serialize)]
pub struct PushNotificationPayload {
    pub title: String,
    pub body: String,
}

/// Request body for the messaging service's legacy send endpoint. `to` is a
/// device token or a "/topics/..." target.
#[derive(Debug, Serialize)]
pub struct PushSendRequest {
    pub to: String,
    pub notification: PushNotificationPayload,
}

#[derive(Debug, Deserialize)]
pub struct PushSendResponse {
    #[serde(default)]
    pub success: i64,
    #[serde(default)]
    pub failure: i64,
}
