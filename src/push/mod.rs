pub mod dto;

use std::env;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::AppError;

/// What the service puts on the wire. Delivery itself is the messaging
/// backend's job; callers treat every send as best-effort.
#[derive(Debug, Clone)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
}

#[derive(Clone, Debug)]
pub struct PushConfig {
    pub api_key: String,
    pub send_url: String,
    pub broadcast_topic: String,
}

impl PushConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let api_key = env::var("PUSH_API_KEY")
            .map_err(|_| AppError::BadRequest("PUSH_API_KEY is not set".to_string()))?;
        let send_url = env::var("PUSH_SEND_URL")
            .unwrap_or_else(|_| "https://fcm.googleapis.com/fcm/send".to_string());
        let broadcast_topic = env::var("PUSH_BROADCAST_TOPIC")
            .unwrap_or_else(|_| "/topics/campus-all".to_string());

        Ok(Self {
            api_key,
            send_url,
            broadcast_topic,
        })
    }
}

#[async_trait]
pub trait PushClient: Send + Sync {
    async fn send_to_device(&self, device_token: &str, message: &PushMessage) -> Result<(), AppError>;
    async fn broadcast(&self, message: &PushMessage) -> Result<(), AppError>;
}

pub struct HttpPushClient {
    client: Client,
    config: PushConfig,
}

impl HttpPushClient {
    pub fn new(config: PushConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    async fn send(&self, to: &str, message: &PushMessage) -> Result<(), AppError> {
        let request_body = dto::PushSendRequest {
            to: to.to_string(),
            notification: dto::PushNotificationPayload {
                title: message.title.clone(),
                body: message.body.clone(),
            },
        };

        let response = self.client
            .post(&self.config.send_url)
            .header("Authorization", format!("key={}", self.config.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|_| AppError::InternalServerError)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::BadRequest(format!("Push service error {}: {}", status, body)));
        }

        let body_text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<dto::PushSendResponse>(&body_text) {
            Ok(parsed) if parsed.failure > 0 => {
                tracing::warn!("Push service reported {} failed deliveries", parsed.failure);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Unrecognized push service response: {}", e);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl PushClient for HttpPushClient {
    async fn send_to_device(&self, device_token: &str, message: &PushMessage) -> Result<(), AppError> {
        self.send(device_token, message).await
    }

    async fn broadcast(&self, message: &PushMessage) -> Result<(), AppError> {
        let topic = self.config.broadcast_topic.clone();
        self.send(&topic, message).await
    }
}

/// Used in tests and in deployments without a configured messaging backend.
pub struct NoopPushClient;

#[async_trait]
impl PushClient for NoopPushClient {
    async fn send_to_device(&self, _device_token: &str, _message: &PushMessage) -> Result<(), AppError> {
        Ok(())
    }

    async fn broadcast(&self, _message: &PushMessage) -> Result<(), AppError> {
        Ok(())
    }
}
