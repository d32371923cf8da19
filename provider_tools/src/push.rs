use std::sync::Arc;

use admission_engine::{
    events::PushNotification,
    traits::{PushError, PushNotifier},
};
use log::*;
use reqwest::Client;
use serde_json::{json, Value};

use crate::{config::PushConfig, helpers::hmac_sha256_base64, ProviderApiError};

/// Triggers realtime events on the push relay. Each request body is signed with the shared secret.
#[derive(Clone)]
pub struct PushClient {
    config: Arc<PushConfig>,
    client: Arc<Client>,
}

impl PushClient {
    pub fn new(config: PushConfig) -> Result<Self, ProviderApiError> {
        let client = Client::builder().build().map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config: Arc::new(config), client: Arc::new(client) })
    }

    /// The relay's event envelope: the event name, the channel and the notification itself.
    pub fn event_body(&self, notification: &PushNotification) -> Result<Value, ProviderApiError> {
        let number = notification.kind.event_number();
        let name = self
            .config
            .event_name(number)
            .ok_or_else(|| ProviderApiError::MissingField(format!("an event name for push event {number}")))?;
        let data = serde_json::to_value(notification).map_err(|e| ProviderApiError::JsonError(e.to_string()))?;
        Ok(json!({ "name": name, "channel": self.config.channel, "data": data }))
    }

    pub fn signature(&self, body: &str) -> String {
        hmac_sha256_base64(self.config.secret.reveal(), body.as_bytes())
    }

    async fn trigger(&self, notification: &PushNotification) -> Result<(), ProviderApiError> {
        let body = self.event_body(notification)?.to_string();
        let signature = self.signature(&body);
        let response = self
            .client
            .post(self.config.url.as_str())
            .header("Content-Type", "application/json")
            .header("X-Push-Key", self.config.app_key.as_str())
            .header("X-Push-Signature", signature)
            .body(body)
            .send()
            .await
            .map_err(|e| ProviderApiError::RestRequestError(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.map_err(|e| ProviderApiError::RestResponseError(e.to_string()))?;
        Err(ProviderApiError::QueryError { status: status.as_u16(), message })
    }
}

impl PushNotifier for PushClient {
    async fn push(&self, notification: &PushNotification) -> Result<(), PushError> {
        self.trigger(notification).await.map_err(|e| {
            debug!("📲️ Push to {} failed. {e}", notification.username);
            PushError::DeliveryFailed(e.to_string())
        })
    }
}
