use std::sync::Arc;

use admission_engine::{
    events::Topic,
    traits::{BrokerError, MessageBroker},
};
use log::*;
use reqwest::Client;

use crate::{config::NsqConfig, ProviderApiError};

/// Publishes broker messages through the nsqd HTTP interface.
#[derive(Clone)]
pub struct NsqPublisher {
    config: Arc<NsqConfig>,
    client: Arc<Client>,
}

impl NsqPublisher {
    pub fn new(config: NsqConfig) -> Result<Self, ProviderApiError> {
        let client = Client::builder().build().map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config: Arc::new(config), client: Arc::new(client) })
    }

    pub fn publish_url(&self, topic: Topic) -> String {
        format!("{}/pub?topic={}", self.config.url.trim_end_matches('/'), self.config.topic_name(topic))
    }

    async fn send(&self, topic: Topic, payload: Vec<u8>) -> Result<(), ProviderApiError> {
        let response = self
            .client
            .post(self.publish_url(topic))
            .body(payload)
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

impl MessageBroker for NsqPublisher {
    fn publish(&self, topic: Topic, payload: Vec<u8>) -> impl std::future::Future<Output = Result<(), BrokerError>> + Send {
        let publisher = self.clone();
        async move {
            trace!("📨️ Publishing {} bytes to topic {topic}", payload.len());
            publisher.send(topic, payload).await.map_err(|e| {
                let topic = publisher.config.topic_name(topic);
                BrokerError::PublishFailed { topic, reason: e.to_string() }
            })
        }
    }
}
