use std::future::Future;

use thiserror::Error;

use crate::{
    api::PaymentNotification,
    events::{PushNotification, Topic},
    traits::{ChargeRequest, ChargeResult},
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Payment method {0} is not supported")]
    UnsupportedMethod(String),
    #[error("The payment provider rejected the charge. {0}")]
    Rejected(String),
    #[error("The payment provider could not be reached. {0}")]
    Unavailable(String),
    #[error("The payment provider sent a response we could not read. {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Could not upload {name}. {reason}")]
    UploadFailed { name: String, reason: String },
    #[error("Could not delete {name}. {reason}")]
    DeleteFailed { name: String, reason: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("Could not publish to topic {topic}. {reason}")]
    PublishFailed { topic: String, reason: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PushError {
    #[error("Could not deliver push notification. {0}")]
    DeliveryFailed(String),
}

/// Creates charges with the payment provider.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeResult, GatewayError>;

    /// Checks that a payment notification really came from the provider. Gateways without a signing scheme accept
    /// everything.
    fn verify_notification(&self, _notification: &PaymentNotification) -> bool {
        true
    }
}

/// Object storage for uploaded admission documents.
#[allow(async_fn_in_trait)]
pub trait DocumentStorage {
    async fn upload(&self, name: &str, content: Vec<u8>) -> Result<(), StorageError>;

    async fn delete(&self, name: &str) -> Result<(), StorageError>;
}

/// Durable publish/subscribe broker. Publishes are driven from detached tasks, so the returned future must be `Send`.
pub trait MessageBroker: Send + Sync + 'static {
    fn publish(&self, topic: Topic, payload: Vec<u8>) -> impl Future<Output = Result<(), BrokerError>> + Send;
}

/// Realtime notifications to the applicant's client.
#[allow(async_fn_in_trait)]
pub trait PushNotifier {
    async fn push(&self, notification: &PushNotification) -> Result<(), PushError>;
}
