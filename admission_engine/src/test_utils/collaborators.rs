//! In-memory collaborators that record what they were asked to do.
use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{NaiveDateTime, Utc};
use serde_json::Value;

use crate::{
    api::PaymentNotification,
    events::{EventHandlers, EventHooks, PushNotification, Topic},
    notifications::{broker_delivery_hook, FanoutMetrics, NotificationFanout, RetryPolicy},
    traits::{
        BrokerError,
        ChargeRequest,
        ChargeResult,
        DocumentStorage,
        GatewayError,
        MessageBroker,
        PaymentGateway,
        PushError,
        PushNotifier,
        StorageError,
    },
};

//--------------------------------------   RecordingGateway  ---------------------------------------------------------
#[derive(Clone, Default)]
pub struct RecordingGateway {
    charges: Arc<Mutex<Vec<ChargeRequest>>>,
    failure: Option<GatewayError>,
    expiry: Option<NaiveDateTime>,
    signature: Option<String>,
}

impl RecordingGateway {
    /// Every charge fails with `e`.
    pub fn failing(e: GatewayError) -> Self {
        Self { failure: Some(e), ..Default::default() }
    }

    /// Charges report the given expiry.
    pub fn with_expiry(mut self, expiry: NaiveDateTime) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Only notifications carrying this signature key are accepted.
    pub fn with_signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    pub fn charges(&self) -> Vec<ChargeRequest> {
        self.charges.lock().unwrap().clone()
    }
}

impl PaymentGateway for RecordingGateway {
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeResult, GatewayError> {
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }
        let payment_code = format!("8808{}", request.invoice.as_str().trim_start_matches("INV-").replace('-', ""));
        self.charges.lock().unwrap().push(request);
        Ok(ChargeResult { payment_code, transaction_time: Utc::now().naive_utc(), expiry: self.expiry })
    }

    fn verify_notification(&self, notification: &PaymentNotification) -> bool {
        match &self.signature {
            Some(expected) => notification.signature_key.as_deref() == Some(expected.as_str()),
            None => true,
        }
    }
}

//--------------------------------------   RecordingBroker   ---------------------------------------------------------
#[derive(Clone, Default)]
pub struct RecordingBroker {
    messages: Arc<Mutex<Vec<(Topic, Value)>>>,
}

impl RecordingBroker {
    pub fn messages(&self) -> Vec<(Topic, Value)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn messages_on(&self, topic: Topic) -> Vec<Value> {
        self.messages().into_iter().filter(|(t, _)| *t == topic).map(|(_, v)| v).collect()
    }

    /// Waits up to a second for `count` messages to arrive. Broker delivery is detached, so tests need to poll.
    pub async fn wait_for(&self, count: usize) -> Vec<(Topic, Value)> {
        for _ in 0..100 {
            if self.messages.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.messages()
    }
}

impl MessageBroker for RecordingBroker {
    fn publish(&self, topic: Topic, payload: Vec<u8>) -> impl Future<Output = Result<(), BrokerError>> + Send {
        let messages = Arc::clone(&self.messages);
        async move {
            let value = serde_json::from_slice(&payload)
                .map_err(|e| BrokerError::PublishFailed { topic: topic.to_string(), reason: e.to_string() })?;
            messages.lock().unwrap().push((topic, value));
            Ok(())
        }
    }
}

//--------------------------------------   RecordingPusher   ---------------------------------------------------------
#[derive(Clone, Default)]
pub struct RecordingPusher {
    sent: Arc<Mutex<Vec<PushNotification>>>,
    fail: bool,
}

impl RecordingPusher {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn sent(&self) -> Vec<PushNotification> {
        self.sent.lock().unwrap().clone()
    }
}

impl PushNotifier for RecordingPusher {
    async fn push(&self, notification: &PushNotification) -> Result<(), PushError> {
        if self.fail {
            return Err(PushError::DeliveryFailed("push service unavailable".into()));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

//--------------------------------------    MemoryStorage    ---------------------------------------------------------
#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    deleted: Arc<Mutex<Vec<String>>>,
    fail_prefix: Option<String>,
}

impl MemoryStorage {
    /// Uploads of objects whose name starts with `prefix` fail.
    pub fn failing_on(prefix: &str) -> Self {
        Self { fail_prefix: Some(prefix.to_string()), ..Default::default() }
    }

    /// A view of the same bucket whose uploads of objects starting with `prefix` fail.
    pub fn sharing_bucket_failing_on(&self, prefix: &str) -> Self {
        Self { fail_prefix: Some(prefix.to_string()), ..self.clone() }
    }

    pub fn object_names(&self) -> Vec<String> {
        let mut names = self.objects.lock().unwrap().keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

impl DocumentStorage for MemoryStorage {
    async fn upload(&self, name: &str, content: Vec<u8>) -> Result<(), StorageError> {
        if self.fail_prefix.as_deref().is_some_and(|p| name.starts_with(&format!("{p}_"))) {
            return Err(StorageError::UploadFailed { name: name.to_string(), reason: "bucket unavailable".into() });
        }
        self.objects.lock().unwrap().insert(name.to_string(), content);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().remove(name);
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

/// Builds a notification fan-out wired to the given broker and pusher. The returned handlers must be started.
pub fn recording_fanout(
    broker: RecordingBroker,
    pusher: RecordingPusher,
) -> (NotificationFanout<RecordingPusher>, EventHandlers) {
    let metrics = Arc::new(FanoutMetrics::default());
    let mut hooks = EventHooks::default();
    hooks.on_broker_event(broker_delivery_hook(broker, RetryPolicy::new(2, Duration::from_millis(1)), metrics.clone()));
    let handlers = EventHandlers::new(16, hooks);
    (NotificationFanout::new(pusher, handlers.producers(), metrics), handlers)
}
