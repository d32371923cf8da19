//! Notification fan-out.
//!
//! Two sinks are fed from here:
//! * The durable broker. Request code never waits on it: [`NotificationFanout::publish_detached`] queues a
//!   [`BrokerEvent`] on the event channel from a spawned task and returns at once. The channel's handler (built with
//!   [`broker_delivery_hook`]) delivers the message, retrying with exponential backoff up to the configured
//!   [`RetryPolicy`].
//! * The push channel. [`NotificationFanout::push`] is awaited by the caller, but failures are only logged.
//!
//! Every outcome is counted in [`FanoutMetrics`] so that lost notifications are observable.
use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use log::*;
use serde::Serialize;

use crate::{
    events::{BrokerEvent, EventProducers, PushNotification},
    traits::{MessageBroker, PushNotifier},
};

//--------------------------------------     RetryPolicy     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the first retry. Doubles on every subsequent retry.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, initial_backoff: Duration::from_millis(250) }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), initial_backoff }
    }

    /// The delay after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exp)
    }
}

//--------------------------------------    FanoutMetrics    ---------------------------------------------------------
#[derive(Debug, Default)]
pub struct FanoutMetrics {
    published: AtomicU64,
    retried: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    pushed: AtomicU64,
    push_failed: AtomicU64,
}

/// A point-in-time copy of [`FanoutMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FanoutStats {
    /// Broker messages delivered
    pub published: u64,
    /// Broker delivery attempts that failed and were retried
    pub retried: u64,
    /// Broker messages given up on after exhausting the retry policy
    pub failed: u64,
    /// Broker messages that never reached the delivery queue
    pub dropped: u64,
    /// Push notifications delivered
    pub pushed: u64,
    /// Push notifications that failed
    pub push_failed: u64,
}

impl FanoutMetrics {
    pub fn snapshot(&self) -> FanoutStats {
        FanoutStats {
            published: self.published.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            pushed: self.pushed.load(Ordering::Relaxed),
            push_failed: self.push_failed.load(Ordering::Relaxed),
        }
    }

    fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

//--------------------------------------   Broker delivery   ---------------------------------------------------------
/// Builds the event handler that delivers queued [`BrokerEvent`]s to the broker.
pub fn broker_delivery_hook<M: MessageBroker>(
    broker: M,
    policy: RetryPolicy,
    metrics: Arc<FanoutMetrics>,
) -> impl Fn(BrokerEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
    let broker = Arc::new(broker);
    move |event: BrokerEvent| {
        let broker = Arc::clone(&broker);
        let metrics = Arc::clone(&metrics);
        Box::pin(async move { deliver(broker.as_ref(), event, policy, metrics.as_ref()).await })
    }
}

async fn deliver<M: MessageBroker>(broker: &M, event: BrokerEvent, policy: RetryPolicy, metrics: &FanoutMetrics) {
    let body = event.body();
    for attempt in 1..=policy.max_attempts {
        match broker.publish(event.topic, body.clone()).await {
            Ok(()) => {
                trace!("📬️ Topic {} message delivered on attempt {attempt}", event.topic);
                FanoutMetrics::incr(&metrics.published);
                return;
            },
            Err(e) if attempt < policy.max_attempts => {
                let delay = policy.backoff_for(attempt);
                warn!("📬️ Attempt {attempt} to publish to topic {} failed. {e}. Retrying in {delay:?}", event.topic);
                FanoutMetrics::incr(&metrics.retried);
                tokio::time::sleep(delay).await;
            },
            Err(e) => {
                error!(
                    "📬️ Giving up on topic {} message after {attempt} attempts. {e}. Payload: {}",
                    event.topic, event.payload
                );
                FanoutMetrics::incr(&metrics.failed);
            },
        }
    }
}

//--------------------------------------  NotificationFanout ---------------------------------------------------------
pub struct NotificationFanout<P> {
    pusher: P,
    producers: EventProducers,
    metrics: Arc<FanoutMetrics>,
}

impl<P: Clone> Clone for NotificationFanout<P> {
    fn clone(&self) -> Self {
        Self { pusher: self.pusher.clone(), producers: self.producers.clone(), metrics: Arc::clone(&self.metrics) }
    }
}

impl<P> NotificationFanout<P> {
    pub fn new(pusher: P, producers: EventProducers, metrics: Arc<FanoutMetrics>) -> Self {
        Self { pusher, producers, metrics }
    }

    pub fn stats(&self) -> FanoutStats {
        self.metrics.snapshot()
    }

    /// Queues the event for broker delivery without waiting. Must be called from within a tokio runtime.
    pub fn publish_detached(&self, event: BrokerEvent) {
        if self.producers.broker_producer.is_empty() {
            warn!("📬️ No broker is configured. Topic {} message dropped", event.topic);
            FanoutMetrics::incr(&self.metrics.dropped);
            return;
        }
        for producer in &self.producers.broker_producer {
            let producer = producer.clone();
            let event = event.clone();
            let metrics = Arc::clone(&self.metrics);
            tokio::spawn(async move {
                if !producer.publish_event(event).await {
                    FanoutMetrics::incr(&metrics.dropped);
                }
            });
        }
    }
}

impl<P: PushNotifier> NotificationFanout<P> {
    /// Sends the push notification. Failures are logged and counted, never returned.
    pub async fn push(&self, notification: PushNotification) {
        match self.pusher.push(&notification).await {
            Ok(()) => {
                debug!("📬️ Push notification sent to {} ({:?})", notification.username, notification.kind);
                FanoutMetrics::incr(&self.metrics.pushed);
            },
            Err(e) => {
                error!("📬️ Could not push {:?} notification to {}. {e}", notification.kind, notification.username);
                FanoutMetrics::incr(&self.metrics.push_failed);
            },
        }
    }
}
