use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    db_types::{Invoice, ProgressStatus, Rupiah},
    helpers::expiry_format,
};

//--------------------------------------        Topic        ---------------------------------------------------------
/// Durable broker topics this engine publishes to.
///
/// Topics are numbered; consumers (e.g. the mailer) subscribe by number. Numbers not listed here belong to other
/// producers on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// A checkout created a pending transaction
    CheckoutCreated,
    /// A pending transaction was settled
    PaymentConfirmed,
    /// A pending transaction expired
    PaymentCancelled,
    /// An applicant was sent their entrance test link
    TestLink,
}

impl Topic {
    pub const ALL: [Topic; 4] = [Topic::CheckoutCreated, Topic::PaymentConfirmed, Topic::PaymentCancelled, Topic::TestLink];

    pub fn number(&self) -> u8 {
        match self {
            Self::CheckoutCreated => 1,
            Self::PaymentConfirmed => 2,
            Self::PaymentCancelled => 3,
            Self::TestLink => 8,
        }
    }
}

impl Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

//--------------------------------------     BrokerEvent     ---------------------------------------------------------
/// A message bound for the durable broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEvent {
    pub topic: Topic,
    pub payload: Value,
}

impl BrokerEvent {
    pub fn new<T: Serialize>(topic: Topic, payload: &T) -> Self {
        // The payload types below only hold strings and integers, which always serialize
        let payload = serde_json::to_value(payload).unwrap_or(Value::Null);
        Self { topic, payload }
    }

    pub fn body(&self) -> Vec<u8> {
        self.payload.to_string().into_bytes()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutCreatedMessage {
    pub invoice: Invoice,
    pub total: Rupiah,
    pub name: String,
    pub email: String,
    pub payment_code: String,
    pub payment_method: String,
    #[serde(with = "expiry_format")]
    pub expire: chrono::NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResultMessage {
    pub invoice: Invoice,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestLinkMessage {
    pub email: String,
    pub name: String,
    pub school: String,
    pub test: String,
}

//--------------------------------------  PushNotification   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushKind {
    /// The outcome of a payment
    Payment,
    /// An application moved to a new stage
    Admission,
}

impl PushKind {
    /// The push event number the client listens on.
    pub fn event_number(&self) -> u8 {
        match self {
            Self::Payment => 1,
            Self::Admission => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    pub username: String,
    #[serde(rename = "type")]
    pub kind: PushKind,
    pub school_name: String,
    pub status: String,
}

impl PushNotification {
    pub fn payment_success(username: &str, school_name: &str) -> Self {
        Self::new(PushKind::Payment, username, school_name, "success")
    }

    pub fn payment_cancelled(username: &str, school_name: &str) -> Self {
        Self::new(PushKind::Payment, username, school_name, "cancel")
    }

    pub fn admission(username: &str, school_name: &str, status: ProgressStatus) -> Self {
        Self::new(PushKind::Admission, username, school_name, status.as_str())
    }

    fn new(kind: PushKind, username: &str, school_name: &str, status: &str) -> Self {
        Self { username: username.to_string(), kind, school_name: school_name.to_string(), status: status.to_string() }
    }
}
