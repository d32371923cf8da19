//! # Storage and collaborator contracts.
//!
//! This module defines the interfaces the admission engine needs from the outside world.
//!
//! ## Store traits
//! * [`AdmissionManagement`] persists submissions and drives the progress rows that track each application.
//! * [`TransactionManagement`] persists checkout transactions, their line items and the carts that precede them.
//! * [`CatalogLookup`] gives read-only access to schools, their payment plans and user profiles.
//!
//! [`SqliteDatabase`](crate::SqliteDatabase) implements all three. Anything implementing them gets
//! [`AdmissionStore`] for free.
//!
//! ## Collaborators
//! * [`PaymentGateway`] creates charges with the payment provider.
//! * [`DocumentStorage`] stores uploaded admission documents.
//! * [`MessageBroker`] delivers durable messages to downstream consumers.
//! * [`PushNotifier`] sends realtime notifications to the applicant's client.
mod admission_management;
mod catalog;
mod collaborators;
mod data_objects;
mod transaction_management;

pub use admission_management::AdmissionManagement;
pub use catalog::CatalogLookup;
pub use collaborators::{
    BrokerError,
    DocumentStorage,
    GatewayError,
    MessageBroker,
    PaymentGateway,
    PushError,
    PushNotifier,
    StorageError,
};
pub use data_objects::{ChargeRequest, ChargeResult, StoreError};
pub use transaction_management::TransactionManagement;

/// Everything the HTTP layer needs from a single backend.
pub trait AdmissionStore: AdmissionManagement + TransactionManagement + CatalogLookup {}

impl<T> AdmissionStore for T where T: AdmissionManagement + TransactionManagement + CatalogLookup {}
