//! Admission Engine
//!
//! The admission engine tracks school applications from submission to enrolment, and the payments that move them
//! along. It is provider-agnostic: the payment gateway, message broker, push channel and document storage are all
//! reached through the collaborator traits in [`mod@traits`].
//!
//! The library is divided into these sections:
//! 1. Storage ([`mod@traits`] and the SQLite backend). You should never need to touch the database directly; use the
//!    public API instead. The data types stored in the database live in [`mod@db_types`] and are public.
//! 2. The public API ([`mod@api`]). The [`ProgressCoordinator`], [`TransactionProcessor`], [`WebhookReconciler`] and
//!    [`SubmissionApi`] orchestrate the admission and payment flows.
//! 3. Notifications ([`mod@events`] and [`mod@notifications`]). State changes emit events onto a simple channel, and
//!    broker messages are delivered from there with retries, without holding up the request that caused them.
pub mod api;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod notifications;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    AdmissionError,
    PaymentNotification,
    ProgressCoordinator,
    SubmissionApi,
    TransactionProcessor,
    WebhookReconciler,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::AdmissionStore;
