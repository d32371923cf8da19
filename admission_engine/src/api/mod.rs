//! # Admission engine public API
//!
//! The orchestration layer. Each API is created by handing it the backends and collaborators it needs, and never
//! talks to anything else.
//!
//! * [`ProgressCoordinator`] moves applications through the admission stages and runs their side effects.
//! * [`TransactionProcessor`] turns open carts into gateway charges.
//! * [`WebhookReconciler`] applies payment provider notifications and cascades them to carts and progress.
//! * [`SubmissionApi`] accepts admission forms and opens applications.
//!
//! Every failure leaves this layer as one of the three [`AdmissionError`] kinds.
//!
//! ```rust,ignore
//! use admission_engine::{ProgressCoordinator, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let coordinator = ProgressCoordinator::new(db, fanout);
//! let progress = coordinator.advance(42, "File Approved").await?;
//! ```
mod errors;
mod progress_api;
mod submission_api;
mod transaction_api;
mod webhook_api;

pub mod submission_objects;
pub mod transaction_objects;
pub mod webhook_objects;

pub use errors::AdmissionError;
pub use progress_api::ProgressCoordinator;
pub use submission_api::{object_name, SubmissionApi};
pub use transaction_api::TransactionProcessor;
pub use webhook_api::WebhookReconciler;
pub use webhook_objects::PaymentNotification;
