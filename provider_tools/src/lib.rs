//! Clients for the third-party services the admission server talks to. Each one implements the matching collaborator
//! trait from `admission_engine::traits`.
mod config;
mod error;
mod gcs;
mod helpers;
mod midtrans;
mod nsq;
mod push;

pub use config::{MidtransConfig, NsqConfig, ProviderConfig, PushConfig, StorageConfig};
pub use error::ProviderApiError;
pub use gcs::GcsStorage;
pub use helpers::{hex_digest, hmac_sha256_base64};
pub use midtrans::{notification_signature, ChargeMethod, MidtransClient};
pub use nsq::NsqPublisher;
pub use push::PushClient;
