use thiserror::Error;

use crate::traits::{GatewayError, StorageError, StoreError};

/// The only error kinds the orchestration layer exposes.
///
/// Store and collaborator errors are folded into one of these before they leave the API. Detail that should not
/// reach end users travels in `Internal`, and the HTTP layer is expected to log it and reply with a generic message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("{0}")]
    Validation(String),
    #[error("Data Not Found. {0}")]
    NotFound(String),
    #[error("Internal error. {0}")]
    Internal(String),
}

impl AdmissionError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<StoreError> for AdmissionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DatabaseError(_) => Self::Internal(e.to_string()),
            StoreError::ProgressNotFound(_)
            | StoreError::ActiveProgressNotFound { .. }
            | StoreError::CartNotFound { .. }
            | StoreError::TransactionNotFound(_)
            | StoreError::SubmissionNotFound(_)
            | StoreError::SchoolNotFound(_)
            | StoreError::UserNotFound(_) => Self::NotFound(e.to_string()),
            StoreError::ApplicationInProgress { .. }
            | StoreError::PendingTransactionExists { .. }
            | StoreError::IllegalStatusChange(_) => Self::Validation(e.to_string()),
            // Only reachable if every invoice retry collided; the caller can simply try again
            StoreError::InvoiceAlreadyExists(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<GatewayError> for AdmissionError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::UnsupportedMethod(_) => Self::Validation(e.to_string()),
            _ => Self::Internal(e.to_string()),
        }
    }
}

impl From<StorageError> for AdmissionError {
    fn from(e: StorageError) -> Self {
        Self::Internal(e.to_string())
    }
}
