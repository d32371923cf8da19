use chrono::NaiveDateTime;
use thiserror::Error;

use crate::db_types::{Invoice, NewTransactionItem, Rupiah};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Progress #{0} does not exist or is already finished")]
    ProgressNotFound(i64),
    #[error("User {user_id} has no application in progress at school {school_id}")]
    ActiveProgressNotFound { user_id: i64, school_id: i64 },
    #[error("User {user_id} already has an application in progress at school {school_id}")]
    ApplicationInProgress { user_id: i64, school_id: i64 },
    #[error("User {user_id} has no open cart at school {school_id}")]
    CartNotFound { user_id: i64, school_id: i64 },
    #[error("Transaction {0} does not exist")]
    TransactionNotFound(Invoice),
    #[error("Cannot insert transaction, since invoice {0} already exists")]
    InvoiceAlreadyExists(Invoice),
    #[error("User {user_id} already has a pending transaction at school {school_id}")]
    PendingTransactionExists { user_id: i64, school_id: i64 },
    #[error("Illegal transaction status change. {0}")]
    IllegalStatusChange(String),
    #[error("Submission #{0} does not exist")]
    SubmissionNotFound(i64),
    #[error("School #{0} does not exist")]
    SchoolNotFound(i64),
    #[error("User #{0} does not exist")]
    UserNotFound(i64),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

/// A request to open a charge with the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub invoice: Invoice,
    pub total: Rupiah,
    pub items: Vec<NewTransactionItem>,
    pub payment_method: String,
}

/// The provider's answer to a charge, normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeResult {
    /// What the applicant needs to pay with: a virtual account number, bill key or QR/deeplink URL.
    pub payment_code: String,
    /// When the provider recorded the charge, in the provider's local time.
    pub transaction_time: NaiveDateTime,
    /// The provider's own expiry, if it reported one.
    pub expiry: Option<NaiveDateTime>,
}
