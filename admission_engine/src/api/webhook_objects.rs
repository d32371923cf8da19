use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db_types::{Invoice, TransactionStatus};

/// The payment provider's HTTP notification for a charge.
///
/// Only `order_id` and `transaction_status` drive reconciliation. The remaining fields are logged, and
/// `status_code`, `gross_amount` and `signature_key` feed signature verification when it is enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNotification {
    #[serde(default)]
    pub status_code: String,
    pub order_id: String,
    #[serde(default)]
    pub transaction_time: String,
    pub transaction_status: String,
    #[serde(default)]
    pub fraud_status: String,
    #[serde(default)]
    pub payment_type: String,
    #[serde(default)]
    pub gross_amount: String,
    #[serde(default)]
    pub signature_key: Option<String>,
}

impl PaymentNotification {
    pub fn invoice(&self) -> Invoice {
        Invoice::new(self.order_id.trim())
    }

    /// The transaction status this notification asks for. `settlement` means paid, `expire` means cancelled, and
    /// every other provider status is informational.
    pub fn target_status(&self) -> Option<TransactionStatus> {
        match self.transaction_status.trim().to_lowercase().as_str() {
            "settlement" => Some(TransactionStatus::Paid),
            "expire" => Some(TransactionStatus::Cancel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "detail")]
pub enum ReconciliationAction {
    /// The transaction was settled as paid and the cascade ran.
    Paid,
    /// The transaction was cancelled and the cascade ran.
    Cancelled,
    /// The transaction had already been settled with the requested status. Only idempotent clean-up ran.
    Replayed(TransactionStatus),
    /// Nothing was changed.
    Ignored(String),
    /// The notification failed verification or referenced an unknown invoice.
    Rejected(String),
}

/// What happened to a payment notification. Sub-step failures are collected in `issues` rather than returned, since
/// the provider only cares that the notification was received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub invoice: Invoice,
    #[serde(flatten)]
    pub action: ReconciliationAction,
    pub issues: Vec<String>,
}

impl ReconciliationReport {
    pub fn new(invoice: Invoice, action: ReconciliationAction) -> Self {
        Self { invoice, action, issues: Vec::new() }
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub(crate) fn issue<S: Into<String>>(&mut self, issue: S) {
        self.issues.push(issue.into());
    }
}

impl Display for ReconciliationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:?}", self.invoice, self.action)?;
        if !self.issues.is_empty() {
            write!(f, " with {} issue(s): {}", self.issues.len(), self.issues.join("; "))?;
        }
        Ok(())
    }
}
