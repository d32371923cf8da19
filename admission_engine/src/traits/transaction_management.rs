use chrono::NaiveDateTime;

use crate::{
    db_types::{Cart, CartWithSchool, Invoice, NewTransaction, Transaction, TransactionStatus},
    traits::StoreError,
};

/// Persistence for checkout transactions, their line items, and the carts that precede them.
#[allow(async_fn_in_trait)]
pub trait TransactionManagement {
    /// Stores the transaction (as `pending`) and all of its items in one write.
    ///
    /// Fails with [`StoreError::InvoiceAlreadyExists`] if the invoice is taken and
    /// [`StoreError::PendingTransactionExists`] if the participant already has a pending transaction.
    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<Transaction, StoreError>;

    /// Records the gateway's payment code and expiry on a `pending` transaction.
    async fn record_charge(
        &self,
        invoice: &Invoice,
        payment_code: &str,
        expire_at: NaiveDateTime,
    ) -> Result<Transaction, StoreError>;

    /// Deletes a `pending` transaction that was never charged, with its items. Returns `false` if there was none.
    async fn discard_transaction(&self, invoice: &Invoice) -> Result<bool, StoreError>;

    /// Fetches the transaction, with its items, for the given invoice.
    async fn fetch_transaction(&self, invoice: &Invoice) -> Result<Option<Transaction>, StoreError>;

    /// The participant's most recent transaction that is still `pending`, with its items.
    async fn fetch_pending_transaction(
        &self,
        user_id: i64,
        school_id: i64,
    ) -> Result<Option<Transaction>, StoreError>;

    /// Moves a `pending` transaction to `status`.
    ///
    /// Fails with [`StoreError::TransactionNotFound`] if the invoice is unknown and
    /// [`StoreError::IllegalStatusChange`] if the transaction has already settled.
    async fn settle_transaction(&self, invoice: &Invoice, status: TransactionStatus) -> Result<Transaction, StoreError>;

    async fn fetch_cart(&self, user_id: i64, school_id: i64) -> Result<Option<Cart>, StoreError>;

    async fn fetch_carts_for_user(&self, user_id: i64) -> Result<Vec<CartWithSchool>, StoreError>;

    /// Soft-deletes the participant's open cart. Returns `false` if there was none.
    async fn close_cart(&self, user_id: i64, school_id: i64) -> Result<bool, StoreError>;
}
