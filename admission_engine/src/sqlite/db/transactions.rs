use chrono::NaiveDateTime;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{Invoice, NewTransaction, Transaction, TransactionItem, TransactionStatus},
    sqlite::db::is_unique_violation,
    traits::StoreError,
};

/// Inserts the transaction and its items. This is not atomic; run it inside a transaction.
pub async fn insert_transaction(tx: NewTransaction, conn: &mut SqliteConnection) -> Result<Transaction, StoreError> {
    let invoice = tx.invoice.clone();
    let transaction: Transaction = sqlx::query_as(
        r#"
            INSERT INTO transactions (invoice, user_id, school_id, total, payment_code, payment_method, expire_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(tx.invoice.as_str())
    .bind(tx.user_id)
    .bind(tx.school_id)
    .bind(tx.total.value())
    .bind(tx.payment_code)
    .bind(tx.payment_method)
    .bind(tx.expire_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| insert_error(e, &invoice, tx.user_id, tx.school_id))?;
    let mut items = Vec::with_capacity(tx.items.len());
    for item in tx.items {
        let item: TransactionItem = sqlx::query_as(
            "INSERT INTO transaction_items (invoice, item_name, item_price) VALUES ($1, $2, $3) RETURNING *;",
        )
        .bind(invoice.as_str())
        .bind(item.item_name)
        .bind(item.item_price.value())
        .fetch_one(&mut *conn)
        .await?;
        items.push(item);
    }
    debug!("🗃️ Transaction {invoice} saved with {} items", items.len());
    Ok(transaction.with_items(items))
}

fn insert_error(e: sqlx::Error, invoice: &Invoice, user_id: i64, school_id: i64) -> StoreError {
    if !is_unique_violation(&e) {
        return e.into();
    }
    let on_invoice = e.as_database_error().is_some_and(|d| d.message().contains("transactions.invoice"));
    if on_invoice {
        StoreError::InvoiceAlreadyExists(invoice.clone())
    } else {
        StoreError::PendingTransactionExists { user_id, school_id }
    }
}

/// Sets the payment code and expiry of a `pending` transaction.
pub async fn record_charge(
    invoice: &Invoice,
    payment_code: &str,
    expire_at: NaiveDateTime,
    conn: &mut SqliteConnection,
) -> Result<Transaction, StoreError> {
    let updated: Option<Transaction> = sqlx::query_as(
        r#"
            UPDATE transactions SET payment_code = $1, expire_at = $2, updated_at = CURRENT_TIMESTAMP
            WHERE invoice = $3 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(payment_code)
    .bind(expire_at)
    .bind(invoice.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(tx) => {
            let items = fetch_items(invoice, conn).await?;
            Ok(tx.with_items(items))
        },
        None => Err(StoreError::TransactionNotFound(invoice.clone())),
    }
}

/// Deletes a `pending` transaction that has no payment code yet, and its items. This is not atomic; run it inside a
/// transaction.
pub async fn delete_uncharged(invoice: &Invoice, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let found: Option<String> = sqlx::query_scalar(
        "SELECT invoice FROM transactions WHERE invoice = $1 AND status = 'pending' AND payment_code = ''",
    )
    .bind(invoice.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    if found.is_none() {
        return Ok(false);
    }
    sqlx::query("DELETE FROM transaction_items WHERE invoice = $1").bind(invoice.as_str()).execute(&mut *conn).await?;
    sqlx::query("DELETE FROM transactions WHERE invoice = $1").bind(invoice.as_str()).execute(&mut *conn).await?;
    trace!("🗃️ Uncharged transaction {invoice} deleted");
    Ok(true)
}

pub async fn fetch_items(invoice: &Invoice, conn: &mut SqliteConnection) -> Result<Vec<TransactionItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM transaction_items WHERE invoice = $1 ORDER BY id")
        .bind(invoice.as_str())
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Fetches the transaction and its items.
pub async fn fetch_transaction(
    invoice: &Invoice,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    let tx: Option<Transaction> = sqlx::query_as("SELECT * FROM transactions WHERE invoice = $1")
        .bind(invoice.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    match tx {
        Some(tx) => {
            let items = fetch_items(&tx.invoice, conn).await?;
            Ok(Some(tx.with_items(items)))
        },
        None => Ok(None),
    }
}

/// The participant's most recent `pending` transaction, with its items.
pub async fn fetch_pending_transaction(
    user_id: i64,
    school_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    let tx: Option<Transaction> = sqlx::query_as(
        r#"
            SELECT * FROM transactions
            WHERE user_id = $1 AND school_id = $2 AND status = 'pending'
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(school_id)
    .fetch_optional(&mut *conn)
    .await?;
    match tx {
        Some(tx) => {
            let items = fetch_items(&tx.invoice, conn).await?;
            Ok(Some(tx.with_items(items)))
        },
        None => Ok(None),
    }
}

/// Moves a `pending` transaction to `status`. Settled transactions are never touched.
pub async fn settle_transaction(
    invoice: &Invoice,
    status: TransactionStatus,
    conn: &mut SqliteConnection,
) -> Result<Transaction, StoreError> {
    let updated: Option<Transaction> = sqlx::query_as(
        r#"
            UPDATE transactions SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE invoice = $2 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(status.as_str())
    .bind(invoice.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(tx) = updated {
        trace!("🗃️ Transaction {invoice} settled as {status}");
        let items = fetch_items(invoice, conn).await?;
        return Ok(tx.with_items(items));
    }
    match fetch_transaction(invoice, conn).await? {
        Some(tx) => Err(StoreError::IllegalStatusChange(format!(
            "Transaction {invoice} is already {} and cannot become {status}",
            tx.status
        ))),
        None => Err(StoreError::TransactionNotFound(invoice.clone())),
    }
}
