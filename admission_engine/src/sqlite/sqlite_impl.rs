//! `SqliteDatabase` is a concrete implementation of an admission engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the store traits defined in the [`traits`]
//! module.
//!
//! [`traits`]: crate::traits
use std::fmt::Debug;

use chrono::NaiveDateTime;
use log::*;
use sqlx::SqlitePool;

use super::db::{carts, catalog, db_url, is_unique_violation, new_pool, progresses, submissions, transactions};
use crate::{
    db_types::{
        Cart,
        CartType,
        CartWithSchool,
        Invoice,
        NewSubmission,
        NewTransaction,
        Progress,
        ProgressStatus,
        School,
        SchoolPayment,
        Submission,
        Transaction,
        TransactionStatus,
        UserProfile,
    },
    traits::{AdmissionManagement, CatalogLookup, StoreError, TransactionManagement},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl AdmissionManagement for SqliteDatabase {
    async fn fetch_progress(&self, id: i64) -> Result<Option<Progress>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(progresses::fetch_progress(id, &mut conn).await?)
    }

    async fn fetch_progresses_for_user(&self, user_id: i64) -> Result<Vec<Progress>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(progresses::fetch_progresses_for_user(user_id, &mut conn).await?)
    }

    /// In a single atomic transaction,
    /// * updates the status of the progress row, if it is still in progress,
    /// * replaces the participant's open cart with one of type `open_cart`, if given.
    async fn advance_progress(
        &self,
        id: i64,
        status: ProgressStatus,
        open_cart: Option<CartType>,
    ) -> Result<Progress, StoreError> {
        let mut tx = self.pool.begin().await?;
        let progress =
            progresses::update_status_by_id(id, status, &mut tx).await?.ok_or(StoreError::ProgressNotFound(id))?;
        if let Some(cart_type) = open_cart {
            let cart = carts::open_cart(progress.user_id, progress.school_id, cart_type, &mut tx).await?;
            debug!("🗃️ Cart #{} ({cart_type}) opened for progress #{id}", cart.id);
        }
        tx.commit().await?;
        Ok(progress)
    }

    async fn advance_progress_for_participant(
        &self,
        user_id: i64,
        school_id: i64,
        status: ProgressStatus,
        open_cart: Option<CartType>,
    ) -> Result<Progress, StoreError> {
        let mut tx = self.pool.begin().await?;
        let progress = progresses::update_status_for_participant(user_id, school_id, status, &mut tx)
            .await?
            .ok_or(StoreError::ActiveProgressNotFound { user_id, school_id })?;
        if let Some(cart_type) = open_cart {
            let cart = carts::open_cart(user_id, school_id, cart_type, &mut tx).await?;
            debug!("🗃️ Cart #{} ({cart_type}) opened for progress #{}", cart.id, progress.id);
        }
        tx.commit().await?;
        Ok(progress)
    }

    async fn insert_submission(&self, submission: NewSubmission) -> Result<(Submission, Progress), StoreError> {
        let (user_id, school_id) = (submission.user_id, submission.school_id);
        let mut tx = self.pool.begin().await?;
        let submission = submissions::insert_submission(submission, &mut tx).await?;
        let progress = progresses::insert_progress(user_id, school_id, ProgressStatus::Submitted, &mut tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::ApplicationInProgress { user_id, school_id }
                } else {
                    StoreError::from(e)
                }
            })?;
        tx.commit().await?;
        debug!("🗃️ Submission #{} and progress #{} saved", submission.id, progress.id);
        Ok((submission, progress))
    }

    async fn fetch_submission(&self, id: i64) -> Result<Option<Submission>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(submissions::fetch_submission(id, &mut conn).await?)
    }
}

impl TransactionManagement for SqliteDatabase {
    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<Transaction, StoreError> {
        let mut tx = self.pool.begin().await?;
        let transaction = transactions::insert_transaction(transaction, &mut tx).await?;
        tx.commit().await?;
        Ok(transaction)
    }

    async fn record_charge(
        &self,
        invoice: &Invoice,
        payment_code: &str,
        expire_at: NaiveDateTime,
    ) -> Result<Transaction, StoreError> {
        let mut conn = self.pool.acquire().await?;
        transactions::record_charge(invoice, payment_code, expire_at, &mut conn).await
    }

    async fn discard_transaction(&self, invoice: &Invoice) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let deleted = transactions::delete_uncharged(invoice, &mut tx).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn fetch_transaction(&self, invoice: &Invoice) -> Result<Option<Transaction>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_transaction(invoice, &mut conn).await?)
    }

    async fn fetch_pending_transaction(
        &self,
        user_id: i64,
        school_id: i64,
    ) -> Result<Option<Transaction>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_pending_transaction(user_id, school_id, &mut conn).await?)
    }

    async fn settle_transaction(&self, invoice: &Invoice, status: TransactionStatus) -> Result<Transaction, StoreError> {
        if !TransactionStatus::Pending.can_transition_to(status) {
            return Err(StoreError::IllegalStatusChange(format!("Transactions cannot be settled as {status}")));
        }
        let mut tx = self.pool.begin().await?;
        let transaction = transactions::settle_transaction(invoice, status, &mut tx).await?;
        tx.commit().await?;
        Ok(transaction)
    }

    async fn fetch_cart(&self, user_id: i64, school_id: i64) -> Result<Option<Cart>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(carts::fetch_cart(user_id, school_id, &mut conn).await?)
    }

    async fn fetch_carts_for_user(&self, user_id: i64) -> Result<Vec<CartWithSchool>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(carts::fetch_carts_for_user(user_id, &mut conn).await?)
    }

    async fn close_cart(&self, user_id: i64, school_id: i64) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let closed = carts::close_cart(user_id, school_id, &mut conn).await?;
        if closed {
            debug!("🗃️ Cart for user {user_id} at school {school_id} closed");
        }
        Ok(closed)
    }
}

impl CatalogLookup for SqliteDatabase {
    async fn fetch_school(&self, school_id: i64) -> Result<Option<School>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_school(school_id, &mut conn).await?)
    }

    async fn fetch_school_payments(&self, school_id: i64) -> Result<Vec<SchoolPayment>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_school_payments(school_id, &mut conn).await?)
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<UserProfile>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_user(user_id, &mut conn).await?)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the `EDU_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }
}
