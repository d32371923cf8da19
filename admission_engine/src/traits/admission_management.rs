use crate::{
    db_types::{CartType, NewSubmission, Progress, ProgressStatus, Submission},
    traits::StoreError,
};

/// Persistence for submissions and the progress rows that track each application.
///
/// Every progress mutation is guarded by the store: rows in a terminal status (`Finish`, `Failed`) are never
/// updated, and soft-deleted rows are invisible.
#[allow(async_fn_in_trait)]
pub trait AdmissionManagement {
    async fn fetch_progress(&self, id: i64) -> Result<Option<Progress>, StoreError>;

    async fn fetch_progresses_for_user(&self, user_id: i64) -> Result<Vec<Progress>, StoreError>;

    /// Moves the non-terminal progress with the given id to `status`.
    ///
    /// When `open_cart` is given, any open cart for the same participant is replaced by a new cart of that type in
    /// the same database transaction as the status write.
    ///
    /// Fails with [`StoreError::ProgressNotFound`] if there is no such row, or it is already terminal.
    async fn advance_progress(
        &self,
        id: i64,
        status: ProgressStatus,
        open_cart: Option<CartType>,
    ) -> Result<Progress, StoreError>;

    /// As [`Self::advance_progress`], but addresses the participant's single non-terminal progress row.
    ///
    /// Fails with [`StoreError::ActiveProgressNotFound`] if the participant has no application in progress.
    async fn advance_progress_for_participant(
        &self,
        user_id: i64,
        school_id: i64,
        status: ProgressStatus,
        open_cart: Option<CartType>,
    ) -> Result<Progress, StoreError>;

    /// Stores the submission and its initial progress row in a single transaction.
    ///
    /// Fails with [`StoreError::ApplicationInProgress`] if the participant already has a non-terminal application at
    /// this school.
    async fn insert_submission(&self, submission: NewSubmission) -> Result<(Submission, Progress), StoreError>;

    async fn fetch_submission(&self, id: i64) -> Result<Option<Submission>, StoreError>;
}
