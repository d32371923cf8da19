use admission_engine::{
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
use chrono::NaiveDateTime;
use mockall::mock;

mock! {
    pub Store {}
    impl AdmissionManagement for Store {
        async fn fetch_progress(&self, id: i64) -> Result<Option<Progress>, StoreError>;
        async fn fetch_progresses_for_user(&self, user_id: i64) -> Result<Vec<Progress>, StoreError>;
        async fn advance_progress(&self, id: i64, status: ProgressStatus, open_cart: Option<CartType>) -> Result<Progress, StoreError>;
        async fn advance_progress_for_participant(&self, user_id: i64, school_id: i64, status: ProgressStatus, open_cart: Option<CartType>) -> Result<Progress, StoreError>;
        async fn insert_submission(&self, submission: NewSubmission) -> Result<(Submission, Progress), StoreError>;
        async fn fetch_submission(&self, id: i64) -> Result<Option<Submission>, StoreError>;
    }
    impl TransactionManagement for Store {
        async fn insert_transaction(&self, transaction: NewTransaction) -> Result<Transaction, StoreError>;
        async fn record_charge(&self, invoice: &Invoice, payment_code: &str, expire_at: NaiveDateTime) -> Result<Transaction, StoreError>;
        async fn discard_transaction(&self, invoice: &Invoice) -> Result<bool, StoreError>;
        async fn fetch_transaction(&self, invoice: &Invoice) -> Result<Option<Transaction>, StoreError>;
        async fn fetch_pending_transaction(&self, user_id: i64, school_id: i64) -> Result<Option<Transaction>, StoreError>;
        async fn settle_transaction(&self, invoice: &Invoice, status: TransactionStatus) -> Result<Transaction, StoreError>;
        async fn fetch_cart(&self, user_id: i64, school_id: i64) -> Result<Option<Cart>, StoreError>;
        async fn fetch_carts_for_user(&self, user_id: i64) -> Result<Vec<CartWithSchool>, StoreError>;
        async fn close_cart(&self, user_id: i64, school_id: i64) -> Result<bool, StoreError>;
    }
    impl CatalogLookup for Store {
        async fn fetch_school(&self, school_id: i64) -> Result<Option<School>, StoreError>;
        async fn fetch_school_payments(&self, school_id: i64) -> Result<Vec<SchoolPayment>, StoreError>;
        async fn fetch_user(&self, user_id: i64) -> Result<Option<UserProfile>, StoreError>;
    }
}
