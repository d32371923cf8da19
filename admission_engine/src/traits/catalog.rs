use crate::{
    db_types::{School, SchoolPayment, UserProfile},
    traits::StoreError,
};

/// Read-only access to data owned by other parts of the platform.
#[allow(async_fn_in_trait)]
pub trait CatalogLookup {
    async fn fetch_school(&self, school_id: i64) -> Result<Option<School>, StoreError>;

    /// The school's payment plans, in the order they were configured.
    async fn fetch_school_payments(&self, school_id: i64) -> Result<Vec<SchoolPayment>, StoreError>;

    async fn fetch_user(&self, user_id: i64) -> Result<Option<UserProfile>, StoreError>;
}
