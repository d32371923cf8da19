use sqlx::SqliteConnection;

use crate::db_types::{School, SchoolPayment, UserProfile};

pub async fn fetch_school(id: i64, conn: &mut SqliteConnection) -> Result<Option<School>, sqlx::Error> {
    let school = sqlx::query_as("SELECT id, name, image, quiz_link_pub FROM schools WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(school)
}

pub async fn fetch_school_payments(school_id: i64, conn: &mut SqliteConnection) -> Result<Vec<SchoolPayment>, sqlx::Error> {
    let plans = sqlx::query_as("SELECT * FROM school_payments WHERE school_id = $1 ORDER BY id")
        .bind(school_id)
        .fetch_all(conn)
        .await?;
    Ok(plans)
}

pub async fn fetch_user(id: i64, conn: &mut SqliteConnection) -> Result<Option<UserProfile>, sqlx::Error> {
    let user = sqlx::query_as("SELECT id, username, first_name, sure_name, email FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}
