use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{Progress, ProgressStatus};

/// The guard that keeps terminal and soft-deleted rows out of every update.
const ACTIVE: &str = "deleted_at IS NULL AND status NOT IN ('Finish', 'Failed', 'failed')";

/// Inserts a new progress row. Fails with a unique violation if the participant already has one in progress.
pub async fn insert_progress(
    user_id: i64,
    school_id: i64,
    status: ProgressStatus,
    conn: &mut SqliteConnection,
) -> Result<Progress, sqlx::Error> {
    let progress = sqlx::query_as(
        r#"
            INSERT INTO progresses (user_id, school_id, status)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(school_id)
    .bind(status.as_str())
    .fetch_one(conn)
    .await?;
    Ok(progress)
}

pub async fn fetch_progress(id: i64, conn: &mut SqliteConnection) -> Result<Option<Progress>, sqlx::Error> {
    let progress = sqlx::query_as("SELECT * FROM progresses WHERE id = $1 AND deleted_at IS NULL")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(progress)
}

/// All visible progress rows for the user, oldest first.
pub async fn fetch_progresses_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Progress>, sqlx::Error> {
    let progresses = sqlx::query_as("SELECT * FROM progresses WHERE user_id = $1 AND deleted_at IS NULL ORDER BY id")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(progresses)
}

/// Sets the status of the progress row with the given id, unless it is terminal or deleted. Returns `None` if no row
/// was updated.
pub async fn update_status_by_id(
    id: i64,
    status: ProgressStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Progress>, sqlx::Error> {
    let sql = format!(
        "UPDATE progresses SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND {ACTIVE} RETURNING *;"
    );
    let progress = sqlx::query_as(&sql).bind(status.as_str()).bind(id).fetch_optional(conn).await?;
    trace!("🗃️ Progress #{id} status update to '{status}': {}", if progress.is_some() { "ok" } else { "no match" });
    Ok(progress)
}

/// Sets the status of the participant's application in progress. Returns `None` if there is none.
pub async fn update_status_for_participant(
    user_id: i64,
    school_id: i64,
    status: ProgressStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Progress>, sqlx::Error> {
    let sql = format!(
        "UPDATE progresses SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE user_id = $2 AND school_id = $3 AND \
         {ACTIVE} RETURNING *;"
    );
    let progress =
        sqlx::query_as(&sql).bind(status.as_str()).bind(user_id).bind(school_id).fetch_optional(conn).await?;
    Ok(progress)
}
