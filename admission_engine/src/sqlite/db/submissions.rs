use sqlx::SqliteConnection;

use crate::db_types::{NewSubmission, Submission};

/// Inserts the submission. This is not atomic; the initial progress row should be written in the same transaction.
pub async fn insert_submission(s: NewSubmission, conn: &mut SqliteConnection) -> Result<Submission, sqlx::Error> {
    let submission = sqlx::query_as(
        r#"
            INSERT INTO submissions (
                user_id,
                school_id,
                student_name,
                student_photo,
                student_signature,
                place_date,
                gender,
                religion,
                graduation_from,
                nisn,
                student_address,
                parent_name,
                parent_job,
                parent_religion,
                parent_phone,
                parent_signature,
                parent_address,
                submitted_on
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *;
        "#,
    )
    .bind(s.user_id)
    .bind(s.school_id)
    .bind(s.student_name)
    .bind(s.student_photo)
    .bind(s.student_signature)
    .bind(s.place_date)
    .bind(s.gender)
    .bind(s.religion)
    .bind(s.graduation_from)
    .bind(s.nisn)
    .bind(s.student_address)
    .bind(s.parent_name)
    .bind(s.parent_job)
    .bind(s.parent_religion)
    .bind(s.parent_phone)
    .bind(s.parent_signature)
    .bind(s.parent_address)
    .bind(s.submitted_on)
    .fetch_one(conn)
    .await?;
    Ok(submission)
}

pub async fn fetch_submission(id: i64, conn: &mut SqliteConnection) -> Result<Option<Submission>, sqlx::Error> {
    let submission =
        sqlx::query_as("SELECT * FROM submissions WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(submission)
}
