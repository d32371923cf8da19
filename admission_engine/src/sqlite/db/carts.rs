use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{Cart, CartType, CartWithSchool};

/// Opens a cart of the given type for the participant, closing any cart that is already open. This is not atomic;
/// run it inside a transaction.
pub async fn open_cart(
    user_id: i64,
    school_id: i64,
    cart_type: CartType,
    conn: &mut SqliteConnection,
) -> Result<Cart, sqlx::Error> {
    if close_cart(user_id, school_id, conn).await? {
        trace!("🗃️ Replacing the open cart for user {user_id} at school {school_id}");
    }
    let cart = sqlx::query_as(
        r#"
            INSERT INTO carts (user_id, school_id, cart_type)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(school_id)
    .bind(cart_type.as_str())
    .fetch_one(conn)
    .await?;
    Ok(cart)
}

/// Soft-deletes the participant's open cart. Returns `false` if there was none.
pub async fn close_cart(user_id: i64, school_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE carts SET deleted_at = CURRENT_TIMESTAMP WHERE user_id = $1 AND school_id = $2 AND deleted_at IS NULL",
    )
    .bind(user_id)
    .bind(school_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_cart(user_id: i64, school_id: i64, conn: &mut SqliteConnection) -> Result<Option<Cart>, sqlx::Error> {
    let cart = sqlx::query_as("SELECT * FROM carts WHERE user_id = $1 AND school_id = $2 AND deleted_at IS NULL")
        .bind(user_id)
        .bind(school_id)
        .fetch_optional(conn)
        .await?;
    Ok(cart)
}

pub async fn fetch_carts_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartWithSchool>, sqlx::Error> {
    let carts = sqlx::query_as(
        r#"
            SELECT carts.school_id, schools.name AS school_name, schools.image AS school_image, carts.cart_type
            FROM carts JOIN schools ON schools.id = carts.school_id
            WHERE carts.user_id = $1 AND carts.deleted_at IS NULL
            ORDER BY carts.id
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(carts)
}
