use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CartItem, ProductId},
    traits::LedgerError,
};

pub async fn items_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT user_id, product_id, quantity FROM cart_items WHERE user_id = $1 ORDER BY created_at ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub(crate) async fn upsert_item(
    user_id: &str,
    product_id: &ProductId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
            INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id) DO UPDATE SET
                quantity = excluded.quantity,
                updated_at = CURRENT_TIMESTAMP;
        "#,
    )
    .bind(user_id)
    .bind(product_id.as_str())
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(())
}

/// Removes every cart line for the user, returning the number of lines consumed.
pub(crate) async fn clear_cart(user_id: &str, conn: &mut SqliteConnection) -> Result<u64, LedgerError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(conn).await?;
    trace!("🗃️ Cleared {} cart lines for user {user_id}", result.rows_affected());
    Ok(result.rows_affected())
}
