use sqlx::SqliteConnection;

use crate::{
    db_types::{Product, ProductId},
    traits::LedgerError,
};

pub async fn fetch_product(product_id: &ProductId, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT id, name, price, available_stock FROM products WHERE id = $1")
        .bind(product_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(product)
}

pub(crate) async fn upsert_product(product: Product, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
            INSERT INTO products (id, name, price, available_stock) VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                price = excluded.price,
                available_stock = excluded.available_stock,
                updated_at = CURRENT_TIMESTAMP;
        "#,
    )
    .bind(product.id)
    .bind(product.name)
    .bind(product.price.value())
    .bind(product.available_stock)
    .execute(conn)
    .await?;
    Ok(())
}

/// Guarded stock decrement: applies only while `available_stock >= quantity`. Returns `false` when the guard
/// failed and nothing was written.
pub(crate) async fn decrement_stock(
    product_id: &ProductId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, LedgerError> {
    let result = sqlx::query(
        "UPDATE products SET available_stock = available_stock - $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 \
         AND available_stock >= $1",
    )
    .bind(quantity)
    .bind(product_id.as_str())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
