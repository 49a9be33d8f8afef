//! Cart repository.

use sqlx::PgPool;

use tanam_core::{Price, ProductId, UserId};

use super::RepositoryError;
use crate::models::CartItem;

/// A cart line to insert or overwrite.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub buyer_id: UserId,
    pub product_id: ProductId,
    pub seller_id: UserId,
    pub quantity: i32,
    pub price: Price,
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a cart line, or overwrite quantity and price if the buyer
    /// already has this product in their cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails, including a
    /// foreign key violation for an unknown buyer or product.
    pub async fn upsert(&self, line: &CartLine) -> Result<CartItem, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(
            r"
            INSERT INTO cart (buyer_id, product_id, seller_id, quantity, price)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (buyer_id, product_id)
            DO UPDATE SET quantity = EXCLUDED.quantity,
                          price = EXCLUDED.price,
                          updated_at = NOW()
            RETURNING id, buyer_id, product_id, seller_id, quantity, price
            ",
        )
        .bind(line.buyer_id)
        .bind(line.product_id)
        .bind(line.seller_id)
        .bind(line.quantity)
        .bind(line.price)
        .fetch_one(self.pool)
        .await?;

        Ok(item)
    }
}
