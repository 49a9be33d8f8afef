//! Cart domain types.

use serde::Serialize;

use tanam_core::{CartItemId, Price, ProductId, UserId};

/// One product line in a buyer's cart. Unique per (buyer, product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CartItem {
    #[serde(rename = "cart_id")]
    pub id: CartItemId,
    pub buyer_id: UserId,
    pub product_id: ProductId,
    pub seller_id: UserId,
    #[serde(rename = "cart_quantity")]
    pub quantity: i32,
    #[serde(rename = "cart_price")]
    pub price: Price,
}
