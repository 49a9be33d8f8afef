//! Product domain types.

use serde::{Deserialize, Serialize};

use tanam_core::{Price, ProductId, UserId};

/// A product listing as stored and as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    #[serde(rename = "product_id")]
    pub id: ProductId,
    #[serde(rename = "product_name")]
    pub name: String,
    #[serde(rename = "product_category")]
    pub category: String,
    /// Serialized as a decimal string.
    #[serde(rename = "product_price")]
    pub price: Price,
    #[serde(rename = "product_quantity")]
    pub quantity: i32,
    /// Free-form condition label, e.g. "new" or "used".
    #[serde(rename = "product_state")]
    pub state: String,
    #[serde(rename = "product_description")]
    pub description: String,
    pub seller_id: UserId,
    #[serde(rename = "product_image_url")]
    pub image_url: String,
}

/// A validated product ready to insert.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price: Price,
    pub quantity: i32,
    pub state: String,
    pub description: String,
    pub seller_id: UserId,
    pub image_url: String,
}
