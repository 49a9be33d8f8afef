//! Cart route handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use tracing::{debug, instrument};

use tanam_core::{Price, ProductId, UserId};

use crate::db::{CartLine, CartRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::response::Envelope;
use crate::state::AppState;

/// Cart update request. The mobile client sends every field as a string.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CartRequest {
    pub product_id: String,
    pub cart_quantity: String,
    pub cart_price: String,
    pub buyer_id: String,
    pub seller_id: String,
}

impl CartRequest {
    /// Validate and convert into a cart line.
    fn into_line(self) -> Result<CartLine> {
        let price: Price = self
            .cart_price
            .parse()
            .map_err(|_| AppError::BadRequest("Invalid product price".to_string()))?;
        let quantity: i32 = self
            .cart_quantity
            .trim()
            .parse()
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| AppError::BadRequest("Invalid product quantity".to_string()))?;

        let id_error = |field: &str| AppError::BadRequest(format!("Invalid {field}"));
        let product_id: ProductId = self.product_id.parse().map_err(|_| id_error("product id"))?;
        let buyer_id: UserId = self.buyer_id.parse().map_err(|_| id_error("buyer id"))?;
        let seller_id: UserId = self.seller_id.parse().map_err(|_| id_error("seller id"))?;

        Ok(CartLine {
            buyer_id,
            product_id,
            seller_id,
            quantity,
            price,
        })
    }
}

/// Add a product to the buyer's cart, or overwrite its quantity and price.
#[instrument(skip_all, fields(user = %claims.email))]
pub async fn upsert(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    body: std::result::Result<Json<CartRequest>, JsonRejection>,
) -> Result<Envelope<&'static str>> {
    let Json(body) = body.map_err(|_| AppError::BadRequest("Invalid JSON".to_string()))?;
    let line = body.into_line()?;

    let product = ProductRepository::new(state.pool())
        .get_by_id(line.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", line.product_id)))?;

    if product.seller_id != line.seller_id {
        return Err(AppError::BadRequest(
            "seller does not match product".to_string(),
        ));
    }

    let item = CartRepository::new(state.pool()).upsert(&line).await?;
    debug!(cart_id = %item.id, quantity = item.quantity, "Cart line saved");

    Ok(Envelope::success("Cart updated successfully"))
}
