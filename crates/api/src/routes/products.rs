//! Product route handlers.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection, rejection::JsonRejection},
};
use tracing::{info, instrument};

use tanam_core::{Price, UserId};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{NewProduct, Product};
use crate::response::Envelope;
use crate::services::catalog::ProductQuery;
use crate::state::AppState;

/// Multipart field carrying the image file.
const IMAGE_FIELD: &str = "product_image";

/// Text fields every product form must fill.
const REQUIRED_FIELDS: [&str; 7] = [
    "product_name",
    "product_category",
    "product_price",
    "product_quantity",
    "product_state",
    "product_description",
    "seller_id",
];

struct UploadedImage {
    file_name: String,
    bytes: Vec<u8>,
}

/// Parsed multipart product form.
#[derive(Default)]
struct ProductForm {
    fields: HashMap<String, String>,
    image: Option<UploadedImage>,
}

impl ProductForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            if name == IMAGE_FIELD {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                form.image = Some(UploadedImage {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    fn get(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", |v| v.trim())
    }
}

/// Insert a product listing with its image.
///
/// Checks run in order: image present, price is a decimal, quantity is an
/// integer, no field empty, image has an extension. The image is written
/// before the row is inserted.
#[instrument(skip_all, fields(user = %claims.email))]
pub async fn insert_product(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Envelope<&'static str>> {
    let multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let form = ProductForm::read(multipart).await?;

    let image = form
        .image
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("Error retrieving the image file".to_string()))?;

    let price: Price = form
        .get("product_price")
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid product price".to_string()))?;
    let quantity: i32 = form
        .get("product_quantity")
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid product quantity".to_string()))?;

    if REQUIRED_FIELDS.iter().any(|name| form.get(name).is_empty()) {
        return Err(AppError::BadRequest("required field is empty".to_string()));
    }

    let seller_id: UserId = form
        .get("seller_id")
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid seller id".to_string()))?;

    let name = form.get("product_name");
    let stored = state
        .images()
        .save(name, &image.file_name, &image.bytes)
        .await?;

    let product = NewProduct {
        name: name.to_owned(),
        category: form.get("product_category").to_owned(),
        price,
        quantity,
        state: form.get("product_state").to_owned(),
        description: form.get("product_description").to_owned(),
        seller_id,
        image_url: stored.url,
    };

    let id = ProductRepository::new(state.pool()).create(&product).await?;
    info!(product_id = %id, seller_id = %seller_id, "Product inserted");

    Ok(Envelope::success("Product Inserted"))
}

/// List one page of products, served through the product cache.
#[instrument(skip(state, query))]
pub async fn get_product(
    State(state): State<AppState>,
    query: std::result::Result<Json<ProductQuery>, JsonRejection>,
) -> Result<Envelope<Vec<Product>>> {
    let Json(query) = query
        .map_err(|_| AppError::BadRequest("Failed to parse request body".to_string()))?;

    let page = state.products().fetch(&query).await?;

    Ok(Envelope::paged(page.products, page.total_pages))
}
