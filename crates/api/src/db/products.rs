//! Product repository and the `PostgreSQL` product catalog.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use tanam_core::ProductId;

use super::RepositoryError;
use crate::models::{NewProduct, Product};
use crate::services::catalog::{ProductCatalog, ProductFilter};

const PRODUCT_COLUMNS: &str =
    "id, name, category, price, quantity, state, description, seller_id, image_url";

/// Repository for product writes.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a product listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, product: &NewProduct) -> Result<ProductId, RepositoryError> {
        let id = sqlx::query_scalar::<_, ProductId>(
            r"
            INSERT INTO products
                (name, category, price, quantity, state, description, seller_id, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            ",
        )
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.quantity)
        .bind(&product.state)
        .bind(&product.description)
        .bind(product.seller_id)
        .bind(&product.image_url)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Get a product by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }
}

/// [`ProductCatalog`] backed by the `products` table.
#[derive(Debug, Clone)]
pub struct PgProductCatalog {
    pool: PgPool,
}

impl PgProductCatalog {
    /// Create a catalog over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append the `WHERE` clause for `filter`.
///
/// The seller id is compared as text so a non-numeric id from the client
/// matches nothing instead of failing the cast.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    match filter {
        ProductFilter::Seller(seller) => {
            builder.push(" WHERE seller_id::text = ").push_bind(seller.clone());
        }
        ProductFilter::NameContains(text) => {
            builder.push(" WHERE name LIKE ").push_bind(format!("%{text}%"));
        }
        ProductFilter::CategoryContains(text) => {
            builder.push(" WHERE category LIKE ").push_bind(format!("%{text}%"));
        }
        ProductFilter::All => {}
    }
}

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn count(&self, filter: &ProductFilter) -> Result<i64, RepositoryError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_filter(&mut builder, filter);

        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn page(
        &self,
        filter: &ProductFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut builder = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(filter: &ProductFilter) -> String {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_filter(&mut builder, filter);
        builder.sql().to_owned()
    }

    #[test]
    fn test_filter_sql() {
        assert_eq!(
            rendered(&ProductFilter::Seller("4".to_owned())),
            "SELECT COUNT(*) FROM products WHERE seller_id::text = $1"
        );
        assert_eq!(
            rendered(&ProductFilter::NameContains("rice".to_owned())),
            "SELECT COUNT(*) FROM products WHERE name LIKE $1"
        );
        assert_eq!(
            rendered(&ProductFilter::CategoryContains("Seeds".to_owned())),
            "SELECT COUNT(*) FROM products WHERE category LIKE $1"
        );
        assert_eq!(rendered(&ProductFilter::All), "SELECT COUNT(*) FROM products");
    }
}
