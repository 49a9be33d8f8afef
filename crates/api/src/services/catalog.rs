//! Product listing with a cache-aside page cache.
//!
//! A listing request names at most one effective filter (seller, name
//! search, or category) plus a page number. [`ProductCache::fetch`] looks the
//! page up in the key-value store first and only falls through to the
//! [`ProductCatalog`] on a miss, writing the fresh page back with a
//! three-minute TTL.
//!
//! Entries are never invalidated explicitly. A product inserted after a page
//! was cached shows up once that entry expires.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use tanam_core::Pagination;

use crate::db::RepositoryError;
use crate::kv::{KeyValueStore, KvError};
use crate::models::Product;

/// Lifetime of a cached listing page.
pub const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(3 * 60);

/// Category label the client sends for its unfiltered home feed.
pub const FOR_YOU_CATEGORY: &str = "For You";

const KEY_PREFIX: &str = "products";

// =============================================================================
// Query
// =============================================================================

/// Listing request as sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub current_page: Option<i64>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub search_key: Option<String>,
    #[serde(default)]
    pub product_category: Option<String>,
}

/// The single filter applied to a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductFilter {
    /// Products listed by this seller (exact match on the seller id).
    Seller(String),
    /// Product name contains the text.
    NameContains(String),
    /// Product category contains the text.
    CategoryContains(String),
    /// No filter.
    All,
}

impl ProductFilter {
    /// Pick the filter for `query`.
    ///
    /// Seller beats search key beats category. Empty strings count as absent,
    /// and the "For You" category means no filter at all.
    #[must_use]
    pub fn from_query(query: &ProductQuery) -> Self {
        if let Some(user_id) = non_empty(query.user_id.as_deref()) {
            return Self::Seller(user_id.to_owned());
        }
        if let Some(search) = non_empty(query.search_key.as_deref()) {
            return Self::NameContains(search.to_owned());
        }
        match non_empty(query.product_category.as_deref()) {
            Some(FOR_YOU_CATEGORY) | None => Self::All,
            Some(category) => Self::CategoryContains(category.to_owned()),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Cache key for one listing page.
///
/// Built from the raw request fields, not the resolved filter: two requests
/// that resolve to the same filter but differ in an ignored field get
/// separate entries. Each segment is percent-encoded so a `:` inside a search
/// term cannot shift the segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductCacheKey(String);

impl ProductCacheKey {
    /// Derive the key for `query`.
    #[must_use]
    pub fn new(query: &ProductQuery) -> Self {
        let page = query
            .current_page
            .map(|p| p.to_string())
            .unwrap_or_default();

        let segments = [
            query.user_id.as_deref().unwrap_or_default(),
            query.search_key.as_deref().unwrap_or_default(),
            query.product_category.as_deref().unwrap_or_default(),
            page.as_str(),
        ];

        let mut key = String::from(KEY_PREFIX);
        for segment in segments {
            key.push(':');
            key.push_str(&urlencoding::encode(segment));
        }
        Self(key)
    }

    /// The rendered key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductCacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// One page of a listing plus the page count for the whole filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

/// Source of truth for product listings.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Number of products matching `filter`.
    async fn count(&self, filter: &ProductFilter) -> Result<i64, RepositoryError>;

    /// Products matching `filter`, skipping `offset` and returning at most `limit`.
    async fn page(
        &self,
        filter: &ProductFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, RepositoryError>;
}

/// Errors from a listing fetch.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The cache could not be read. Not treated as a miss.
    #[error("product cache error: {0}")]
    Store(#[from] KvError),

    /// The catalog query failed.
    #[error("product query failed: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cache-aside front for a [`ProductCatalog`].
#[derive(Clone)]
pub struct ProductCache {
    store: Arc<dyn KeyValueStore>,
    catalog: Arc<dyn ProductCatalog>,
    ttl: Duration,
}

impl ProductCache {
    /// Create a cache with the default TTL.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self {
            store,
            catalog,
            ttl: PRODUCT_CACHE_TTL,
        }
    }

    /// Override the entry lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Fetch one listing page, from cache when possible.
    ///
    /// A cached entry that fails to parse is recomputed and overwritten. A
    /// failed cache write after a miss is logged and the fresh page is still
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Store` if the cache read fails, or
    /// `CatalogError::Repository` if the catalog query fails on a miss.
    #[instrument(skip(self), fields(key = tracing::field::Empty))]
    pub async fn fetch(&self, query: &ProductQuery) -> Result<ProductPage, CatalogError> {
        let key = ProductCacheKey::new(query);
        tracing::Span::current().record("key", key.as_str());

        if let Some(raw) = self.store.get(key.as_str()).await? {
            match serde_json::from_str::<ProductPage>(&raw) {
                Ok(page) => {
                    debug!("Product cache hit");
                    return Ok(page);
                }
                Err(e) => warn!(error = %e, "Discarding malformed product cache entry"),
            }
        }

        debug!("Product cache miss");
        let page = self.load(query).await?;
        self.store_page(&key, &page).await;
        Ok(page)
    }

    async fn load(&self, query: &ProductQuery) -> Result<ProductPage, CatalogError> {
        let filter = ProductFilter::from_query(query);
        let pagination = Pagination::new(query.current_page);

        let total = self.catalog.count(&filter).await?;
        let products = self
            .catalog
            .page(&filter, pagination.limit(), pagination.offset())
            .await?;

        Ok(ProductPage {
            products,
            total_pages: Pagination::total_pages(total),
        })
    }

    async fn store_page(&self, key: &ProductCacheKey, page: &ProductPage) {
        let payload = match serde_json::to_string(page) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to encode product page for caching");
                return;
            }
        };

        if let Err(e) = self.store.set(key.as_str(), &payload, self.ttl).await {
            warn!(error = %e, "Failed to cache product page");
        }
    }
}
