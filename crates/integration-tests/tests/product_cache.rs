//! Integration tests for the cache-aside product listing.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use tanam_api::kv::{KeyValueStore, MemoryStore};
use tanam_api::services::catalog::{
    CatalogError, PRODUCT_CACHE_TTL, ProductCache, ProductCacheKey, ProductPage, ProductQuery,
};
use tanam_integration_tests::{FailingStore, FakeCatalog, product};

fn catalog() -> Arc<FakeCatalog> {
    Arc::new(FakeCatalog::new(vec![
        product(1, "Cangkul", "Tools", 7, "85000"),
        product(2, "Sabit", "Tools", 7, "45000.50"),
        product(3, "Pupuk Urea", "Fertilizer", 8, "120000"),
        product(4, "Benih Padi", "Seeds", 8, "30000"),
        product(5, "Cangkul Mini", "Tools", 9, "60000"),
        product(6, "Gembor", "Tools", 9, "25000"),
        product(7, "Selang", "Tools", 9, "40000"),
        product(8, "Pupuk Kompos", "Fertilizer", 7, "15000"),
    ]))
}

fn cache(store: &Arc<MemoryStore>, catalog: &Arc<FakeCatalog>) -> ProductCache {
    ProductCache::new(store.clone(), catalog.clone())
}

fn query(page: Option<i64>) -> ProductQuery {
    ProductQuery {
        current_page: page,
        ..ProductQuery::default()
    }
}

#[tokio::test]
async fn test_miss_then_hit() {
    let store = Arc::new(MemoryStore::new());
    let catalog = catalog();
    let cache = cache(&store, &catalog);

    let first = cache.fetch(&query(Some(1))).await.unwrap();
    let second = cache.fetch(&query(Some(1))).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.products.len(), 6);
    assert_eq!(first.total_pages, 2);
    assert_eq!(catalog.count_calls(), 1);
    assert_eq!(catalog.page_calls(), 1);
}

#[tokio::test]
async fn test_pages_are_cached_separately() {
    let store = Arc::new(MemoryStore::new());
    let catalog = catalog();
    let cache = cache(&store, &catalog);

    let first = cache.fetch(&query(Some(1))).await.unwrap();
    let second = cache.fetch(&query(Some(2))).await.unwrap();

    assert_eq!(second.products.len(), 2);
    assert_ne!(first.products, second.products);
    assert_eq!(catalog.page_calls(), 2);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_absent_page_is_its_own_key() {
    let store = Arc::new(MemoryStore::new());
    let catalog = catalog();
    let cache = cache(&store, &catalog);

    let unnumbered = cache.fetch(&query(None)).await.unwrap();
    let numbered = cache.fetch(&query(Some(1))).await.unwrap();

    // Same rows, but the request fields differ so both are computed.
    assert_eq!(unnumbered, numbered);
    assert_eq!(catalog.page_calls(), 2);
}

#[tokio::test]
async fn test_filters_resolve_by_precedence() {
    let store = Arc::new(MemoryStore::new());
    let catalog = catalog();
    let cache = cache(&store, &catalog);

    let by_seller = cache
        .fetch(&ProductQuery {
            user_id: Some("8".to_owned()),
            search_key: Some("Cangkul".to_owned()),
            ..ProductQuery::default()
        })
        .await
        .unwrap();
    assert!(by_seller.products.iter().all(|p| p.seller_id.as_i32() == 8));

    let by_name = cache
        .fetch(&ProductQuery {
            search_key: Some("Cangkul".to_owned()),
            product_category: Some("Seeds".to_owned()),
            ..ProductQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(by_name.products.len(), 2);

    let for_you = cache
        .fetch(&ProductQuery {
            product_category: Some("For You".to_owned()),
            ..ProductQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(for_you.total_pages, 2);
}

#[tokio::test]
async fn test_empty_result_is_cached() {
    let store = Arc::new(MemoryStore::new());
    let catalog = catalog();
    let cache = cache(&store, &catalog);
    let q = ProductQuery {
        search_key: Some("Traktor".to_owned()),
        ..ProductQuery::default()
    };

    let page = cache.fetch(&q).await.unwrap();
    cache.fetch(&q).await.unwrap();

    assert!(page.products.is_empty());
    assert_eq!(page.total_pages, 0);
    assert_eq!(catalog.count_calls(), 1);
}

#[tokio::test]
async fn test_preloaded_entry_is_served_verbatim() {
    let store = Arc::new(MemoryStore::new());
    let catalog = catalog();
    let cache = cache(&store, &catalog);
    let q = query(Some(1));

    let planted = ProductPage {
        products: vec![product(99, "Cached", "Tools", 1, "1")],
        total_pages: 42,
    };
    store
        .set(
            ProductCacheKey::new(&q).as_str(),
            &serde_json::to_string(&planted).unwrap(),
            PRODUCT_CACHE_TTL,
        )
        .await
        .unwrap();

    let page = cache.fetch(&q).await.unwrap();

    assert_eq!(page, planted);
    assert_eq!(catalog.count_calls(), 0);
}

#[tokio::test]
async fn test_malformed_entry_is_recomputed() {
    let store = Arc::new(MemoryStore::new());
    let catalog = catalog();
    let cache = cache(&store, &catalog);
    let q = query(Some(1));
    let key = ProductCacheKey::new(&q);
    store.set(key.as_str(), "[]", PRODUCT_CACHE_TTL).await.unwrap();

    let page = cache.fetch(&q).await.unwrap();

    assert_eq!(page.products.len(), 6);
    let stored: ProductPage =
        serde_json::from_str(&store.get(key.as_str()).await.unwrap().unwrap()).unwrap();
    assert_eq!(stored, page);
}

#[tokio::test(start_paused = true)]
async fn test_entry_expires_after_ttl() {
    let store = Arc::new(MemoryStore::new());
    let catalog = catalog();
    let cache = cache(&store, &catalog);

    cache.fetch(&query(Some(1))).await.unwrap();
    tokio::time::advance(PRODUCT_CACHE_TTL - Duration::from_secs(1)).await;
    cache.fetch(&query(Some(1))).await.unwrap();
    assert_eq!(catalog.page_calls(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    cache.fetch(&query(Some(1))).await.unwrap();
    assert_eq!(catalog.page_calls(), 2);
}

// =============================================================================
// Store failures
// =============================================================================

#[tokio::test]
async fn test_failed_read_is_an_error_not_a_miss() {
    let store = Arc::new(FailingStore::new());
    let catalog = catalog();
    let cache = ProductCache::new(store.clone(), catalog.clone());
    store.fail_reads(true);

    let result = cache.fetch(&query(Some(1))).await;

    assert!(matches!(result, Err(CatalogError::Store(_))));
    assert_eq!(catalog.count_calls(), 0);
    assert_eq!(catalog.page_calls(), 0);
}

#[tokio::test]
async fn test_failed_write_still_returns_page() {
    let store = Arc::new(FailingStore::new());
    let catalog = catalog();
    let cache = ProductCache::new(store.clone(), catalog.clone());
    store.fail_writes(true);

    let page = cache.fetch(&query(Some(1))).await.unwrap();
    assert_eq!(page.products.len(), 6);
    assert_eq!(page.total_pages, 2);

    // Nothing was cached, so the next request goes back to the catalog.
    cache.fetch(&query(Some(1))).await.unwrap();
    assert_eq!(catalog.page_calls(), 2);
}
