//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::db::PgProductCatalog;
use crate::kv::KeyValueStore;
use crate::services::auth::VerificationCodes;
use crate::services::catalog::{ProductCache, ProductCatalog};
use crate::services::notify::Notifier;
use crate::services::throttle::LoginThrottle;
use crate::services::tokens::TokenService;
use crate::services::uploads::ImageStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    store: Arc<dyn KeyValueStore>,
    throttle: LoginThrottle,
    codes: VerificationCodes,
    products: ProductCache,
    tokens: TokenService,
    images: ImageStore,
    notifier: Notifier,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `pool` - `PostgreSQL` connection pool
    /// * `store` - Key-value store for throttling, codes, and the product cache
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool, store: Arc<dyn KeyValueStore>) -> Self {
        let catalog = Arc::new(PgProductCatalog::new(pool.clone()));
        Self::with_catalog(config, pool, store, catalog)
    }

    /// Create application state with a custom product catalog behind the cache.
    #[must_use]
    pub fn with_catalog(
        config: ApiConfig,
        pool: PgPool,
        store: Arc<dyn KeyValueStore>,
        catalog: Arc<dyn ProductCatalog>,
    ) -> Self {
        let throttle = LoginThrottle::new(store.clone());
        let codes = VerificationCodes::new(store.clone());
        let products = ProductCache::new(store.clone(), catalog);
        let tokens = TokenService::new(&config.jwt_secret);
        let images = ImageStore::new(&config.upload_dir, config.public_base_url.as_str());
        let notifier = Notifier::new(config.notifier.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                store,
                throttle,
                codes,
                products,
                tokens,
                images,
                notifier,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the key-value store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.store
    }

    /// Get a reference to the login throttle.
    #[must_use]
    pub fn throttle(&self) -> &LoginThrottle {
        &self.inner.throttle
    }

    /// Get a reference to the email verification codes.
    #[must_use]
    pub fn codes(&self) -> &VerificationCodes {
        &self.inner.codes
    }

    /// Get a reference to the cached product listing.
    #[must_use]
    pub fn products(&self) -> &ProductCache {
        &self.inner.products
    }

    /// Get a reference to the token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get a reference to the product image store.
    #[must_use]
    pub fn images(&self) -> &ImageStore {
        &self.inner.images
    }

    /// Get a reference to the notification client.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }
}
