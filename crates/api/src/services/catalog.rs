//! Cached brand and category lists.
//!
//! Both lists change rarely and are read on every catalog page, so they
//! are held in a `moka` cache (5-minute TTL) and invalidated whenever an
//! admin adds an entry.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use crate::db::{CatalogRepository, RepositoryError};
use crate::models::{Brand, Category};

/// Cache key for catalog lookup lists.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum CacheKey {
    Brands,
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Brands(Arc<Vec<Brand>>),
    Categories(Arc<Vec<Category>>),
}

/// Read-through cache over [`CatalogRepository`].
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl CatalogCache {
    /// Create a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(8).time_to_live(ttl).build();
        Self { cache }
    }

    /// All brands.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the list has to be loaded and the query fails.
    pub async fn brands(&self, pool: &PgPool) -> Result<Arc<Vec<Brand>>, RepositoryError> {
        if let Some(CacheValue::Brands(brands)) = self.cache.get(&CacheKey::Brands).await {
            debug!("Cache hit for brands");
            return Ok(brands);
        }

        let brands = Arc::new(CatalogRepository::new(pool).list_brands().await?);
        self.cache
            .insert(CacheKey::Brands, CacheValue::Brands(Arc::clone(&brands)))
            .await;
        Ok(brands)
    }

    /// All categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the list has to be loaded and the query fails.
    pub async fn categories(&self, pool: &PgPool) -> Result<Arc<Vec<Category>>, RepositoryError> {
        if let Some(CacheValue::Categories(categories)) =
            self.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = Arc::new(CatalogRepository::new(pool).list_categories().await?);
        self.cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::clone(&categories)),
            )
            .await;
        Ok(categories)
    }

    /// Create a brand and drop the cached list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create_brand(&self, pool: &PgPool, name: &str) -> Result<Brand, RepositoryError> {
        let brand = CatalogRepository::new(pool).create_brand(name).await?;
        self.cache.invalidate(&CacheKey::Brands).await;
        Ok(brand)
    }

    /// Create a category and drop the cached list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create_category(
        &self,
        pool: &PgPool,
        name: &str,
    ) -> Result<Category, RepositoryError> {
        let category = CatalogRepository::new(pool).create_category(name).await?;
        self.cache.invalidate(&CacheKey::Categories).await;
        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopfront_core::BrandId;

    #[tokio::test]
    async fn test_cached_list_is_served_without_database() {
        let catalog = CatalogCache::default();
        let brands = Arc::new(vec![Brand {
            id: BrandId::new(1),
            name: "Acme".to_string(),
        }]);
        catalog
            .cache
            .insert(CacheKey::Brands, CacheValue::Brands(Arc::clone(&brands)))
            .await;

        // A lazily-connected pool that would fail on first use.
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://invalid@127.0.0.1:1/none")
            .unwrap_or_else(|e| panic!("lazy pool: {e}"));

        let cached = catalog.brands(&pool).await.unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].name, "Acme");
    }
}
