//! Builds the configured cache backend

use std::sync::Arc;

use crate::config::{CacheBackend, CacheSettings};
use crate::domain::cache::Cache;
use crate::domain::DomainError;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::redis::RedisCache;

/// Turns [`CacheSettings`] into a ready-to-use store
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    /// Creates the backend named by `settings.backend`
    ///
    /// The Redis backend connects eagerly, so an unreachable server fails here
    /// rather than on the first memoized call.
    pub async fn create(settings: &CacheSettings) -> Result<Arc<dyn Cache>, DomainError> {
        tracing::info!(backend = %settings.backend, "Creating cache backend");

        let cache: Arc<dyn Cache> = match settings.backend {
            CacheBackend::InMemory => {
                Arc::new(InMemoryCache::with_config(InMemoryCacheConfig::from(settings)))
            }
            CacheBackend::Redis => Arc::new(
                RedisCache::connect(&settings.redis_url, settings.key_prefix.clone()).await?,
            ),
        };

        Ok(cache)
    }
}
