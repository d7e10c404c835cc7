//! Redis cache backend

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::cache::Cache;
use crate::domain::DomainError;

/// Largest `EX` we send; Redis rejects expiries whose millisecond deadline overflows.
const MAX_EXPIRY_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// [`Cache`] on a shared Redis connection
///
/// Expiry is enforced by the server through `SET ... EX`. Redis counts in whole
/// seconds, so TTLs round down with a floor of one second.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    key_prefix: Option<String>,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Opens a managed connection to `url`, e.g. `redis://127.0.0.1:6379`
    pub async fn connect(url: &str, key_prefix: Option<String>) -> Result<Self, DomainError> {
        let client = Client::open(url).map_err(|e| {
            DomainError::configuration(format!("Invalid Redis URL '{}': {}", url, e))
        })?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        tracing::info!(url = %url, prefix = ?key_prefix, "Connected to Redis");

        Ok(Self {
            connection,
            key_prefix,
        })
    }

    fn namespaced(&self, key: &str) -> String {
        namespaced_key(self.key_prefix.as_deref(), key)
    }

    fn expiry_secs(ttl: Duration) -> u64 {
        ttl.as_secs().clamp(1, MAX_EXPIRY_SECS)
    }

    /// Issues `SET key value EX secs [NX]`; returns whether the value was written
    async fn write(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        only_if_absent: bool,
    ) -> Result<bool, DomainError> {
        let mut command = redis::cmd("SET");
        command
            .arg(self.namespaced(key))
            .arg(value)
            .arg("EX")
            .arg(Self::expiry_secs(ttl));

        if only_if_absent {
            command.arg("NX");
        }

        let mut conn = self.connection.clone();
        let reply: Option<String> = command
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to write '{}': {}", key, e)))?;

        Ok(reply.is_some())
    }
}

fn namespaced_key(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, key),
        None => key.to_string(),
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.get(self.namespaced(key))
            .await
            .map_err(|e| DomainError::cache(format!("Failed to read '{}': {}", key, e)))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        self.write(key, value, ttl, false).await.map(|_| ())
    }

    async fn set_nx_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError> {
        self.write(key, value, ttl, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{CacheExt, MemoizerFactory, TtlOptions};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Run with: cargo test -- --ignored

    async fn connect() -> RedisCache {
        RedisCache::connect("redis://127.0.0.1:6379", Some("memo-test".to_string()))
            .await
            .unwrap()
    }

    /// A key no earlier run can have left behind
    fn fresh_key(label: &str) -> String {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("{}-{}-{}", label, std::process::id(), nanos)
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_store_and_load() {
        let cache = connect().await;
        let key = fresh_key("roundtrip");

        cache
            .store(&key, &vec!["a", "b"], &TtlOptions::from_millis(5000))
            .await
            .unwrap();

        let value: Option<Vec<String>> = cache.load(&key).await.unwrap();
        assert_eq!(value, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(cache.load::<u8>(&fresh_key("absent")).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_only_if_absent() {
        let cache = connect().await;
        let key = fresh_key("nx");
        let options = TtlOptions::from_millis(5000).only_if_absent();

        assert!(cache.store(&key, &1u8, &options).await.unwrap());
        assert!(!cache.store(&key, &2u8, &options).await.unwrap());
        assert_eq!(cache.load::<u8>(&key).await.unwrap(), Some(1));
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_unbounded_ttl_accepted() {
        let cache = connect().await;
        let key = fresh_key("forever");

        cache.set_raw(&key, "1", Duration::MAX).await.unwrap();
        assert_eq!(cache.get_raw(&key).await.unwrap().as_deref(), Some("1"));

        cache.set_raw(&key, "2", Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_memoized_operation() {
        let cache = Arc::new(connect().await);
        let owner = fresh_key("ExpensiveOperations");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let heavy = MemoizerFactory::new(cache)
            .memoizer(TtlOptions::from_millis(5000).only_if_absent())
            .wrap(owner, "heavy_computation", move |(a, b): (u64, u64)| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, DomainError>(a + b) }
            });

        assert_eq!(heavy.call((2, 3)).await.unwrap(), 5);
        assert_eq!(heavy.call((2, 3)).await.unwrap(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_is_configuration_error() {
        let result = RedisCache::connect("not a url", None).await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_namespaced_key() {
        assert_eq!(namespaced_key(Some("memo"), "Svc#op([1])"), "memo:Svc#op([1])");
        assert_eq!(namespaced_key(None, "Svc#op([1])"), "Svc#op([1])");
    }

    #[test]
    fn test_expiry_secs() {
        assert_eq!(RedisCache::expiry_secs(Duration::from_millis(3000)), 3);
        assert_eq!(RedisCache::expiry_secs(Duration::from_millis(3999)), 3);
        assert_eq!(RedisCache::expiry_secs(Duration::from_millis(10)), 1);
        assert_eq!(RedisCache::expiry_secs(Duration::ZERO), 1);
        assert_eq!(RedisCache::expiry_secs(Duration::MAX), MAX_EXPIRY_SECS);
        assert!(MAX_EXPIRY_SECS.checked_mul(1000).is_some_and(|ms| ms < i64::MAX as u64));
    }
}
