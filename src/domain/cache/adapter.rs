//! Cache adapter seam consumed by memoized operations

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::DomainError;

use super::repository::{Cache, CacheExt};

/// Storage interface a memoized operation reads from and writes to
///
/// A miss is `Ok(None)`. Errors are reserved for real backend failures and are
/// propagated to the caller of the memoized operation unchanged.
#[async_trait]
pub trait CacheAdapter<V>: Send + Sync + fmt::Debug
where
    V: Send + Sync + 'static,
{
    /// Backend-specific store options, forwarded verbatim on every write
    type Options: Send + Sync;

    /// Looks up a previously stored value
    async fn get_item(&self, key: &str) -> Result<Option<V>, DomainError>;

    /// Stores a freshly computed value
    async fn set_item(
        &self,
        key: &str,
        value: &V,
        options: &Self::Options,
    ) -> Result<(), DomainError>;
}

/// Store options understood by every [`Cache`] backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlOptions {
    /// How long the stored value stays readable
    pub ttl: Duration,
    /// Keep an existing entry instead of overwriting it (`SET NX`)
    pub only_if_absent: bool,
}

impl TtlOptions {
    /// Options with the given time-to-live
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            only_if_absent: false,
        }
    }

    /// Options with a time-to-live expressed in milliseconds
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Only store when no live entry exists for the key
    pub fn only_if_absent(mut self) -> Self {
        self.only_if_absent = true;
        self
    }
}

// Every JSON store is an adapter for every serializable value type.
#[async_trait]
impl<V, C> CacheAdapter<V> for C
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    C: Cache + ?Sized,
{
    type Options = TtlOptions;

    async fn get_item(&self, key: &str) -> Result<Option<V>, DomainError> {
        self.load(key).await
    }

    async fn set_item(
        &self,
        key: &str,
        value: &V,
        options: &TtlOptions,
    ) -> Result<(), DomainError> {
        if !self.store(key, value, options).await? {
            tracing::debug!(key = %key, "Entry already present, keeping existing value");
        }

        Ok(())
    }
}

/// Adapter assembled from a pair of async closures
///
/// ```ignore
/// let adapter = FnAdapter::new(
///     move |key: String| { let store = store.clone(); async move { store.read(&key) } },
///     move |key: String, value: u64, opts: MyOptions| { /* ... */ async move { Ok(()) } },
/// );
/// ```
pub struct FnAdapter<G, S, O> {
    get: G,
    set: S,
    _options: PhantomData<fn(O)>,
}

impl<G, S, O> FnAdapter<G, S, O> {
    /// Creates an adapter from a read closure and a write closure
    pub fn new(get: G, set: S) -> Self {
        Self {
            get,
            set,
            _options: PhantomData,
        }
    }
}

impl<G, S, O> fmt::Debug for FnAdapter<G, S, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAdapter")
            .field("options", &std::any::type_name::<O>())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<V, O, G, GF, S, SF> CacheAdapter<V> for FnAdapter<G, S, O>
where
    V: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
    G: Fn(String) -> GF + Send + Sync + 'static,
    GF: Future<Output = Result<Option<V>, DomainError>> + Send,
    S: Fn(String, V, O) -> SF + Send + Sync + 'static,
    SF: Future<Output = Result<(), DomainError>> + Send,
{
    type Options = O;

    async fn get_item(&self, key: &str) -> Result<Option<V>, DomainError> {
        (self.get)(key.to_string()).await
    }

    async fn set_item(&self, key: &str, value: &V, options: &O) -> Result<(), DomainError> {
        (self.set)(key.to_string(), value.clone(), options.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_json_store_round_trip() {
        let cache = MockCache::new();

        CacheAdapter::<Vec<u32>>::set_item(&cache, "k", &vec![1, 2], &TtlOptions::from_millis(500))
            .await
            .unwrap();

        let value: Option<Vec<u32>> = cache.get_item("k").await.unwrap();
        assert_eq!(value, Some(vec![1, 2]));
        assert_eq!(cache.ttl_of("k"), Some(Duration::from_millis(500)));
    }

    #[tokio::test]
    async fn test_json_store_miss() {
        let cache = MockCache::new();

        let value: Option<String> = cache.get_item("nope").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_json_store_null_is_a_value() {
        let cache = MockCache::new().with_entry("k", &Option::<u32>::None, None);

        let value: Option<Option<u32>> = cache.get_item("k").await.unwrap();
        assert_eq!(value, Some(None));
    }

    #[tokio::test]
    async fn test_json_store_only_if_absent() {
        let cache = MockCache::new().with_entry("k", &"first", None);
        let options = TtlOptions::from_millis(1000).only_if_absent();

        CacheAdapter::<String>::set_item(&cache, "k", &"second".to_string(), &options)
            .await
            .unwrap();

        let value: Option<String> = cache.get_item("k").await.unwrap();
        assert_eq!(value.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_json_store_decode_failure_is_an_error() {
        let cache = MockCache::new().with_entry("k", &"not a number", None);

        let result: Result<Option<u32>, _> = cache.get_item("k").await;
        assert!(matches!(result, Err(DomainError::Serialization { .. })));
    }

    #[tokio::test]
    async fn test_dyn_store_is_an_adapter() {
        let cache: Arc<dyn Cache> = Arc::new(MockCache::new());

        CacheAdapter::<u8>::set_item(cache.as_ref(), "k", &9, &TtlOptions::from_millis(10))
            .await
            .unwrap();

        let value: Option<u8> = cache.as_ref().get_item("k").await.unwrap();
        assert_eq!(value, Some(9));
    }

    #[tokio::test]
    async fn test_fn_adapter() {
        let store: Arc<Mutex<HashMap<String, (u64, u32)>>> = Arc::default();
        let reader = store.clone();
        let writer = store.clone();

        let adapter = FnAdapter::<_, _, u32>::new(
            move |key: String| {
                let reader = reader.clone();
                async move {
                    Ok::<_, DomainError>(reader.lock().unwrap().get(&key).map(|(v, _)| *v))
                }
            },
            move |key: String, value: u64, weight: u32| {
                let writer = writer.clone();
                async move {
                    writer.lock().unwrap().insert(key, (value, weight));
                    Ok::<_, DomainError>(())
                }
            },
        );

        let before: Option<u64> = adapter.get_item("a").await.unwrap();
        assert_eq!(before, None);

        adapter.set_item("a", &5u64, &3u32).await.unwrap();

        let after: Option<u64> = adapter.get_item("a").await.unwrap();
        assert_eq!(after, Some(5));
        assert_eq!(store.lock().unwrap().get("a"), Some(&(5, 3)));
        assert!(format!("{:?}", adapter).starts_with("FnAdapter"));
    }
}
