//! Memoized operations: key derivation plus read-through orchestration

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use thiserror::Error;

use crate::domain::DomainError;

use super::adapter::CacheAdapter;
use super::key::{encode_args, KeyDeriver};

/// Failure of a memoized call, tagged with the step that failed
#[derive(Debug, Error)]
pub enum MemoizeError<E> {
    /// The arguments could not be encoded into a cache key
    #[error("Failed to derive cache key: {0}")]
    Key(#[source] DomainError),

    /// The adapter failed to read; the operation was not invoked
    #[error("Cache read failed: {0}")]
    Read(#[source] DomainError),

    /// The operation itself failed; nothing was stored
    #[error(transparent)]
    Operation(E),

    /// The value was computed but could not be stored, and is discarded
    #[error("Cache write failed: {0}")]
    Write(#[source] DomainError),
}

impl<E> MemoizeError<E> {
    /// Returns true when the failure came from the cache rather than the operation
    pub fn is_cache_error(&self) -> bool {
        !matches!(self, Self::Operation(_))
    }

    /// Returns the operation's own error, if that is what failed
    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::Operation(e) => Some(e),
            _ => None,
        }
    }

    fn stage(&self) -> &'static str {
        match self {
            Self::Key(_) => "key",
            Self::Read(_) => "read",
            Self::Operation(_) => "operation",
            Self::Write(_) => "write",
        }
    }
}

/// An async operation whose results are served from a cache adapter
///
/// Every call derives a key, reads the adapter, and on a miss runs the
/// operation and stores its result before returning it. Failures at any step
/// are returned as-is and never cached. Concurrent calls for the same key are
/// not coordinated: each miss computes and writes.
pub struct MemoizedOperation<A: ?Sized, O, F> {
    owner: String,
    name: String,
    operation: F,
    adapter: Arc<A>,
    deriver: Arc<dyn KeyDeriver>,
    options: O,
}

impl<A: ?Sized, O, F> MemoizedOperation<A, O, F> {
    /// Wraps `operation` so that its results go through `adapter`
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        operation: F,
        adapter: Arc<A>,
        deriver: Arc<dyn KeyDeriver>,
        options: O,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            operation,
            adapter,
            deriver,
            options,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Options forwarded to the adapter on every store
    pub fn options(&self) -> &O {
        &self.options
    }

    /// Returns the key a call with `args` reads and writes
    pub fn cache_key<Args>(&self, args: &Args) -> Result<String, DomainError>
    where
        Args: Serialize,
    {
        let values = encode_args(args)?;
        Ok(self.deriver.derive(&self.owner, &self.name, &values))
    }

    /// Invokes the operation through the cache
    pub async fn call<Args, V, E, Fut>(&self, args: Args) -> Result<V, MemoizeError<E>>
    where
        Args: Serialize,
        F: Fn(Args) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        V: Send + Sync + 'static,
        A: CacheAdapter<V, Options = O>,
    {
        let result = self.run(args).await;

        if let Err(e) = &result {
            counter!(
                "memo_cache_errors_total",
                "owner" => self.owner.clone(),
                "operation" => self.name.clone(),
                "stage" => e.stage()
            )
            .increment(1);
        }

        result
    }

    async fn run<Args, V, E, Fut>(&self, args: Args) -> Result<V, MemoizeError<E>>
    where
        Args: Serialize,
        F: Fn(Args) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        V: Send + Sync + 'static,
        A: CacheAdapter<V, Options = O>,
    {
        let key = self.cache_key(&args).map_err(MemoizeError::Key)?;

        let cached = CacheAdapter::<V>::get_item(self.adapter.as_ref(), &key)
            .await
            .map_err(MemoizeError::Read)?;

        if let Some(value) = cached {
            tracing::debug!(owner = %self.owner, operation = %self.name, key = %key, "Cache hit");
            counter!(
                "memo_cache_hits_total",
                "owner" => self.owner.clone(),
                "operation" => self.name.clone()
            )
            .increment(1);

            return Ok(value);
        }

        tracing::debug!(owner = %self.owner, operation = %self.name, key = %key, "Cache miss, computing");
        counter!(
            "memo_cache_misses_total",
            "owner" => self.owner.clone(),
            "operation" => self.name.clone()
        )
        .increment(1);

        let value = (self.operation)(args)
            .await
            .map_err(MemoizeError::Operation)?;

        CacheAdapter::<V>::set_item(self.adapter.as_ref(), &key, &value, &self.options)
            .await
            .map_err(|e| {
                tracing::warn!(
                    owner = %self.owner,
                    operation = %self.name,
                    key = %key,
                    error = %e,
                    "Failed to store computed value"
                );
                MemoizeError::Write(e)
            })?;

        Ok(value)
    }
}

impl<A, O, F> fmt::Debug for MemoizedOperation<A, O, F>
where
    A: fmt::Debug + ?Sized,
    O: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizedOperation")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("adapter", &self.adapter)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Wraps an operation for caching in one step
///
/// This is the explicit form of attaching a cache to a method: owner and
/// operation name identify the call site, the adapter and deriver are shared,
/// and `options` go to every store.
pub fn memoize<A, O, F>(
    operation: F,
    owner: impl Into<String>,
    name: impl Into<String>,
    adapter: Arc<A>,
    deriver: Arc<dyn KeyDeriver>,
    options: O,
) -> MemoizedOperation<A, O, F>
where
    A: ?Sized,
{
    MemoizedOperation::new(owner, name, operation, adapter, deriver, options)
}
