//! Memoizer factory: binds an adapter and key deriver once, wraps many operations

use std::fmt;
use std::sync::Arc;

use super::key::{DefaultKeyDeriver, KeyDeriver};
use super::memoize::MemoizedOperation;

/// Entry point for memoizing operations against one cache adapter
///
/// ```ignore
/// let factory = MemoizerFactory::new(cache).with_key_deriver(HashedKeyDeriver::new());
/// let three_seconds = factory.memoizer(TtlOptions::from_millis(3000));
/// let sum = three_seconds.wrap("ExpensiveOperations", "heavy_computation", |(a, b): (u64, u64)| async move {
///     Ok::<_, DomainError>(a + b)
/// });
/// let five = sum.call((2, 3)).await?;
/// ```
pub struct MemoizerFactory<A: ?Sized> {
    adapter: Arc<A>,
    deriver: Arc<dyn KeyDeriver>,
}

impl<A: ?Sized> MemoizerFactory<A> {
    /// Creates a factory using the default key format
    pub fn new(adapter: Arc<A>) -> Self {
        Self {
            adapter,
            deriver: Arc::new(DefaultKeyDeriver::new()),
        }
    }

    /// Replaces the key deriver for every operation wrapped afterwards
    pub fn with_key_deriver<D>(mut self, deriver: D) -> Self
    where
        D: KeyDeriver + 'static,
    {
        self.deriver = Arc::new(deriver);
        self
    }

    /// Returns the shared adapter
    pub fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    /// Binds per-use store options, e.g. a TTL
    pub fn memoizer<O>(&self, options: O) -> Memoizer<A, O> {
        Memoizer {
            adapter: self.adapter.clone(),
            deriver: self.deriver.clone(),
            options,
        }
    }
}

impl<A: ?Sized> Clone for MemoizerFactory<A> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            deriver: self.deriver.clone(),
        }
    }
}

impl<A: fmt::Debug + ?Sized> fmt::Debug for MemoizerFactory<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizerFactory")
            .field("adapter", &self.adapter)
            .finish_non_exhaustive()
    }
}

/// Factory bound to one set of store options
pub struct Memoizer<A: ?Sized, O> {
    adapter: Arc<A>,
    deriver: Arc<dyn KeyDeriver>,
    options: O,
}

impl<A: ?Sized, O: Clone> Memoizer<A, O> {
    /// Wraps `operation`, identified by `owner` and `name` in its cache keys
    pub fn wrap<F>(
        &self,
        owner: impl Into<String>,
        name: impl Into<String>,
        operation: F,
    ) -> MemoizedOperation<A, O, F> {
        MemoizedOperation::new(
            owner,
            name,
            operation,
            self.adapter.clone(),
            self.deriver.clone(),
            self.options.clone(),
        )
    }

    pub fn options(&self) -> &O {
        &self.options
    }
}

impl<A: ?Sized, O: Clone> Clone for Memoizer<A, O> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            deriver: self.deriver.clone(),
            options: self.options.clone(),
        }
    }
}

impl<A: fmt::Debug + ?Sized, O: fmt::Debug> fmt::Debug for Memoizer<A, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoizer")
            .field("adapter", &self.adapter)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
