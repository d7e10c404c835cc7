//! PMP Memo Cache
//!
//! Memoizes async operations against a pluggable cache:
//! - Deterministic cache keys from owner, operation name and arguments
//! - Any store behind a two-method adapter (in-memory, Redis, closures)
//! - A factory that binds one adapter and wraps many operations
//!
//! ```ignore
//! let cache = CacheFactory::create(&CacheSettings::default()).await?;
//! let sum = MemoizerFactory::new(cache)
//!     .memoizer(TtlOptions::from_millis(3000))
//!     .wrap("ExpensiveOperations", "heavy_computation", |(a, b): (u64, u64)| async move {
//!         Ok::<_, DomainError>(a + b)
//!     });
//!
//! assert_eq!(sum.call((2, 3)).await?, 5);
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{AppConfig, CacheBackend, CacheSettings};
pub use domain::{
    memoize, Cache, CacheAdapter, CacheExt, DefaultKeyDeriver, DomainError, FnAdapter,
    HashedKeyDeriver, KeyDeriver, MemoizeError, MemoizedOperation, Memoizer, MemoizerFactory,
    TtlOptions,
};
pub use infrastructure::cache::{CacheFactory, InMemoryCache, RedisCache};
