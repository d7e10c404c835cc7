//! Domain layer - Memoization core and its error types

pub mod cache;
pub mod error;

pub use cache::{
    memoize, Cache, CacheAdapter, CacheExt, DefaultKeyDeriver, FnAdapter, HashedKeyDeriver,
    KeyDeriver, MemoizeError, MemoizedOperation, Memoizer, MemoizerFactory, TtlOptions,
};
pub use error::DomainError;
