//! Cache domain - memoization of async operations over pluggable stores

mod adapter;
mod factory;
mod key;
mod memoize;
mod repository;

pub use adapter::{CacheAdapter, FnAdapter, TtlOptions};
pub use factory::{Memoizer, MemoizerFactory};
pub use key::{
    canonical_args, canonical_json, encode_args, DefaultKeyDeriver, HashedKeyDeriver, KeyDeriver,
};
pub use memoize::{memoize, MemoizeError, MemoizedOperation};
pub use repository::{Cache, CacheExt};

#[cfg(test)]
pub use repository::mock::MockCache;
