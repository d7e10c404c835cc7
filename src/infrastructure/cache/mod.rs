//! Cache backends behind the `Cache` trait

mod factory;
mod in_memory;
mod redis;

pub use factory::CacheFactory;
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use redis::RedisCache;
