//! JSON store trait behind the bundled cache adapters

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::DomainError;

use super::adapter::TtlOptions;

/// Expiring string store holding one JSON document per key
///
/// Object-safe so backends can be chosen at runtime as `Arc<dyn Cache>`.
/// Typed access goes through [`CacheExt`].
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    /// Returns the document under `key` unless it is missing or expired
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Stores `value` under `key`, replacing whatever was there
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Stores `value` only when `key` has no live entry. Must be atomic:
    /// of several racing calls exactly one returns `true`.
    async fn set_nx_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, DomainError>;
}

/// Typed access to a [`Cache`]
pub trait CacheExt: Cache {
    /// Reads and decodes the value under `key`
    fn load<'a, V>(
        &'a self,
        key: &'a str,
    ) -> impl Future<Output = Result<Option<V>, DomainError>> + Send + 'a
    where
        V: DeserializeOwned + Send + 'a,
    {
        async move {
            let Some(json) = self.get_raw(key).await? else {
                return Ok(None);
            };

            serde_json::from_str(&json).map(Some).map_err(|e| {
                DomainError::serialization(format!("Corrupt cache entry '{}': {}", key, e))
            })
        }
    }

    /// Encodes and stores `value`; returns false when `only_if_absent` kept an older entry
    fn store<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        options: &'a TtlOptions,
    ) -> impl Future<Output = Result<bool, DomainError>> + Send + 'a
    where
        V: Serialize + Sync + ?Sized,
    {
        async move {
            let json = serde_json::to_string(value).map_err(|e| {
                DomainError::serialization(format!("Cannot encode value for '{}': {}", key, e))
            })?;

            if options.only_if_absent {
                self.set_nx_raw(key, &json, options.ttl).await
            } else {
                self.set_raw(key, &json, options.ttl).await.map(|()| true)
            }
        }
    }
}

impl<T: Cache + ?Sized> CacheExt for T {}
