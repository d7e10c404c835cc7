//! Process-local cache backend on moka

use std::future::ready;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::ops::compute::{CompResult, Op};
use tokio::time::Instant;

use crate::config::CacheSettings;
use crate::domain::cache::Cache;
use crate::domain::DomainError;

/// moka refuses expiry settings beyond 1000 years; stay well inside that.
const LIFETIME_LIMIT: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Sizing and lifetime limits for [`InMemoryCache`]
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryCacheConfig {
    pub max_capacity: u64,
    /// Longest any entry lives, whatever TTL it was written with
    pub max_ttl: Duration,
    /// Evict entries nobody has read for this long
    pub time_to_idle: Option<Duration>,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            max_ttl: Duration::from_secs(3600),
            time_to_idle: None,
        }
    }
}

impl InMemoryCacheConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_max_ttl(mut self, ttl: Duration) -> Self {
        self.max_ttl = ttl;
        self
    }

    pub fn with_time_to_idle(mut self, tti: Duration) -> Self {
        self.time_to_idle = Some(tti);
        self
    }
}

impl From<&CacheSettings> for InMemoryCacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            max_capacity: settings.max_capacity,
            max_ttl: Duration::from_secs(settings.max_ttl_secs),
            time_to_idle: settings.time_to_idle_secs.map(Duration::from_secs),
        }
    }
}

/// A stored document and the instant it stops being served
#[derive(Debug, Clone)]
struct Slot {
    json: String,
    /// `None` when the deadline lies beyond what `Instant` can represent
    deadline: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline.is_none_or(|deadline| now < deadline)
    }
}

/// In-memory [`Cache`] with a TTL per entry
///
/// moka bounds capacity and applies `max_ttl` globally. Each slot carries its
/// own deadline on top, checked on every read.
#[derive(Debug)]
pub struct InMemoryCache {
    slots: MokaCache<String, Slot>,
    config: InMemoryCacheConfig,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        let mut builder = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.max_ttl.min(LIFETIME_LIMIT));

        if let Some(tti) = config.time_to_idle {
            builder = builder.time_to_idle(tti.min(LIFETIME_LIMIT));
        }

        Self {
            slots: builder.build(),
            config,
        }
    }

    pub fn config(&self) -> &InMemoryCacheConfig {
        &self.config
    }

    fn slot(&self, value: &str, ttl: Duration) -> Slot {
        let ttl = ttl.min(self.config.max_ttl);

        Slot {
            json: value.to_string(),
            deadline: Instant::now().checked_add(ttl),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let Some(slot) = self.slots.get(key).await else {
            return Ok(None);
        };

        let now = Instant::now();

        if slot.is_live(now) {
            return Ok(Some(slot.json));
        }

        // Drop it only if nobody replaced it in the meantime
        self.slots
            .entry_by_ref(key)
            .and_compute_with(|current| {
                ready(match current {
                    Some(entry) if !entry.value().is_live(now) => Op::Remove,
                    _ => Op::Nop,
                })
            })
            .await;

        Ok(None)
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        self.slots.insert(key.to_string(), self.slot(value, ttl)).await;
        Ok(())
    }

    async fn set_nx_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError> {
        let slot = self.slot(value, ttl);
        let now = Instant::now();

        let outcome = self
            .slots
            .entry_by_ref(key)
            .and_compute_with(|current| {
                ready(match current {
                    Some(entry) if entry.value().is_live(now) => Op::Nop,
                    _ => Op::Put(slot),
                })
            })
            .await;

        Ok(matches!(
            outcome,
            CompResult::Inserted(_) | CompResult::ReplacedWith(_)
        ))
    }
}
