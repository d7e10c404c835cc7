use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::domain::DomainError;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Store that memoized results are written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// Process-local moka cache
    #[default]
    #[serde(alias = "memory", alias = "in-memory")]
    InMemory,
    Redis,
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InMemory => "in_memory",
            Self::Redis => "redis",
        })
    }
}

impl FromStr for CacheBackend {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in_memory" | "in-memory" | "memory" => Ok(Self::InMemory),
            "redis" => Ok(Self::Redis),
            other => Err(DomainError::configuration(format!(
                "Unknown cache backend '{}', expected in_memory or redis",
                other
            ))),
        }
    }
}

/// Where memoized results live and how long they may stay there
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub redis_url: String,
    /// Namespace prepended to every Redis key as `prefix:key`
    pub key_prefix: Option<String>,
    /// Ceiling on entry lifetime for the in-memory backend
    pub max_ttl_secs: u64,
    pub max_capacity: u64,
    pub time_to_idle_secs: Option<u64>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            max_ttl_secs: 3600,
            max_capacity: 10_000,
            time_to_idle_secs: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_overrides(pairs: &[(&str, &str)]) -> Result<AppConfig, config::ConfigError> {
        let mut builder = config::Config::builder();

        for (key, value) in pairs {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.cache.backend, CacheBackend::InMemory);
        assert_eq!(config.cache.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.cache.max_ttl_secs, 3600);
        assert_eq!(config.cache.max_capacity, 10_000);
    }

    #[test]
    fn test_partial_source_keeps_defaults() {
        let config = from_overrides(&[
            ("cache.backend", "redis"),
            ("cache.key_prefix", "memo"),
            ("logging.format", "json"),
        ])
        .unwrap();

        assert_eq!(config.cache.backend, CacheBackend::Redis);
        assert_eq!(config.cache.key_prefix.as_deref(), Some("memo"));
        assert_eq!(config.cache.max_capacity, 10_000);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_backend_alias() {
        let config = from_overrides(&[("cache.backend", "memory")]).unwrap();
        assert_eq!(config.cache.backend, CacheBackend::InMemory);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(from_overrides(&[("cache.backend", "memcached")]).is_err());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!(" Redis ".parse::<CacheBackend>().unwrap(), CacheBackend::Redis);
        assert_eq!("in-memory".parse::<CacheBackend>().unwrap(), CacheBackend::InMemory);
        assert!(matches!(
            "disk".parse::<CacheBackend>(),
            Err(DomainError::Configuration { .. })
        ));
        assert_eq!(CacheBackend::InMemory.to_string(), "in_memory");
    }
}
