//! # Configuration Management
//!
//! Configuration for the store and the server surface. Everything has a sane
//! default and can be overridden from the environment:
//!
//! | Variable                    | Default        |
//! |-----------------------------|----------------|
//! | `STRATA_DATA_DIR`           | `./data`       |
//! | `STRATA_MEMTABLE_MAX_ITEMS` | `50000`        |
//! | `STRATA_HTTP_ADDR`          | `0.0.0.0:8080` |
//! | `STRATA_RATE_LIMIT_RPS`     | `100`          |
//! | `STRATA_RATE_LIMIT_BURST`   | `200`          |

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default memtable cardinality bound before a flush is forced.
pub const DEFAULT_MEMTABLE_MAX_ITEMS: usize = 50_000;

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the manifest, the WAL and the `sst/` segment dir
    pub data_dir: PathBuf,
    /// Flush the memtable once it holds this many keys
    pub memtable_max_items: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            memtable_max_items: DEFAULT_MEMTABLE_MAX_ITEMS,
        }
    }
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Validate and normalize the configuration.
    ///
    /// A zero `memtable_max_items` falls back to the default rather than
    /// flushing on every put.
    pub fn validated(mut self) -> Result<Self> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::Configuration {
                message: "data_dir is required".to_string(),
            });
        }
        if self.memtable_max_items == 0 {
            self.memtable_max_items = DEFAULT_MEMTABLE_MAX_ITEMS;
        }
        Ok(self)
    }

    pub fn from_env() -> Self {
        Self {
            data_dir: PathBuf::from(env_or("STRATA_DATA_DIR", "./data")),
            memtable_max_items: env_parse("STRATA_MEMTABLE_MAX_ITEMS", DEFAULT_MEMTABLE_MAX_ITEMS),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub http_addr: String,
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            http_addr: env_or("STRATA_HTTP_ADDR", "0.0.0.0:8080"),
            rate_limit: RateLimitConfig {
                requests_per_second: env_parse("STRATA_RATE_LIMIT_RPS", 100.0),
                burst: env_parse("STRATA_RATE_LIMIT_BURST", 200),
            },
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_second: f64,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 100.0,
            burst: 200,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.memtable_max_items, 50_000);
        assert_eq!(config.data_dir, PathBuf::from("./data"));

        let server = ServerConfig::default();
        assert_eq!(server.rate_limit.burst, 200);
    }

    #[test]
    fn test_validated_rejects_empty_data_dir() {
        let config = StoreConfig {
            data_dir: PathBuf::new(),
            memtable_max_items: 10,
        };
        assert!(matches!(
            config.validated(),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_validated_defaults_zero_max_items() {
        let config = StoreConfig {
            data_dir: PathBuf::from("/tmp/strata"),
            memtable_max_items: 0,
        };
        let config = config.validated().unwrap();
        assert_eq!(config.memtable_max_items, DEFAULT_MEMTABLE_MAX_ITEMS);
    }
}
