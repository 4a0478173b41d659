//! Configuration Module
//!
//! This module defines all configuration structures for the explorer cache.
//! Configuration is loaded from TOML files and parsed using serde.

use serde::Deserialize;
use std::fs;

/// Main configuration structure
///
/// Loaded from a TOML file (e.g., config/default.toml).
///
/// # Example TOML
/// ```toml
/// [api]
/// host = "127.0.0.1"
/// port = 8081
///
/// [source]
/// rpc_url = "http://127.0.0.1:8080"
///
/// [sync]
/// poll_interval_ms = 2000
/// prefetch_blocks = true
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// HTTP API settings
///
/// # Fields
/// - `host`: IP address to bind to (e.g., "127.0.0.1" or "0.0.0.0")
/// - `port`: TCP port to listen on
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

/// Entity source settings
///
/// `rpc_url` is the JSON-RPC endpoint of the node / indexer the explorer
/// reads from.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub rpc_url: String,
}

/// Best-block watcher settings
///
/// # Fields
/// - `poll_interval_ms`: How often to ask the source for the chain head
/// - `prefetch_blocks`: Also fetch and cache each new head block
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub poll_interval_ms: u64,
    pub prefetch_blocks: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            prefetch_blocks: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was successfully loaded and parsed
    /// * `Err` if the file couldn't be read or the TOML is invalid
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            [api]
            host = "0.0.0.0"
            port = 9000

            [source]
            rpc_url = "http://node:8080"

            [sync]
            poll_interval_ms = 500
            prefetch_blocks = false
            "#,
        )
        .unwrap();

        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.source.rpc_url, "http://node:8080");
        assert_eq!(config.sync.poll_interval_ms, 500);
        assert!(!config.sync.prefetch_blocks);
    }

    #[test]
    fn test_sync_section_is_optional() {
        let config = Config::parse(
            r#"
            [api]
            host = "127.0.0.1"
            port = 8081

            [source]
            rpc_url = "http://127.0.0.1:8080"
            "#,
        )
        .unwrap();

        assert_eq!(config.sync.poll_interval_ms, 2000);
        assert!(config.sync.prefetch_blocks);
    }

    #[test]
    fn test_missing_source_is_an_error() {
        assert!(Config::parse("[api]\nhost = \"127.0.0.1\"\nport = 1\n").is_err());
    }

    #[test]
    fn test_bundled_default_config_parses() {
        let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml")).unwrap();
        assert_eq!(config.api.port, 8081);
    }
}
