//! Configuration management for cubeindex
//!
//! Settings are loaded from environment variables with sensible defaults;
//! command-line flags override individual fields in the CLI handlers.
//!
//! # Environment Variables
//!
//! - `CUBEINDEX_LOG_LEVEL`: Logging level - default: "info"
//! - `CUBEINDEX_PAGE_LIMIT`: Products per page request - default: 250 (Shopify max)
//! - `CUBEINDEX_PAGE_DELAY_MS`: Politeness delay between pages - default: 700
//! - `CUBEINDEX_REQUEST_TIMEOUT`: Per-request timeout in seconds - default: 15
//! - `CUBEINDEX_DATA_DIR`: Tracked catalogue directory - default: "stores_products"
//! - `CUBEINDEX_STAGING_DIR`: Artifact staging directory - default: temp dir + "cubeindex-artifacts"
//! - `CUBEINDEX_STORES_FILE`: TOML file with extra stores - default: `<config dir>/cubeindex/stores.toml` if present
//! - `CUBEINDEX_GIT_AUTHOR_NAME` / `CUBEINDEX_GIT_AUTHOR_EMAIL`: Commit identity - default: github-actions bot
//! - `CUBEINDEX_COMMIT_MESSAGE`: Commit message template - default: "Update store catalogues ({date})"
//! - `CUBEINDEX_MAX_PARALLEL`: Concurrent matrix slots, 0 for unbounded - default: 0

use crate::registry::{RegistryError, StoreRegistry};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_PAGE_LIMIT: u32 = 250;
const DEFAULT_PAGE_DELAY_MS: u64 = 700;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_DATA_DIR: &str = "stores_products";
const DEFAULT_STAGING_DIR_NAME: &str = "cubeindex-artifacts";
const DEFAULT_GIT_AUTHOR_NAME: &str = "github-actions[bot]";
const DEFAULT_GIT_AUTHOR_EMAIL: &str = "41898282+github-actions[bot]@users.noreply.github.com";
const DEFAULT_COMMIT_MESSAGE: &str = "Update store catalogues ({date})";
const DEFAULT_MAX_PARALLEL: usize = 0;

/// Shopify refuses page sizes above this
pub const MAX_PAGE_LIMIT: u32 = 250;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// A required environment variable is not set
    #[error("Missing required setting {0}")]
    MissingVariable(String),

    /// Stores file could not be loaded
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Main configuration structure for cubeindex
#[derive(Debug, Clone)]
pub struct CubeIndexConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Products requested per page
    pub page_limit: u32,

    /// Delay between successive page requests, in milliseconds
    pub page_delay_ms: u64,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Directory holding the tracked `<store>_products.json` files
    pub data_dir: PathBuf,

    /// Directory where per-store artifacts are staged during a sync
    pub staging_dir: PathBuf,

    /// Optional TOML file with extra or overriding store endpoints
    pub stores_file: Option<PathBuf>,

    /// Whether `stores_file` was set explicitly (a missing explicit file is an error)
    pub stores_file_explicit: bool,

    /// Commit author name
    pub git_author_name: String,

    /// Commit author email
    pub git_author_email: String,

    /// Commit message template (`{date}`, `{stores}`, `{count}`)
    pub commit_message: String,

    /// Maximum concurrent matrix slots, 0 for no limit
    pub max_parallel: usize,
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Default for CubeIndexConfig {
    /// Loads `CUBEINDEX_*` environment variables, falling back to defaults
    fn default() -> Self {
        let explicit_stores = env::var("CUBEINDEX_STORES_FILE").ok().map(PathBuf::from);
        let stores_file_explicit = explicit_stores.is_some();
        let stores_file = explicit_stores.or_else(|| {
            dirs::config_dir().map(|dir| dir.join("cubeindex").join("stores.toml"))
        });

        Self {
            log_level: env::var("CUBEINDEX_LOG_LEVEL")
                .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
                .to_lowercase(),
            page_limit: env_parsed("CUBEINDEX_PAGE_LIMIT", DEFAULT_PAGE_LIMIT),
            page_delay_ms: env_parsed("CUBEINDEX_PAGE_DELAY_MS", DEFAULT_PAGE_DELAY_MS),
            request_timeout_secs: env_parsed(
                "CUBEINDEX_REQUEST_TIMEOUT",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
            data_dir: env::var("CUBEINDEX_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR)),
            staging_dir: env::var("CUBEINDEX_STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir().join(DEFAULT_STAGING_DIR_NAME)),
            stores_file,
            stores_file_explicit,
            git_author_name: env::var("CUBEINDEX_GIT_AUTHOR_NAME")
                .unwrap_or_else(|_| DEFAULT_GIT_AUTHOR_NAME.to_string()),
            git_author_email: env::var("CUBEINDEX_GIT_AUTHOR_EMAIL")
                .unwrap_or_else(|_| DEFAULT_GIT_AUTHOR_EMAIL.to_string()),
            commit_message: env::var("CUBEINDEX_COMMIT_MESSAGE")
                .unwrap_or_else(|_| DEFAULT_COMMIT_MESSAGE.to_string()),
            max_parallel: env_parsed("CUBEINDEX_MAX_PARALLEL", DEFAULT_MAX_PARALLEL),
        }
    }
}

impl CubeIndexConfig {
    /// Validates ranges and formats of the configured values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_limit == 0 || self.page_limit > MAX_PAGE_LIMIT {
            return Err(ConfigError::ValidationFailed(format!(
                "Page limit must be between 1 and {}, got {}",
                MAX_PAGE_LIMIT, self.page_limit
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Data directory must not be empty".to_string(),
            ));
        }

        if self.git_author_name.trim().is_empty() || !self.git_author_email.contains('@') {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid commit identity: {} <{}>",
                self.git_author_name, self.git_author_email
            )));
        }

        if self.commit_message.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Commit message template must not be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Built-in stores merged with the stores file, if one is configured.
    ///
    /// A default-location stores file that does not exist is ignored; an
    /// explicitly configured one must exist.
    pub fn load_registry(&self) -> Result<StoreRegistry, ConfigError> {
        let builtin = StoreRegistry::builtin();
        let Some(path) = &self.stores_file else {
            return Ok(builtin);
        };

        if !path.exists() && !self.stores_file_explicit {
            return Ok(builtin);
        }

        let extra = StoreRegistry::load(path)?;
        Ok(builtin.merge(extra))
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("log_level".to_string(), self.log_level.clone());
        map.insert("page_limit".to_string(), self.page_limit.to_string());
        map.insert("page_delay_ms".to_string(), self.page_delay_ms.to_string());
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert("data_dir".to_string(), self.data_dir.display().to_string());
        map.insert(
            "staging_dir".to_string(),
            self.staging_dir.display().to_string(),
        );
        if let Some(ref file) = self.stores_file {
            map.insert("stores_file".to_string(), file.display().to_string());
        }
        map.insert(
            "git_author".to_string(),
            format!("{} <{}>", self.git_author_name, self.git_author_email),
        );
        map.insert("commit_message".to_string(), self.commit_message.clone());
        map.insert("max_parallel".to_string(), self.max_parallel.to_string());

        map
    }
}

impl fmt::Display for CubeIndexConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CubeIndex Configuration:")?;
        writeln!(f, "  Page Limit: {}", self.page_limit)?;
        writeln!(f, "  Page Delay: {}ms", self.page_delay_ms)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Data Dir: {}", self.data_dir.display())?;
        writeln!(f, "  Staging Dir: {}", self.staging_dir.display())?;
        if let Some(ref file) = self.stores_file {
            writeln!(f, "  Stores File: {}", file.display())?;
        }
        writeln!(
            f,
            "  Commit Author: {} <{}>",
            self.git_author_name, self.git_author_email
        )?;
        writeln!(f, "  Max Parallel: {}", self.max_parallel)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    fn base_config() -> CubeIndexConfig {
        CubeIndexConfig {
            log_level: "info".to_string(),
            page_limit: 250,
            page_delay_ms: 700,
            request_timeout_secs: 15,
            data_dir: PathBuf::from("stores_products"),
            staging_dir: PathBuf::from("/tmp/artifacts"),
            stores_file: None,
            stores_file_explicit: false,
            git_author_name: DEFAULT_GIT_AUTHOR_NAME.to_string(),
            git_author_email: DEFAULT_GIT_AUTHOR_EMAIL.to_string(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            max_parallel: 0,
        }
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = vec![
            EnvGuard::unset("CUBEINDEX_PAGE_LIMIT"),
            EnvGuard::unset("CUBEINDEX_PAGE_DELAY_MS"),
            EnvGuard::unset("CUBEINDEX_REQUEST_TIMEOUT"),
            EnvGuard::unset("CUBEINDEX_DATA_DIR"),
            EnvGuard::unset("CUBEINDEX_STORES_FILE"),
            EnvGuard::unset("CUBEINDEX_GIT_AUTHOR_NAME"),
            EnvGuard::set("CUBEINDEX_LOG_LEVEL", DEFAULT_LOG_LEVEL),
        ];

        let config = CubeIndexConfig::default();

        assert_eq!(config.page_limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(config.page_delay_ms, DEFAULT_PAGE_DELAY_MS);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert!(!config.stores_file_explicit);
        assert_eq!(config.git_author_name, DEFAULT_GIT_AUTHOR_NAME);
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _guards = vec![
            EnvGuard::set("CUBEINDEX_PAGE_LIMIT", "50"),
            EnvGuard::set("CUBEINDEX_PAGE_DELAY_MS", "0"),
            EnvGuard::set("CUBEINDEX_REQUEST_TIMEOUT", "30"),
            EnvGuard::set("CUBEINDEX_DATA_DIR", "/data/catalogues"),
            EnvGuard::set("CUBEINDEX_LOG_LEVEL", "DEBUG"),
            EnvGuard::set("CUBEINDEX_MAX_PARALLEL", "3"),
            EnvGuard::set("CUBEINDEX_STORES_FILE", "/etc/cubeindex/stores.toml"),
        ];

        let config = CubeIndexConfig::default();

        assert_eq!(config.page_limit, 50);
        assert_eq!(config.page_delay(), Duration::ZERO);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.data_dir, PathBuf::from("/data/catalogues"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.max_parallel, 3);
        assert!(config.stores_file_explicit);
    }

    #[test]
    fn test_validation_valid() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validation_page_limit_bounds() {
        let mut config = base_config();
        config.page_limit = 0;
        assert!(config.validate().is_err());
        config.page_limit = 251;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_timeout() {
        let mut config = base_config();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_identity() {
        let mut config = base_config();
        config.git_author_email = "not-an-email".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = base_config();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_registry_ignores_missing_default_file() {
        let mut config = base_config();
        config.stores_file = Some(PathBuf::from("/definitely/not/here/stores.toml"));
        let registry = config.load_registry().unwrap();
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn test_load_registry_requires_explicit_file() {
        let mut config = base_config();
        config.stores_file = Some(PathBuf::from("/definitely/not/here/stores.toml"));
        config.stores_file_explicit = true;
        assert!(matches!(
            config.load_registry(),
            Err(ConfigError::Registry(RegistryError::Io { .. }))
        ));
    }

    #[test]
    fn test_load_registry_merges_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stores.toml");
        std::fs::write(
            &path,
            "[stores]\nkill-cubes = \"https://killcubes.example/products.json\"\n",
        )
        .unwrap();

        let mut config = base_config();
        config.stores_file = Some(path);
        config.stores_file_explicit = true;

        let registry = config.load_registry().unwrap();
        assert_eq!(registry.len(), 8);
    }

    #[test]
    fn test_config_display() {
        let display = format!("{}", base_config());
        assert!(display.contains("CubeIndex Configuration:"));
        assert!(display.contains("github-actions[bot]"));
    }

    #[test]
    fn test_display_map() {
        let map = base_config().to_display_map();
        assert_eq!(map.get("page_limit").map(String::as_str), Some("250"));
        assert!(map.contains_key("git_author"));
    }
}
