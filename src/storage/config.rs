//! Storage configuration types and utilities

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{StorageError, StorageResult};
use crate::checkpoint::DEFAULT_KEY_PREFIX;

/// Storage backend type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Redis (default, requires the `redis` feature)
    #[default]
    Redis,
    /// Directory of append-only set files
    File,
    /// Memory storage (for testing)
    Memory,
    /// No backend; checkpointing disabled
    None,
}

impl BackendType {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "redis" => Some(Self::Redis),
            "file" => Some(Self::File),
            "memory" => Some(Self::Memory),
            "none" | "off" | "disabled" => Some(Self::None),
            _ => None,
        }
    }
}

/// Main storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend type
    #[serde(default)]
    pub backend: BackendType,

    /// Leading component of every checkpoint key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Default timeout for backend operations
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,

    /// Redis connection settings
    #[serde(default)]
    pub redis: RedisConfig,

    /// File backend settings
    #[serde(default)]
    pub file: FileConfig,
}

/// Redis storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://localhost:6379`
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Maximum pooled connections
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Logical database index
    #[serde(default)]
    pub database: u32,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_pool_size(),
            database: 0,
        }
    }
}

/// File storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// Directory holding the set files
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
        }
    }
}

// Default value functions for serde
fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_pool_size() -> usize {
    4
}

fn default_base_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".onepass").join("checkpoints"))
        .unwrap_or_else(|| PathBuf::from("/tmp").join(".onepass").join("checkpoints"))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            key_prefix: default_key_prefix(),
            timeout: default_timeout(),
            redis: RedisConfig::default(),
            file: FileConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Configuration for the in-memory backend
    pub fn memory() -> Self {
        Self {
            backend: BackendType::Memory,
            ..Self::default()
        }
    }

    /// Configuration for the file backend rooted at `base_dir`
    pub fn file(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendType::File,
            file: FileConfig {
                base_dir: base_dir.into(),
            },
            ..Self::default()
        }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> StorageResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// Recognised variables: `ONEPASS_STORAGE_TYPE`, `ONEPASS_REDIS_URL`
    /// (falling back to `REDIS_URL`), `ONEPASS_REDIS_DB`, `ONEPASS_STORAGE_DIR`
    /// and `ONEPASS_KEY_PREFIX`. An unknown backend name is a configuration
    /// error; a blank one is ignored.
    pub fn from_lookup<F>(lookup: F) -> StorageResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("ONEPASS_STORAGE_TYPE").filter(|s| !s.trim().is_empty()) {
            config.backend = BackendType::parse(&name).ok_or_else(|| {
                StorageError::configuration(format!(
                    "Unknown ONEPASS_STORAGE_TYPE '{name}' (expected redis, file, memory or none)"
                ))
            })?;
        }

        if let Some(url) = lookup("ONEPASS_REDIS_URL").or_else(|| lookup("REDIS_URL")) {
            config.redis.url = url;
        }

        if let Some(db) = lookup("ONEPASS_REDIS_DB").and_then(|s| s.trim().parse().ok()) {
            config.redis.database = db;
        }

        if let Some(dir) = lookup("ONEPASS_STORAGE_DIR") {
            config.file.base_dir = PathBuf::from(dir);
        }

        if let Some(prefix) = lookup("ONEPASS_KEY_PREFIX").filter(|p| !p.trim().is_empty()) {
            config.key_prefix = prefix.trim().to_string();
        }

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> StorageResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            StorageError::configuration(format!(
                "Failed to parse storage config {}: {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_backend_type_default() {
        assert_eq!(BackendType::default(), BackendType::Redis);
    }

    #[test]
    fn test_backend_type_serialization() {
        let json = serde_json::to_string(&BackendType::File).unwrap();
        assert_eq!(json, r#""file""#);

        let backend: BackendType = serde_json::from_str(r#""none""#).unwrap();
        assert_eq!(backend, BackendType::None);
    }

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();

        assert_eq!(config.backend, BackendType::Redis);
        assert_eq!(config.key_prefix, "one_timer_script");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.redis.url, "redis://127.0.0.1:6379");
        assert!(config.file.base_dir.ends_with(".onepass/checkpoints"));
    }

    #[test]
    fn test_from_lookup_without_variables_uses_defaults() {
        let config = StorageConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.backend, BackendType::Redis);
        assert_eq!(config.redis.database, 0);
    }

    #[test]
    fn test_from_lookup_file_backend() {
        let config = StorageConfig::from_lookup(lookup_from(&[
            ("ONEPASS_STORAGE_TYPE", "File"),
            ("ONEPASS_STORAGE_DIR", "/custom/path"),
        ]))
        .unwrap();

        assert_eq!(config.backend, BackendType::File);
        assert_eq!(config.file.base_dir, PathBuf::from("/custom/path"));
    }

    #[test]
    fn test_from_lookup_key_prefix() {
        let config =
            StorageConfig::from_lookup(lookup_from(&[("ONEPASS_KEY_PREFIX", "backfill")])).unwrap();
        assert_eq!(config.key_prefix, "backfill");

        let config =
            StorageConfig::from_lookup(lookup_from(&[("ONEPASS_KEY_PREFIX", "  ")])).unwrap();
        assert_eq!(config.key_prefix, "one_timer_script");
    }

    #[test]
    fn test_from_lookup_redis_url_fallback() {
        let config = StorageConfig::from_lookup(lookup_from(&[
            ("REDIS_URL", "redis://cache:6380"),
            ("ONEPASS_REDIS_DB", "3"),
        ]))
        .unwrap();
        assert_eq!(config.redis.url, "redis://cache:6380");
        assert_eq!(config.redis.database, 3);

        let config = StorageConfig::from_lookup(lookup_from(&[
            ("REDIS_URL", "redis://cache:6380"),
            ("ONEPASS_REDIS_URL", "redis://primary:6379"),
        ]))
        .unwrap();
        assert_eq!(config.redis.url, "redis://primary:6379");
    }

    #[test]
    fn test_from_lookup_rejects_unknown_type() {
        let err = StorageConfig::from_lookup(lookup_from(&[("ONEPASS_STORAGE_TYPE", "fle")]))
            .unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));
        assert!(err.to_string().contains("'fle'"));

        let config =
            StorageConfig::from_lookup(lookup_from(&[("ONEPASS_STORAGE_TYPE", " ")])).unwrap();
        assert_eq!(config.backend, BackendType::Redis);
    }

    #[test]
    fn test_from_file_parses_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("storage.toml");
        std::fs::write(
            &path,
            r#"
backend = "file"
timeout = "5s"

[file]
base_dir = "/var/lib/onepass"
"#,
        )
        .unwrap();

        let config = StorageConfig::from_file(&path).unwrap();
        assert_eq!(config.backend, BackendType::File);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.file.base_dir, PathBuf::from("/var/lib/onepass"));
        assert_eq!(config.redis.pool_size, 4);
    }

    #[test]
    fn test_from_file_rejects_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("storage.toml");
        std::fs::write(&path, "backend = [").unwrap();

        let err = StorageConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));
    }
}
