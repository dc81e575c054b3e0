//! File-based storage backend implementation
//!
//! Each key owns two files under the base directory:
//! - `<stem>.members`: append-only log, one member per line
//! - `<stem>.meta.json`: optional expiry, replaced atomically
//!
//! The stem is the key with every byte outside `[A-Za-z0-9_-]` escaped as
//! `%XX`, so distinct keys never share files.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::storage::{
    config::FileConfig,
    error::{StorageError, StorageResult},
    traits::SetBackend,
    types::{expiry_from_now, ConnectionStatus, ExpiringSet, HealthStatus},
};

/// Persisted expiry metadata for one key
#[derive(Debug, Serialize, Deserialize)]
struct SetMeta {
    key: String,
    expires_at: Option<DateTime<Utc>>,
}

/// File-based storage backend
pub struct FileBackend {
    base_dir: PathBuf,
    cache: RwLock<HashMap<String, ExpiringSet>>,
}

impl FileBackend {
    /// Create a new file backend, creating the base directory if needed
    pub async fn new(config: &FileConfig) -> StorageResult<Self> {
        fs::create_dir_all(&config.base_dir).await?;
        info!(base_dir = %config.base_dir.display(), "Initialized file storage backend");

        Ok(Self {
            base_dir: config.base_dir.clone(),
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Directory holding the set files
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_stem(key: &str) -> String {
        let mut stem = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
                stem.push(byte as char);
            } else {
                stem.push_str(&format!("%{byte:02X}"));
            }
        }
        stem
    }

    fn members_path(&self, key: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.members", Self::file_stem(key)))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.meta.json", Self::file_stem(key)))
    }

    async fn read_set(&self, key: &str) -> StorageResult<ExpiringSet> {
        let mut set = ExpiringSet::default();

        match fs::read_to_string(self.members_path(key)).await {
            Ok(content) => {
                set.members = content
                    .lines()
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        match fs::read_to_string(self.meta_path(key)).await {
            Ok(content) => {
                let meta: SetMeta = serde_json::from_str(&content)?;
                set.expires_at = meta.expires_at;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        Ok(set)
    }

    async fn remove_files(&self, key: &str) -> StorageResult<bool> {
        let mut existed = false;
        for path in [self.members_path(key), self.meta_path(key)] {
            match fs::remove_file(&path).await {
                Ok(()) => existed = true,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(existed)
    }

    async fn write_meta(&self, key: &str, expires_at: Option<DateTime<Utc>>) -> StorageResult<()> {
        let meta = SetMeta {
            key: key.to_string(),
            expires_at,
        };
        let content = serde_json::to_string_pretty(&meta)?;

        let path = self.meta_path(key);
        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, &path).await?;
        Ok(())
    }

    async fn append_member(&self, key: &str, member: &str) -> StorageResult<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.members_path(key))
            .await?;
        file.write_all(format!("{member}\n").as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Make sure `key` is cached, discarding it (and its files) if expired.
    async fn load<'a>(
        &self,
        cache: &'a mut HashMap<String, ExpiringSet>,
        key: &str,
    ) -> StorageResult<&'a mut ExpiringSet> {
        if !cache.contains_key(key) {
            let set = self.read_set(key).await?;
            cache.insert(key.to_string(), set);
        }

        if cache.get(key).is_some_and(ExpiringSet::is_expired) {
            debug!(key, "Discarding expired set");
            self.remove_files(key).await?;
            cache.insert(key.to_string(), ExpiringSet::default());
        }

        Ok(cache.entry(key.to_string()).or_default())
    }
}

#[async_trait]
impl SetBackend for FileBackend {
    async fn set_add(&self, key: &str, member: &str) -> StorageResult<bool> {
        if member.contains('\n') {
            return Err(StorageError::serialization(format!(
                "set member for {key} contains a newline"
            )));
        }

        let mut cache = self.cache.write().await;
        let set = self.load(&mut cache, key).await?;
        if set.members.contains(member) {
            return Ok(false);
        }

        self.append_member(key, member).await?;
        set.members.insert(member.to_string());
        Ok(true)
    }

    async fn set_is_member(&self, key: &str, member: &str) -> StorageResult<bool> {
        let mut cache = self.cache.write().await;
        let set = self.load(&mut cache, key).await?;
        Ok(set.members.contains(member))
    }

    async fn set_members(&self, key: &str) -> StorageResult<Vec<String>> {
        let mut cache = self.cache.write().await;
        let set = self.load(&mut cache, key).await?;
        Ok(set.members.iter().cloned().collect())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StorageResult<bool> {
        let mut cache = self.cache.write().await;
        let set = self.load(&mut cache, key).await?;
        if set.members.is_empty() {
            return Ok(false);
        }

        let expires_at = expiry_from_now(ttl);
        set.expires_at = Some(expires_at);
        self.write_meta(key, Some(expires_at)).await?;
        Ok(true)
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut cache = self.cache.write().await;
        let had_members = self
            .load(&mut cache, key)
            .await
            .map(|set| !set.members.is_empty())?;
        cache.remove(key);
        let had_files = self.remove_files(key).await?;
        Ok(had_members || had_files)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let start = Instant::now();
        let (healthy, errors) = match fs::metadata(&self.base_dir).await {
            Ok(meta) if meta.is_dir() => (true, vec![]),
            Ok(_) => (false, vec!["base path is not a directory".to_string()]),
            Err(e) => (false, vec![e.to_string()]),
        };

        Ok(HealthStatus {
            healthy,
            backend_type: self.backend_type().to_string(),
            connection_status: if healthy {
                ConnectionStatus::Connected
            } else {
                ConnectionStatus::Disconnected
            },
            latency_ms: start.elapsed().as_millis() as u64,
            errors,
        })
    }

    fn backend_type(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn backend_in(dir: &TempDir) -> FileBackend {
        FileBackend::new(&FileConfig {
            base_dir: dir.path().to_path_buf(),
        })
        .await
        .unwrap()
    }

    #[test]
    fn test_file_stem_escapes_separators() {
        assert_eq!(
            FileBackend::file_stem("one_timer_script:widgets:checked"),
            "one_timer_script%3Awidgets%3Achecked"
        );
        assert_ne!(FileBackend::file_stem("a:b"), FileBackend::file_stem("a_b"));
        assert_eq!(FileBackend::file_stem("../x"), "%2E%2E%2Fx");
    }

    #[tokio::test]
    async fn test_members_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let backend = backend_in(&dir).await;
            assert!(backend.set_add("k", "1").await.unwrap());
            assert!(backend.set_add("k", "2").await.unwrap());
            assert!(!backend.set_add("k", "1").await.unwrap());
        }

        let reopened = backend_in(&dir).await;
        let mut members = reopened.set_members("k").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["1", "2"]);
        assert!(reopened.set_is_member("k", "2").await.unwrap());

        let log = std::fs::read_to_string(reopened.members_path("k")).unwrap();
        assert_eq!(log.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_expiry_persists_and_discards() {
        let dir = TempDir::new().unwrap();
        let backend = backend_in(&dir).await;
        backend.set_add("k", "1").await.unwrap();
        assert!(backend.expire("k", Duration::ZERO).await.unwrap());

        let reopened = backend_in(&dir).await;
        assert!(!reopened.set_is_member("k", "1").await.unwrap());
        assert!(!reopened.members_path("k").exists());
        assert!(!reopened.meta_path("k").exists());
    }

    #[tokio::test]
    async fn test_expire_with_future_ttl_keeps_members() {
        let dir = TempDir::new().unwrap();
        let backend = backend_in(&dir).await;
        backend.set_add("k", "1").await.unwrap();
        assert!(backend.expire("k", Duration::from_secs(3600)).await.unwrap());

        let reopened = backend_in(&dir).await;
        assert!(reopened.set_is_member("k", "1").await.unwrap());
        let meta = std::fs::read_to_string(reopened.meta_path("k")).unwrap();
        assert!(meta.contains("expires_at"));
    }

    #[tokio::test]
    async fn test_expire_missing_key() {
        let dir = TempDir::new().unwrap();
        let backend = backend_in(&dir).await;
        assert!(!backend.expire("missing", Duration::from_secs(5)).await.unwrap());
        assert!(!backend.meta_path("missing").exists());
    }

    #[tokio::test]
    async fn test_delete_removes_files() {
        let dir = TempDir::new().unwrap();
        let backend = backend_in(&dir).await;
        backend.set_add("k", "1").await.unwrap();

        assert!(backend.delete("k").await.unwrap());
        assert!(!backend.delete("k").await.unwrap());
        assert!(backend.set_members("k").await.unwrap().is_empty());
        assert!(!backend.members_path("k").exists());
    }

    #[tokio::test]
    async fn test_rejects_multiline_members() {
        let dir = TempDir::new().unwrap();
        let backend = backend_in(&dir).await;
        let err = backend.set_add("k", "1\n2").await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_health_check_reports_missing_dir() {
        let dir = TempDir::new().unwrap();
        let backend = backend_in(&dir).await;
        assert!(backend.health_check().await.unwrap().healthy);

        std::fs::remove_dir_all(dir.path()).unwrap();
        let health = backend.health_check().await.unwrap();
        assert!(!health.healthy);
        assert_eq!(health.connection_status, ConnectionStatus::Disconnected);
    }
}
