//! Storage factory for creating backend instances

use std::sync::Arc;
use tracing::{info, warn};

use super::backends::{FileBackend, MemoryBackend};
#[cfg(feature = "redis")]
use super::backends::RedisBackend;
use super::config::{BackendType, StorageConfig};
use super::error::StorageResult;
use super::traits::SetBackend;

/// Factory for creating storage backends
pub struct StorageFactory;

impl StorageFactory {
    /// Create a backend from environment configuration
    pub async fn from_env() -> StorageResult<Option<Arc<dyn SetBackend>>> {
        Self::from_config(&StorageConfig::from_env()?).await
    }

    /// Create a backend from explicit configuration.
    ///
    /// Returns `None` when the configuration disables checkpointing.
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Option<Arc<dyn SetBackend>>> {
        let backend: Arc<dyn SetBackend> = match config.backend {
            BackendType::None => {
                info!("Checkpoint storage disabled");
                return Ok(None);
            }
            BackendType::Memory => Arc::new(MemoryBackend::new()),
            BackendType::File => Arc::new(FileBackend::new(&config.file).await?),
            #[cfg(feature = "redis")]
            BackendType::Redis => Arc::new(RedisBackend::new(&config.redis, config.timeout).await?),
            #[cfg(not(feature = "redis"))]
            BackendType::Redis => {
                return Err(super::error::StorageError::configuration(
                    "Redis backend not enabled. Enable with --features redis",
                ))
            }
        };

        let health = backend.health_check().await?;
        if health.healthy {
            info!(backend = %health, "Created checkpoint storage backend");
        } else {
            warn!(backend = %health, "Checkpoint storage backend reports unhealthy");
        }
        Ok(Some(backend))
    }
}
