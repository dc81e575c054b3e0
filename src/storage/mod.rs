//! Storage abstraction layer for onepass
//!
//! Checkpoints only need named sets of strings with an optional time-to-live.
//! [`SetBackend`] captures that surface and each backend implements it:
//! Redis (behind the `redis` feature), a directory of append-only files, and
//! an in-memory map for tests.

pub mod backends;
pub mod config;
pub mod error;
pub mod factory;
pub mod traits;
pub mod types;

pub use backends::{FileBackend, MemoryBackend};
#[cfg(feature = "redis")]
pub use backends::RedisBackend;
pub use config::{BackendType, FileConfig, RedisConfig, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use factory::StorageFactory;
pub use traits::SetBackend;
pub use types::{ConnectionStatus, HealthStatus};
