//! TMDb Sweep: a resumable, quota-bounded catalog ingester
//!
//! This crate walks the TMDb discover endpoint across a configured range of
//! release years and regions, enriches every listed movie with a detail fetch,
//! and upserts normalized records into a keyed store. Progress is checkpointed
//! after every page so an interrupted or quota-limited run can resume.

pub mod config;
pub mod crawler;
pub mod record;
pub mod retry;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Missing required environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid region code: {0}")]
    InvalidRegion(String),
}

/// Result type alias for sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, RunOutcome};
pub use record::NormalizedRecord;
pub use state::{Checkpoint, QuotaState, Region};
