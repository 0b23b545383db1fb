//! Storage traits and error types
//!
//! This module defines the interface persistence backends implement and
//! the associated error types.

use crate::record::NormalizedRecord;
use crate::storage::ProgressRecord;
use crate::state::Checkpoint;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Store returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid stored row: {0}")]
    InvalidRow(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Keyed-upsert persistence backend
///
/// Records are keyed by `external_id`; the progress row is a singleton.
/// Every operation is idempotent, so callers may retry freely.
#[allow(async_fn_in_trait)]
pub trait Store {
    // ===== Progress =====

    /// Reads the singleton progress row, if one was ever written
    async fn load_checkpoint(&self) -> StorageResult<Option<ProgressRecord>>;

    /// Overwrites the singleton progress row
    ///
    /// # Arguments
    ///
    /// * `checkpoint` - The last fully committed page
    /// * `config_hash` - Hash of the sweep configuration that produced it
    async fn save_checkpoint(&self, checkpoint: &Checkpoint, config_hash: &str)
        -> StorageResult<()>;

    // ===== Records =====

    /// Upserts one batch of records; later values replace earlier ones
    async fn upsert_records(&self, records: &[NormalizedRecord]) -> StorageResult<()>;
}
