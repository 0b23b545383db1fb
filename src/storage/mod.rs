//! Storage module for persisting sweep output
//!
//! This module handles every write the sweep makes, including:
//! - Keyed upserts of normalized records
//! - The singleton progress row used for resumption
//! - Bounded, retried batch writes
//!
//! Two backends implement [`Store`]: a PostgREST endpoint (the hosted
//! deployment) and a local SQLite file.

mod batch;
mod rest;
mod schema;
mod sqlite;
mod traits;

pub use batch::{BatchPersister, PersistReport};
pub use rest::RestStorage;
pub use sqlite::SqliteStorage;
pub use traits::{Store, StorageError, StorageResult};

use crate::state::Checkpoint;
use crate::SweepError;

use std::path::Path;

/// Opens (or creates) a SQLite store
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(SweepError)` - Failed to open the file or create the schema
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SweepError> {
    Ok(SqliteStorage::new(path)?)
}

/// The persisted progress row
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub checkpoint: Checkpoint,
    pub config_hash: Option<String>,
    pub updated_at: Option<String>,
}

impl ProgressRecord {
    /// Whether this row was written under a different sweep configuration
    ///
    /// Rows written before hashes were recorded are not considered mismatched.
    pub fn config_changed(&self, current_hash: &str) -> bool {
        self.config_hash
            .as_deref()
            .is_some_and(|stored| stored != current_hash)
    }
}
