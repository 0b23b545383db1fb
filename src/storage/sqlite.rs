//! SQLite storage implementation
//!
//! This module provides a local, file-backed implementation of the Store trait.

use crate::record::NormalizedRecord;
use crate::state::{Checkpoint, Region};
use crate::storage::schema::{initialize_schema, PROGRESS_ROW_ID};
use crate::storage::traits::{Store, StorageError, StorageResult};
use crate::storage::ProgressRecord;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const UPSERT_RECORD_SQL: &str = "
    INSERT INTO records (
        external_id, imdb_id, title, plot, year, runtime, poster,
        cast_names, genres, trailer, tags, original_language, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
    ON CONFLICT(external_id) DO UPDATE SET
        imdb_id = excluded.imdb_id,
        title = excluded.title,
        plot = excluded.plot,
        year = excluded.year,
        runtime = excluded.runtime,
        poster = excluded.poster,
        cast_names = excluded.cast_names,
        genres = excluded.genres,
        trailer = excluded.trailer,
        tags = excluded.tags,
        original_language = excluded.original_language,
        updated_at = excluded.updated_at
";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path` and initializes the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Counts stored records
    pub fn count_records(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Loads one record by its upstream id
    pub fn get_record(&self, external_id: i64) -> StorageResult<Option<NormalizedRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT external_id, imdb_id, title, plot, year, runtime, poster,
                 cast_names, genres, trailer, tags, original_language
                 FROM records WHERE external_id = ?1",
                params![external_id],
                |row| {
                    Ok((
                        NormalizedRecord {
                            external_id: row.get(0)?,
                            imdb_id: row.get(1)?,
                            title: row.get(2)?,
                            plot: row.get(3)?,
                            year: row.get(4)?,
                            runtime: row.get(5)?,
                            poster: row.get(6)?,
                            cast: Vec::new(),
                            genres: Vec::new(),
                            trailer: row.get(9)?,
                            tags: Vec::new(),
                            original_language: row.get(11)?,
                        },
                        row.get::<_, String>(7)?,
                        row.get::<_, String>(8)?,
                        row.get::<_, String>(10)?,
                    ))
                },
            )
            .optional()?;

        let Some((mut record, cast, genres, tags)) = row else {
            return Ok(None);
        };
        record.cast = serde_json::from_str(&cast)?;
        record.genres = serde_json::from_str(&genres)?;
        record.tags = serde_json::from_str(&tags)?;
        Ok(Some(record))
    }

    /// Lists stored ids in ascending order
    pub fn record_ids(&self) -> StorageResult<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT external_id FROM records ORDER BY external_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }
}

impl Store for SqliteStorage {
    async fn load_checkpoint(&self) -> StorageResult<Option<ProgressRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT year, region, page, config_hash, updated_at FROM progress WHERE id = ?1",
                params![PROGRESS_ROW_ID],
                |row| {
                    Ok((
                        row.get::<_, i32>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((year, region, page, config_hash, updated_at)) = row else {
            return Ok(None);
        };

        let region = Region::parse(&region)
            .map_err(|e| StorageError::InvalidRow(format!("progress region: {}", e)))?;

        Ok(Some(ProgressRecord {
            checkpoint: Checkpoint::new(year, region, page),
            config_hash,
            updated_at: Some(updated_at),
        }))
    }

    async fn save_checkpoint(
        &self,
        checkpoint: &Checkpoint,
        config_hash: &str,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO progress (id, year, region, page, config_hash, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                year = excluded.year,
                region = excluded.region,
                page = excluded.page,
                config_hash = excluded.config_hash,
                updated_at = excluded.updated_at",
            params![
                PROGRESS_ROW_ID,
                checkpoint.year,
                checkpoint.region.as_str(),
                checkpoint.page,
                config_hash,
                now
            ],
        )?;
        Ok(())
    }

    async fn upsert_records(&self, records: &[NormalizedRecord]) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_RECORD_SQL)?;
            for record in records {
                stmt.execute(params![
                    record.external_id,
                    record.imdb_id,
                    record.title,
                    record.plot,
                    record.year,
                    record.runtime,
                    record.poster,
                    serde_json::to_string(&record.cast)?,
                    serde_json::to_string(&record.genres)?,
                    record.trailer,
                    serde_json::to_string(&record.tags)?,
                    record.original_language,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
