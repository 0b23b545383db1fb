//! Database schema definitions for the SQLite backend

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Normalized movie records, one row per upstream id
CREATE TABLE IF NOT EXISTS records (
    external_id INTEGER PRIMARY KEY,
    imdb_id TEXT,
    title TEXT,
    plot TEXT,
    year INTEGER,
    runtime INTEGER,
    poster TEXT,
    cast_names TEXT NOT NULL DEFAULT '[]',
    genres TEXT NOT NULL DEFAULT '[]',
    trailer TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    original_language TEXT,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_year ON records(year);

-- Singleton sweep checkpoint
CREATE TABLE IF NOT EXISTS progress (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    year INTEGER NOT NULL,
    region TEXT NOT NULL,
    page INTEGER NOT NULL,
    config_hash TEXT,
    updated_at TEXT NOT NULL
);
"#;

/// Key of the only progress row
pub const PROGRESS_ROW_ID: i64 = 1;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
