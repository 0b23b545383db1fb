//! PostgREST (Supabase) storage implementation
//!
//! Records are upserted with `on_conflict=external_id` and
//! `Prefer: resolution=merge-duplicates`; the checkpoint is a singleton
//! row keyed by `id = 1` in the progress table.

use crate::config::StoreConfig;
use crate::record::NormalizedRecord;
use crate::state::{Checkpoint, Region};
use crate::storage::schema::PROGRESS_ROW_ID;
use crate::storage::traits::{Store, StorageError, StorageResult};
use crate::storage::ProgressRecord;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

const MERGE_PREFERENCE: &str = "resolution=merge-duplicates,return=minimal";

/// Progress row as exchanged with the REST endpoint
#[derive(Debug, Serialize, Deserialize)]
struct ProgressRow {
    id: i64,
    year: i32,
    region: String,
    page: u32,
    config_hash: Option<String>,
    updated_at: Option<String>,
}

/// REST storage backend
pub struct RestStorage {
    client: Client,
    base_url: String,
    access_key: String,
    records_table: String,
    progress_table: String,
}

impl RestStorage {
    /// Creates a client for the store at `base_url`
    ///
    /// # Arguments
    ///
    /// * `base_url` - Project URL (e.g. `https://xyz.supabase.co`)
    /// * `access_key` - Service or anon key, sent as `apikey` and bearer token
    /// * `config` - Table names
    pub fn new(base_url: &str, access_key: &str, config: &StoreConfig) -> StorageResult<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key: access_key.to_string(),
            records_table: config.records_table.clone(),
            progress_table: config.progress_table.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.access_key)
            .bearer_auth(&self.access_key)
    }

    async fn upsert<T: Serialize + ?Sized>(
        &self,
        table: &str,
        conflict_key: &str,
        rows: &T,
    ) -> StorageResult<()> {
        let response = self
            .request(Method::POST, table)
            .query(&[("on_conflict", conflict_key)])
            .header("Prefer", MERGE_PREFERENCE)
            .json(rows)
            .send()
            .await
            .map_err(|e| StorageError::Request(e.without_url()))?;

        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> StorageResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::Http {
        status: status.as_u16(),
        body,
    })
}

impl Store for RestStorage {
    async fn load_checkpoint(&self) -> StorageResult<Option<ProgressRecord>> {
        let id_filter = format!("eq.{}", PROGRESS_ROW_ID);
        let response = self
            .request(Method::GET, &self.progress_table)
            .query(&[("id", id_filter.as_str()), ("select", "*")])
            .send()
            .await
            .map_err(|e| StorageError::Request(e.without_url()))?;

        let rows: Vec<ProgressRow> = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| StorageError::Request(e.without_url()))?;

        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        let region = Region::parse(&row.region)
            .map_err(|e| StorageError::InvalidRow(format!("progress region: {}", e)))?;

        Ok(Some(ProgressRecord {
            checkpoint: Checkpoint::new(row.year, region, row.page),
            config_hash: row.config_hash,
            updated_at: row.updated_at,
        }))
    }

    async fn save_checkpoint(
        &self,
        checkpoint: &Checkpoint,
        config_hash: &str,
    ) -> StorageResult<()> {
        let row = ProgressRow {
            id: PROGRESS_ROW_ID,
            year: checkpoint.year,
            region: checkpoint.region.to_string(),
            page: checkpoint.page,
            config_hash: Some(config_hash.to_string()),
            updated_at: Some(Utc::now().to_rfc3339()),
        };
        self.upsert(&self.progress_table, "id", &[row]).await
    }

    async fn upsert_records(&self, records: &[NormalizedRecord]) -> StorageResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.upsert(&self.records_table, "external_id", records)
            .await
    }
}
