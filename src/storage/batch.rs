//! Chunked, retried record persistence

use crate::record::NormalizedRecord;
use crate::retry::{AttemptError, RetryPolicy};
use crate::storage::traits::Store;

/// Outcome of persisting one page worth of records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub persisted: usize,
    pub dropped_batches: usize,
    pub dropped_records: usize,
}

impl PersistReport {
    pub fn is_complete(&self) -> bool {
        self.dropped_batches == 0
    }
}

/// Splits records into batches and upserts each with bounded retries
///
/// A batch that exhausts its attempts is logged and dropped; the remaining
/// batches are still written.
#[derive(Debug, Clone)]
pub struct BatchPersister {
    batch_size: usize,
    policy: RetryPolicy,
}

impl BatchPersister {
    pub fn new(batch_size: usize, policy: RetryPolicy) -> Self {
        Self {
            batch_size: batch_size.max(1),
            policy,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Upserts `records` in order, `batch_size` at a time
    pub async fn upsert_batches<S: Store>(
        &self,
        store: &S,
        records: &[NormalizedRecord],
    ) -> PersistReport {
        let mut report = PersistReport::default();

        for (index, batch) in records.chunks(self.batch_size).enumerate() {
            let what = format!("upsert batch {} ({} records)", index + 1, batch.len());
            let result = self
                .policy
                .run(&what, |_| async move {
                    store
                        .upsert_records(batch)
                        .await
                        .map_err(|e| AttemptError::Transient(e.to_string()))
                })
                .await;

            match result {
                Ok(()) => {
                    tracing::debug!("Persisted {}", what);
                    report.persisted += batch.len();
                }
                Err(e) => {
                    tracing::warn!("Dropping batch: {}", e);
                    report.dropped_batches += 1;
                    report.dropped_records += batch.len();
                }
            }
        }

        report
    }
}
