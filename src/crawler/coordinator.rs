//! Sweep coordinator - main traversal logic
//!
//! This module contains the sweep loop that ties the other components
//! together, including:
//! - Resuming from the stored checkpoint
//! - Walking (year, region, page) in fixed order
//! - Gating every billed call on the quota tracker
//! - Persisting each page and then committing the checkpoint
//! - Reporting a run summary

use crate::config::Config;
use crate::crawler::catalog::{CatalogWalker, Fetched};
use crate::crawler::detail::DetailEnricher;
use crate::crawler::endpoint::ApiEndpoint;
use crate::crawler::executor::{build_http_client, Executor};
use crate::record::NormalizedRecord;
use crate::retry::{AttemptError, RetryPolicy};
use crate::state::{Checkpoint, Region};
use crate::storage::{BatchPersister, Store};
use crate::SweepError;
use std::fmt;
use std::time::Instant;

/// How a run ended; every variant maps to exit code 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every (year, region) pair was swept and the sentinel checkpoint written
    Done,

    /// The upstream quota ran out; the checkpoint names the last committed page
    QuotaExit,

    /// The stored checkpoint already lies past the configured range
    AlreadyComplete,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Done => "done",
            Self::QuotaExit => "quota exit",
            Self::AlreadyComplete => "already complete",
        };
        f.write_str(label)
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_listed: usize,
    pub items_enriched: usize,
    pub detail_failures: usize,
    pub records_persisted: usize,
    pub batches_dropped: usize,
    pub records_dropped: usize,
}

/// Where traversal begins: a pair index plus the first page to list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StartPoint {
    year: i32,
    region_index: usize,
    page: u32,
}

enum PairOutcome {
    Finished,
    QuotaExit,
}

/// Main sweep coordinator structure
pub struct Coordinator<S: Store> {
    config: Config,
    config_hash: String,
    executor: Executor,
    walker: CatalogWalker,
    enricher: DetailEnricher,
    persister: BatchPersister,
    store: S,
    summary: RunSummary,
}

impl<S: Store> Coordinator<S> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration with secrets attached
    /// * `config_hash` - Hash of the sweep section, stored with every checkpoint
    /// * `store` - Destination for records and checkpoints
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(SweepError)` - The HTTP client or API endpoint could not be built
    pub fn new(config: Config, config_hash: String, store: S) -> Result<Self, SweepError> {
        let policy = RetryPolicy::from_config(&config.retry);
        let client = build_http_client(&config.api)?;
        let endpoint = ApiEndpoint::new(&config.api.base_url, &config.secrets.tmdb_api_key)?;

        let executor = Executor::new(client, policy.clone());
        let walker = CatalogWalker::new(endpoint.clone(), &config.sweep.language_filter);
        let enricher = DetailEnricher::new(endpoint, &config.api.image_base_url);
        let persister = BatchPersister::new(config.store.batch_size, policy);

        Ok(Self {
            config,
            config_hash,
            executor,
            walker,
            enricher,
            persister,
            store,
            summary: RunSummary::default(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Runs the sweep until it completes or the quota runs out
    ///
    /// Only a failure to read the stored checkpoint is returned as an
    /// error; failed calls and writes inside the sweep are logged and
    /// skipped.
    pub async fn run(&mut self) -> Result<RunOutcome, SweepError> {
        let started = Instant::now();

        let Some(start) = self.resume_point().await? else {
            tracing::info!(
                "Checkpoint lies past {}; nothing to sweep",
                self.config.sweep.end_year
            );
            return Ok(RunOutcome::AlreadyComplete);
        };

        tracing::info!(
            "Sweeping {}..={} over {} region(s), starting at {}/{} page {}",
            self.config.sweep.start_year,
            self.config.sweep.end_year,
            self.config.sweep.regions.len(),
            start.year,
            self.config.sweep.regions[start.region_index],
            start.page
        );

        let outcome = self.sweep_from(start).await;

        if outcome == RunOutcome::Done {
            let sentinel = Checkpoint::completed(
                self.config.sweep.end_year,
                self.config.sweep.regions[0].clone(),
            );
            self.save_checkpoint(&sentinel).await;
        }

        self.log_summary(outcome, started);
        Ok(outcome)
    }

    async fn sweep_from(&mut self, start: StartPoint) -> RunOutcome {
        let regions = self.config.sweep.regions.clone();

        for year in start.year..=self.config.sweep.end_year {
            for (index, region) in regions.iter().enumerate() {
                let first_page = if year == start.year {
                    if index < start.region_index {
                        continue;
                    }
                    if index == start.region_index {
                        start.page
                    } else {
                        1
                    }
                } else {
                    1
                };

                if let PairOutcome::QuotaExit = self.sweep_pair(year, region, first_page).await {
                    return RunOutcome::QuotaExit;
                }
            }
            tracing::info!("Finished year {}", year);
        }

        RunOutcome::Done
    }

    /// Lists, enriches and persists every page of one (year, region) pair
    async fn sweep_pair(&mut self, year: i32, region: &Region, first_page: u32) -> PairOutcome {
        let mut page = first_page;

        loop {
            if self.executor.quota().is_exhausted() {
                tracing::info!(
                    "Quota exhausted before listing {}/{} page {}",
                    year,
                    region,
                    page
                );
                self.save_checkpoint(&Checkpoint::before_page(year, region.clone(), page))
                    .await;
                return PairOutcome::QuotaExit;
            }

            let listing = match self
                .walker
                .list_page(&self.executor, year, region, page)
                .await
            {
                Fetched::Found(listing) => listing,
                Fetched::Empty => {
                    tracing::info!("{}/{}: no results at page {}", year, region, page);
                    return PairOutcome::Finished;
                }
                Fetched::Failed if self.executor.quota().is_exhausted() => {
                    tracing::info!(
                        "Quota exhausted while listing {}/{} page {}",
                        year,
                        region,
                        page
                    );
                    self.save_checkpoint(&Checkpoint::before_page(year, region.clone(), page))
                        .await;
                    return PairOutcome::QuotaExit;
                }
                Fetched::Failed => {
                    tracing::warn!(
                        "{}/{}: listing page {} unavailable, moving on",
                        year,
                        region,
                        page
                    );
                    return PairOutcome::Finished;
                }
            };
            self.summary.pages_listed += 1;

            let mut records: Vec<NormalizedRecord> = Vec::with_capacity(listing.items.len());
            for item in &listing.items {
                if self.executor.quota().is_exhausted() {
                    tracing::info!(
                        "Quota exhausted mid-page at {}/{} page {} ({} of {} items enriched)",
                        year,
                        region,
                        page,
                        records.len(),
                        listing.items.len()
                    );
                    self.persist(&records).await;
                    self.save_checkpoint(&Checkpoint::before_page(year, region.clone(), page))
                        .await;
                    return PairOutcome::QuotaExit;
                }

                match self.enricher.enrich(&self.executor, item.id).await {
                    Fetched::Found(record) => {
                        self.summary.items_enriched += 1;
                        records.push(record);
                    }
                    Fetched::Empty | Fetched::Failed => {
                        self.summary.detail_failures += 1;
                    }
                }
            }

            self.persist(&records).await;
            self.save_checkpoint(&Checkpoint::new(year, region.clone(), page))
                .await;

            tracing::info!(
                "{}/{} page {}/{}: {} record(s)",
                year,
                region,
                page,
                listing.total_pages,
                records.len()
            );

            if listing.is_last(page) {
                return PairOutcome::Finished;
            }
            page += 1;
        }
    }

    async fn persist(&mut self, records: &[NormalizedRecord]) {
        let report = self.persister.upsert_batches(&self.store, records).await;
        if !report.is_complete() {
            tracing::warn!(
                "{} of {} record(s) dropped after failed batch writes",
                report.dropped_records,
                records.len()
            );
        }
        self.summary.records_persisted += report.persisted;
        self.summary.batches_dropped += report.dropped_batches;
        self.summary.records_dropped += report.dropped_records;
    }

    /// Writes `checkpoint` with the shared retry policy
    ///
    /// Exhaustion is logged and swallowed.
    async fn save_checkpoint(&self, checkpoint: &Checkpoint) {
        let what = format!(
            "checkpoint save {}/{} page {}",
            checkpoint.year, checkpoint.region, checkpoint.page
        );
        let store = &self.store;
        let config_hash = self.config_hash.as_str();

        let result = self
            .executor
            .policy()
            .run(&what, |_| async move {
                store
                    .save_checkpoint(checkpoint, config_hash)
                    .await
                    .map_err(|e| AttemptError::Transient(e.to_string()))
            })
            .await;

        match result {
            Ok(()) => tracing::debug!("Saved {}", what),
            Err(e) => tracing::warn!("{}", e),
        }
    }

    /// Resolves the stored checkpoint into a start point
    ///
    /// Returns `None` when the checkpoint lies past the configured range.
    async fn resume_point(&self) -> Result<Option<StartPoint>, SweepError> {
        let sweep = &self.config.sweep;
        let fresh = StartPoint {
            year: sweep.start_year,
            region_index: 0,
            page: 1,
        };

        let Some(progress) = self.store.load_checkpoint().await? else {
            tracing::info!("No checkpoint found, starting a fresh sweep");
            return Ok(Some(fresh));
        };

        if progress.config_changed(&self.config_hash) {
            tracing::warn!(
                "Sweep configuration changed since the checkpoint was written; resuming anyway"
            );
        }

        let checkpoint = progress.checkpoint;
        tracing::info!(
            "Loaded checkpoint {}/{} page {} (written {})",
            checkpoint.year,
            checkpoint.region,
            checkpoint.page,
            progress.updated_at.as_deref().unwrap_or("at an unknown time")
        );

        if checkpoint.is_past(sweep.end_year) {
            return Ok(None);
        }

        if checkpoint.year < sweep.start_year {
            tracing::warn!(
                "Checkpoint year {} precedes start-year {}; starting at {}",
                checkpoint.year,
                sweep.start_year,
                sweep.start_year
            );
            return Ok(Some(fresh));
        }

        match sweep.regions.iter().position(|r| *r == checkpoint.region) {
            Some(region_index) => Ok(Some(StartPoint {
                year: checkpoint.year,
                region_index,
                page: checkpoint.next_page(),
            })),
            None => {
                tracing::warn!(
                    "Checkpoint region {} is not configured; restarting year {} at its first region",
                    checkpoint.region,
                    checkpoint.year
                );
                Ok(Some(StartPoint {
                    year: checkpoint.year,
                    region_index: 0,
                    page: 1,
                }))
            }
        }
    }

    fn log_summary(&self, outcome: RunOutcome, started: Instant) {
        let quota = self.executor.quota().snapshot();
        let s = &self.summary;
        tracing::info!(
            "Run finished ({}) in {:.1}s: {} page(s) listed, {} item(s) enriched, {} detail failure(s), {} record(s) persisted, {} batch(es) dropped ({} records); quota remaining {:?} of {:?}",
            outcome,
            started.elapsed().as_secs_f64(),
            s.pages_listed,
            s.items_enriched,
            s.detail_failures,
            s.records_persisted,
            s.batches_dropped,
            s.records_dropped,
            quota.remaining,
            quota.limit
        );
    }
}

/// Builds a coordinator over `store` and runs it to completion
pub async fn run_sweep<S: Store>(
    config: Config,
    config_hash: String,
    store: S,
) -> Result<RunOutcome, SweepError> {
    let mut coordinator = Coordinator::new(config, config_hash, store)?;
    coordinator.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    fn config_for(start_year: i32, end_year: i32) -> Config {
        let mut config = Config::default();
        config.sweep.start_year = start_year;
        config.sweep.end_year = end_year;
        config.secrets.tmdb_api_key = "test-key".to_string();
        config
    }

    fn coordinator(config: Config) -> Coordinator<SqliteStorage> {
        let store = SqliteStorage::new_in_memory().unwrap();
        Coordinator::new(config, "hash".to_string(), store).unwrap()
    }

    #[tokio::test]
    async fn test_fresh_start_point() {
        let coordinator = coordinator(config_for(2000, 2003));
        let start = coordinator.resume_point().await.unwrap().unwrap();
        assert_eq!(
            start,
            StartPoint {
                year: 2000,
                region_index: 0,
                page: 1
            }
        );
    }

    #[tokio::test]
    async fn test_resume_point_follows_checkpoint() {
        let coordinator = coordinator(config_for(2000, 2003));
        coordinator
            .store
            .save_checkpoint(&Checkpoint::new(2001, Region::india(), 3), "hash")
            .await
            .unwrap();

        let start = coordinator.resume_point().await.unwrap().unwrap();
        assert_eq!(
            start,
            StartPoint {
                year: 2001,
                region_index: 1,
                page: 4
            }
        );
    }

    #[tokio::test]
    async fn test_sentinel_means_already_complete() {
        let mut coordinator = coordinator(config_for(2000, 2003));
        coordinator
            .store
            .save_checkpoint(&Checkpoint::completed(2003, Region::us()), "hash")
            .await
            .unwrap();

        assert!(coordinator.resume_point().await.unwrap().is_none());
        assert_eq!(coordinator.run().await.unwrap(), RunOutcome::AlreadyComplete);
    }

    #[tokio::test]
    async fn test_unknown_region_restarts_year() {
        let coordinator = coordinator(config_for(2000, 2003));
        coordinator
            .store
            .save_checkpoint(&Checkpoint::new(2002, Region::parse("GB").unwrap(), 7), "other")
            .await
            .unwrap();

        let start = coordinator.resume_point().await.unwrap().unwrap();
        assert_eq!(
            start,
            StartPoint {
                year: 2002,
                region_index: 0,
                page: 1
            }
        );
    }

    #[tokio::test]
    async fn test_checkpoint_before_range_starts_fresh() {
        let coordinator = coordinator(config_for(2005, 2006));
        coordinator
            .store
            .save_checkpoint(&Checkpoint::new(2001, Region::us(), 2), "hash")
            .await
            .unwrap();

        let start = coordinator.resume_point().await.unwrap().unwrap();
        assert_eq!(start.year, 2005);
        assert_eq!(start.page, 1);
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let mut config = config_for(2000, 2001);
        config.api.base_url = "not a url".to_string();
        let store = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            Coordinator::new(config, String::new(), store),
            Err(SweepError::Config(_))
        ));
    }
}
