//! Integration tests for the sweep
//!
//! These tests use wiremock as the catalog API and a SQLite file as the
//! store, and drive the full coordinator loop end-to-end.

use serde_json::{json, Value};
use tempfile::TempDir;
use tmdb_sweep::config::{compute_config_hash, Config, RetryConfig, StoreBackend};
use tmdb_sweep::crawler::{Coordinator, RunOutcome, DETAIL_APPEND};
use tmdb_sweep::state::{Checkpoint, Region};
use tmdb_sweep::storage::{SqliteStorage, Store};
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server
fn create_test_config(server: &MockServer, start_year: i32, end_year: i32) -> Config {
    let mut config = Config::default();
    config.sweep.start_year = start_year;
    config.sweep.end_year = end_year;
    config.api.base_url = server.uri();
    config.retry = RetryConfig {
        max_attempts: 3,
        retry_delay_ms: 1,
        rate_limit_fallback_ms: 1,
    };
    config.store.backend = StoreBackend::Sqlite;
    config.store.batch_size = 2;
    config.secrets.tmdb_api_key = "test-key".to_string();
    config
}

fn open_store(dir: &TempDir) -> SqliteStorage {
    SqliteStorage::new(&dir.path().join("sweep.db")).expect("Failed to open store")
}

fn coordinator(config: Config, store: SqliteStorage) -> Coordinator<SqliteStorage> {
    let hash = compute_config_hash(&config.sweep).unwrap();
    Coordinator::new(config, hash, store).expect("Failed to build coordinator")
}

fn listing(year: i32, region: &str, page: u32) -> MockBuilder {
    Mock::given(method("GET"))
        .and(path("/discover/movie"))
        .and(query_param("primary_release_year", year.to_string()))
        .and(query_param("region", region))
        .and(query_param("page", page.to_string()))
}

fn listing_body(ids: &[i64], total_pages: u32) -> Value {
    let results: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "title": format!("Movie {}", id)}))
        .collect();
    json!({"page": 1, "results": results, "total_pages": total_pages})
}

/// Mounts one listing page that must be requested exactly once
async fn mount_listing(
    server: &MockServer,
    year: i32,
    region: &str,
    page: u32,
    ids: &[i64],
    total_pages: u32,
) {
    listing(year, region, page)
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(ids, total_pages)))
        .expect(1)
        .mount(server)
        .await;
}

/// Mounts a listing page that must never be requested
async fn forbid_listing(server: &MockServer, year: i32, region: &str, page: u32) {
    listing(year, region, page)
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(&[999], 1)))
        .expect(0)
        .mount(server)
        .await;
}

fn detail(id: i64) -> MockBuilder {
    Mock::given(method("GET"))
        .and(path(format!("/movie/{}", id)))
        .and(query_param("append_to_response", DETAIL_APPEND))
}

fn detail_body(id: i64) -> Value {
    json!({
        "id": id,
        "title": format!("Movie {}", id),
        "overview": "A plot.",
        "release_date": "2001-05-01",
        "runtime": 100,
        "poster_path": "/poster.jpg",
        "genres": [{"id": 18, "name": "Drama"}],
        "original_language": "en",
        "credits": {"cast": [{"name": "Lead"}, {"name": "Support"}]},
        "videos": {"results": [{"site": "YouTube", "type": "Trailer", "key": "abc"}]},
        "external_ids": {"imdb_id": format!("tt{:07}", id)},
        "keywords": {"keywords": [{"name": "drama"}]}
    })
}

async fn mount_details(server: &MockServer, ids: &[i64]) {
    for &id in ids {
        detail(id)
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_body(id)))
            .mount(server)
            .await;
    }
}

async fn stored_checkpoint(store: &SqliteStorage) -> Option<Checkpoint> {
    store
        .load_checkpoint()
        .await
        .expect("Failed to load checkpoint")
        .map(|progress| progress.checkpoint)
}

#[tokio::test]
async fn test_resume_targets_next_page_and_skips_earlier_pairs() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, 2000, 2001);
    let hash = compute_config_hash(&config.sweep).unwrap();

    let store = open_store(&dir);
    store
        .save_checkpoint(&Checkpoint::new(2001, Region::us(), 3), &hash)
        .await
        .unwrap();

    forbid_listing(&server, 2000, "US", 1).await;
    forbid_listing(&server, 2000, "IN", 1).await;
    for page in 1..=3 {
        forbid_listing(&server, 2001, "US", page).await;
    }
    mount_listing(&server, 2001, "US", 4, &[1], 4).await;
    mount_listing(&server, 2001, "IN", 1, &[2], 1).await;
    mount_details(&server, &[1, 2]).await;

    let mut coordinator = coordinator(config, store);
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Done);
    assert_eq!(coordinator.store().record_ids().unwrap(), vec![1, 2]);
    assert_eq!(
        stored_checkpoint(coordinator.store()).await,
        Some(Checkpoint::new(2002, Region::us(), 0))
    );
}

#[tokio::test]
async fn test_quota_gate_blocks_detail_calls() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, 2001, 2001);

    listing(2001, "US", 1)
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-ratelimit-remaining", "1")
                .insert_header("x-ratelimit-limit", "40")
                .set_body_json(listing_body(&[10, 11], 3)),
        )
        .expect(1)
        .mount(&server)
        .await;
    forbid_listing(&server, 2001, "US", 2).await;
    forbid_listing(&server, 2001, "IN", 1).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/movie/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body(10)))
        .expect(0)
        .mount(&server)
        .await;

    let mut coordinator = coordinator(config, open_store(&dir));
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::QuotaExit);
    assert_eq!(coordinator.store().count_records().unwrap(), 0);
    assert_eq!(
        stored_checkpoint(coordinator.store()).await,
        Some(Checkpoint::new(2001, Region::us(), 0))
    );
}

#[tokio::test]
async fn test_quota_exhausted_mid_page_keeps_partial_records() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, 2001, 2001);

    listing(2001, "US", 1)
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-ratelimit-remaining", "10")
                .set_body_json(listing_body(&[20, 21], 2)),
        )
        .expect(1)
        .mount(&server)
        .await;
    detail(20)
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-ratelimit-remaining", "1")
                .set_body_json(detail_body(20)),
        )
        .expect(1)
        .mount(&server)
        .await;
    detail(21)
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_body(21)))
        .expect(0)
        .mount(&server)
        .await;

    let mut coordinator = coordinator(config, open_store(&dir));
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::QuotaExit);
    assert_eq!(coordinator.store().record_ids().unwrap(), vec![20]);
    assert_eq!(
        stored_checkpoint(coordinator.store()).await,
        Some(Checkpoint::new(2001, Region::us(), 0))
    );
}

#[tokio::test]
async fn test_quota_exhausted_between_pages_commits_finished_page() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, 2001, 2001);

    mount_listing(&server, 2001, "US", 1, &[30], 2).await;
    detail(30)
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-ratelimit-remaining", "1")
                .set_body_json(detail_body(30)),
        )
        .expect(1)
        .mount(&server)
        .await;
    forbid_listing(&server, 2001, "US", 2).await;

    let mut coordinator = coordinator(config, open_store(&dir));
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::QuotaExit);
    assert_eq!(coordinator.store().record_ids().unwrap(), vec![30]);
    assert_eq!(
        stored_checkpoint(coordinator.store()).await,
        Some(Checkpoint::new(2001, Region::us(), 1))
    );
}

#[tokio::test]
async fn test_last_page_ends_pair_without_next_listing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, 2001, 2001);

    mount_listing(&server, 2001, "US", 1, &[1], 1).await;
    forbid_listing(&server, 2001, "US", 2).await;
    mount_listing(&server, 2001, "IN", 1, &[], 0).await;
    forbid_listing(&server, 2001, "IN", 2).await;
    mount_details(&server, &[1]).await;

    let mut coordinator = coordinator(config, open_store(&dir));
    assert_eq!(coordinator.run().await.unwrap(), RunOutcome::Done);
    assert_eq!(coordinator.store().record_ids().unwrap(), vec![1]);
}

#[tokio::test]
async fn test_failing_listing_attempted_max_times_then_skipped() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, 2001, 2001);

    listing(2001, "US", 1)
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    forbid_listing(&server, 2001, "US", 2).await;
    mount_listing(&server, 2001, "IN", 1, &[5], 1).await;
    mount_details(&server, &[5]).await;

    let mut coordinator = coordinator(config, open_store(&dir));
    assert_eq!(coordinator.run().await.unwrap(), RunOutcome::Done);
    assert_eq!(coordinator.store().record_ids().unwrap(), vec![5]);
    assert_eq!(coordinator.summary().pages_listed, 1);
}

#[tokio::test]
async fn test_rate_limited_listing_is_retried() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, 2001, 2001);

    listing(2001, "US", 1)
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(&server, 2001, "US", 1, &[7], 1).await;
    mount_listing(&server, 2001, "IN", 1, &[], 0).await;
    mount_details(&server, &[7]).await;

    let mut coordinator = coordinator(config, open_store(&dir));
    assert_eq!(coordinator.run().await.unwrap(), RunOutcome::Done);
    assert_eq!(coordinator.store().record_ids().unwrap(), vec![7]);
}

#[tokio::test]
async fn test_failed_detail_is_skipped() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, 2001, 2001);

    mount_listing(&server, 2001, "US", 1, &[1, 2, 3], 1).await;
    mount_listing(&server, 2001, "IN", 1, &[], 0).await;
    mount_details(&server, &[1, 3]).await;
    detail(2)
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut coordinator = coordinator(config, open_store(&dir));
    assert_eq!(coordinator.run().await.unwrap(), RunOutcome::Done);
    assert_eq!(coordinator.store().record_ids().unwrap(), vec![1, 3]);
    assert_eq!(coordinator.summary().detail_failures, 1);
    assert_eq!(coordinator.summary().items_enriched, 2);
}

#[tokio::test]
async fn test_end_to_end_sweep_from_checkpoint() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, 2000, 2003);
    let hash = compute_config_hash(&config.sweep).unwrap();

    let store = open_store(&dir);
    store
        .save_checkpoint(&Checkpoint::new(2001, Region::us(), 3), &hash)
        .await
        .unwrap();

    forbid_listing(&server, 2000, "US", 1).await;
    forbid_listing(&server, 2000, "IN", 1).await;
    forbid_listing(&server, 2001, "US", 3).await;

    mount_listing(&server, 2001, "US", 4, &[100, 101], 5).await;
    mount_listing(&server, 2001, "US", 5, &[101, 102], 5).await;
    mount_listing(&server, 2001, "IN", 1, &[200], 2).await;
    mount_listing(&server, 2001, "IN", 2, &[100], 2).await;
    mount_listing(&server, 2002, "US", 1, &[300], 1).await;
    mount_listing(&server, 2002, "IN", 1, &[], 0).await;
    mount_listing(&server, 2003, "US", 1, &[400, 401], 1).await;
    mount_listing(&server, 2003, "IN", 1, &[401], 1).await;
    mount_details(&server, &[100, 101, 102, 200, 300, 400, 401]).await;

    let mut first = coordinator(config.clone(), store);
    assert_eq!(first.run().await.unwrap(), RunOutcome::Done);

    let summary = first.summary();
    assert_eq!(summary.pages_listed, 7);
    assert_eq!(summary.items_enriched, 10);
    assert_eq!(summary.records_persisted, 10);
    assert_eq!(summary.batches_dropped, 0);

    assert_eq!(
        first.store().record_ids().unwrap(),
        vec![100, 101, 102, 200, 300, 400, 401]
    );
    let record = first.store().get_record(401).unwrap().unwrap();
    assert_eq!(record.title.as_deref(), Some("Movie 401"));
    assert_eq!(record.year, Some(2001));
    assert_eq!(record.cast, vec!["Lead", "Support"]);
    assert_eq!(
        record.trailer.as_deref(),
        Some("https://www.youtube.com/watch?v=abc")
    );
    assert_eq!(
        stored_checkpoint(first.store()).await,
        Some(Checkpoint::new(2004, Region::us(), 0))
    );
    drop(first);

    // A rerun over the finished range issues no calls
    let mut second = coordinator(config, open_store(&dir));
    assert_eq!(second.run().await.unwrap(), RunOutcome::AlreadyComplete);
    assert_eq!(second.summary().pages_listed, 0);
}

#[tokio::test]
async fn test_quota_exhausted_during_listing_retries_keeps_pair() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, 2001, 2001);

    mount_listing(&server, 2001, "US", 1, &[1], 3).await;
    mount_details(&server, &[1]).await;
    listing(2001, "US", 2)
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-ratelimit-remaining", "1")
                .set_body_string("not json"),
        )
        .expect(1)
        .mount(&server)
        .await;
    forbid_listing(&server, 2001, "US", 3).await;
    forbid_listing(&server, 2001, "IN", 1).await;

    let mut coordinator = coordinator(config, open_store(&dir));
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::QuotaExit);
    assert_eq!(coordinator.store().record_ids().unwrap(), vec![1]);
    assert_eq!(
        stored_checkpoint(coordinator.store()).await,
        Some(Checkpoint::new(2001, Region::us(), 1))
    );
}
