//! Integration tests for the discovery pipeline
//!
//! These tests use wiremock to stand in for both the code-search API and
//! the raw-content host, and run full queries end-to-end.

use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tvbox_scout::config::Config;
use tvbox_scout::storage::{ArtifactStore, DiscoveryCache, StatsTable};
use tvbox_scout::{Credentials, Orchestrator, ScoutError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

/// Creates a test configuration pointing every endpoint at the mock server
fn create_test_config(server: &MockServer, dir: &TempDir, queries: &[&str]) -> Config {
    let mut config = Config::default();
    config.github.api_base_url = server.uri();
    config.github.raw_base_url = format!("{}/raw", server.uri());
    config.github.inter_query_delay_secs = 0;
    config.github.retry_backoff_ms = 1;
    config.github.forbidden_backoff_secs = 0;
    config.github.reset_margin_secs = 0;
    config.github.max_workers = Some(1);
    config.fetch.backoff_unit_ms = 1;
    config.fetch.timeout_secs = 5;
    config.storage.artifact_dir = dir.path().join("box");
    config.storage.cache_path = dir.path().join("search_cache.json");
    config.storage.stats_path = dir.path().join("query_stats.json");
    config.scheduler.base_queries = queries.iter().map(|q| q.to_string()).collect();
    config
}

fn item(repo: &str, file: &str) -> Value {
    json!({
        "name": file.rsplit('/').next().unwrap(),
        "path": file,
        "html_url": format!("https://github.com/{}/blob/main/{}", repo, file),
        "repository": { "full_name": repo }
    })
}

async fn mount_search(server: &MockServer, query: &str, page: u32, total: u64, items: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/search/code"))
        .and(query_param("q", query))
        .and(query_param("page", page.to_string().as_str()))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "total_count": total,
                "items": items
            })),
        )
        .mount(server)
        .await;
}

async fn mount_raw(server: &MockServer, raw_path: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/raw/{}", raw_path).as_str()))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

const SITES_CONFIG: &str = r#"{"sites":[{"key":"a","api":"csp_A"}]}"#;
const SPIDER_CONFIG: &str = r#"{"spider":"./jar/custom.jar","sites":[]}"#;

/// Serves two queries whose results overlap by URL and by content
async fn mount_overlapping_queries(server: &MockServer) {
    mount_search(
        server,
        "q1",
        1,
        4,
        vec![
            item("u/r", "a.json"),
            item("u/r", "b.json"),
            item("u/r", "c.json"),
            item("u/r", "d.json"),
        ],
    )
    .await;
    mount_search(
        server,
        "q2",
        1,
        2,
        vec![item("u/r", "a.json"), item("v/s", "box/e.json")],
    )
    .await;

    // b serves the same bytes as a
    mount_raw(server, "u/r/main/a.json", 200, SITES_CONFIG).await;
    mount_raw(server, "u/r/main/b.json", 200, SITES_CONFIG).await;
    mount_raw(server, "u/r/main/c.json", 200, r#"{"foo":1}"#).await;
    mount_raw(server, "u/r/main/d.json", 404, "").await;
    mount_raw(server, "v/s/main/box/e.json", 200, SPIDER_CONFIG).await;
}

#[tokio::test]
async fn test_accepts_valid_and_skips_duplicates() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_overlapping_queries(&server).await;

    let config = create_test_config(&server, &dir, &["q1", "q2"]);
    let orchestrator = Arc::new(Orchestrator::new(config.clone(), Credentials::new(TOKEN)).unwrap());
    let summary = orchestrator.run().await;

    assert_eq!(summary.queries_run, 2);
    assert_eq!(summary.queries_failed, 0);
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.candidates_seen, 6);
    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.duplicates_skipped, 2);
    assert_eq!(summary.validation_failures, 1);
    assert_eq!(summary.fetch_failures, 1);

    let artifacts = ArtifactStore::open(&config.storage.artifact_dir)
        .unwrap()
        .list()
        .unwrap();
    assert_eq!(artifacts.len(), 2);

    let stats = StatsTable::load(&config.storage.stats_path);
    assert_eq!(stats.get("q1").valid, 1);
    assert_eq!(stats.get("q1").total, 4);
    assert_eq!(stats.get("q2").valid, 1);
    assert_eq!(stats.get("q2").total, 2);

    let cache = DiscoveryCache::load(&config.storage.cache_path, config.storage.cache_ttl_days);
    assert_eq!(cache.len(), 2);
    let record = cache
        .get("https://github.com/v/s/blob/main/box/e.json")
        .unwrap();
    assert_eq!(record.repo, "v/s");
    assert_eq!(record.path, "box/e.json");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_workers_store_each_payload_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let queries = ["q1", "q2", "q3", "q4"];

    // every query sees one shared URL plus two per-repo copies of the same two payloads
    for (n, query) in queries.iter().enumerate() {
        let repo = format!("u{}/r", n);
        mount_search(
            &server,
            query,
            1,
            3,
            vec![
                item("u/r", "shared.json"),
                item(&repo, "a.json"),
                item(&repo, "e.json"),
            ],
        )
        .await;
        mount_raw(&server, &format!("{}/main/a.json", repo), 200, SITES_CONFIG).await;
        mount_raw(&server, &format!("{}/main/e.json", repo), 200, SPIDER_CONFIG).await;
    }
    mount_raw(&server, "u/r/main/shared.json", 200, SITES_CONFIG).await;

    let mut config = create_test_config(&server, &dir, &queries);
    config.github.max_workers = Some(4);
    let orchestrator = Arc::new(Orchestrator::new(config.clone(), Credentials::new(TOKEN)).unwrap());
    let summary = orchestrator.run().await;

    assert_eq!(summary.queries_run, 4);
    assert_eq!(summary.candidates_seen, 12);
    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.duplicates_skipped, 10);

    let artifacts = ArtifactStore::open(&config.storage.artifact_dir)
        .unwrap()
        .list()
        .unwrap();
    assert_eq!(artifacts.len(), 2);

    let stats = StatsTable::load(&config.storage.stats_path);
    let valid: u64 = queries.iter().map(|q| stats.get(q).valid).sum();
    assert_eq!(valid, 2);
    for query in queries {
        assert_eq!(stats.get(query).total, 3);
    }
}

#[tokio::test]
async fn test_second_run_stores_nothing_new() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_overlapping_queries(&server).await;

    let config = create_test_config(&server, &dir, &["q1", "q2"]);

    let first = Arc::new(Orchestrator::new(config.clone(), Credentials::new(TOKEN)).unwrap());
    assert_eq!(first.run().await.accepted, 2);

    let second = Arc::new(Orchestrator::new(config.clone(), Credentials::new(TOKEN)).unwrap());
    let summary = second.run().await;

    assert_eq!(summary.accepted, 0);
    let artifacts = ArtifactStore::open(&config.storage.artifact_dir)
        .unwrap()
        .list()
        .unwrap();
    assert_eq!(artifacts.len(), 2);

    // totals keep accumulating across runs
    let stats = StatsTable::load(&config.storage.stats_path);
    assert_eq!(stats.get("q1").total, 8);
    assert_eq!(stats.get("q1").valid, 1);
}

#[tokio::test]
async fn test_pagination_stops_at_reported_total() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // tree links cannot be rewritten to raw URLs, so nothing is fetched
    let page_items = |count: usize, offset: usize| -> Vec<Value> {
        (0..count)
            .map(|i| {
                json!({
                    "name": format!("f{}.json", offset + i),
                    "path": format!("f{}.json", offset + i),
                    "html_url": format!("https://github.com/u/r/tree/main/f{}", offset + i)
                })
            })
            .collect()
    };

    for (page, count) in [(1u32, 100usize), (2, 100), (3, 50)] {
        Mock::given(method("GET"))
            .and(path("/search/code"))
            .and(query_param("page", page.to_string().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 250,
                "items": page_items(count, (page as usize - 1) * 100)
            })))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/search/code"))
        .and(query_param("page", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 250,
            "items": []
        })))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server, &dir, &["paged"]);
    let orchestrator = Arc::new(Orchestrator::new(config, Credentials::new(TOKEN)).unwrap());
    let summary = orchestrator.run().await;

    assert_eq!(summary.pages_fetched, 3);
    assert_eq!(summary.candidates_seen, 250);
    assert_eq!(summary.accepted, 0);
}

#[tokio::test]
async fn test_forbidden_response_is_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // reset already in the past, so the wait is just the (zero) margin
    let reset = chrono::Utc::now().timestamp() - 10;
    Mock::given(method("GET"))
        .and(path("/search/code"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("X-RateLimit-Remaining", "0")
                .insert_header("X-RateLimit-Reset", reset.to_string().as_str()),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_search(&server, "retry", 1, 1, vec![item("u/r", "tv.json")]).await;
    mount_raw(&server, "u/r/main/tv.json", 200, SITES_CONFIG).await;

    let config = create_test_config(&server, &dir, &["retry"]);
    let orchestrator = Arc::new(Orchestrator::new(config, Credentials::new(TOKEN)).unwrap());
    let summary = orchestrator.run().await;

    assert_eq!(summary.queries_failed, 0);
    assert_eq!(summary.accepted, 1);
}

#[tokio::test]
async fn test_exhausted_retries_abort_only_that_query() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search/code"))
        .and(query_param("q", "blocked"))
        .respond_with(ResponseTemplate::new(403))
        .expect(3)
        .mount(&server)
        .await;
    mount_search(&server, "open", 1, 1, vec![item("u/r", "tv.json")]).await;
    mount_raw(&server, "u/r/main/tv.json", 200, SITES_CONFIG).await;

    let config = create_test_config(&server, &dir, &["blocked", "open"]);
    let orchestrator = Arc::new(Orchestrator::new(config.clone(), Credentials::new(TOKEN)).unwrap());
    let summary = orchestrator.run().await;

    assert_eq!(summary.queries_run, 2);
    assert_eq!(summary.queries_failed, 1);
    assert_eq!(summary.accepted, 1);

    let stats = StatsTable::load(&config.storage.stats_path);
    assert_eq!(stats.get("blocked").total, 0);
    assert_eq!(stats.get("open").valid, 1);
}

#[tokio::test]
async fn test_seeded_artifacts_block_known_content() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let config = create_test_config(&server, &dir, &["q"]);
    let store = ArtifactStore::open(&config.storage.artifact_dir).unwrap();
    store.save("old.json", SITES_CONFIG.as_bytes()).unwrap();

    mount_search(&server, "q", 1, 1, vec![item("x/y", "mirror.json")]).await;
    mount_raw(&server, "x/y/main/mirror.json", 200, SITES_CONFIG).await;

    let orchestrator = Arc::new(Orchestrator::new(config, Credentials::new(TOKEN)).unwrap());
    let summary = orchestrator.run().await;

    assert_eq!(summary.accepted, 0);
    assert_eq!(summary.duplicates_skipped, 1);
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn test_missing_credential_is_fatal() {
    let result = Credentials::from_env("TVBOX_SCOUT_PIPELINE_TEST_NO_SUCH_VAR");
    assert!(matches!(result, Err(ScoutError::MissingCredential { .. })));
}
