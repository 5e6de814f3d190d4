//! Integration tests for source-list discovery
//!
//! A single wiremock server plays the search API, the raw-content host
//! answering HEAD probes and the backup list host.

use serde_json::json;
use tempfile::TempDir;
use tvbox_scout::config::Config;
use tvbox_scout::discovery::{read_url_list, SourceDiscovery};
use tvbox_scout::Credentials;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_config(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.github.api_base_url = server.uri();
    config.github.raw_base_url = format!("{}/raw", server.uri());
    config.github.inter_query_delay_secs = 0;
    config.github.retry_backoff_ms = 1;
    config.probe.timeout_secs = 5;
    config.discovery.keywords = vec!["live m3u8".to_string()];
    config.discovery.urls_path = dir.path().join("config").join("urls.txt");
    config.discovery.invalid_url_patterns = vec!["/test/".to_string()];
    config.discovery.backup_urls = vec![format!("{}/backup.txt", server.uri())];
    config
}

fn raw(server: &MockServer, file: &str) -> String {
    format!("{}/raw/u/r/main/{}", server.uri(), file)
}

async fn mount_keyword_results(server: &MockServer, files: &[&str]) {
    let items: Vec<_> = files
        .iter()
        .map(|file| {
            json!({
                "name": file,
                "path": file,
                "html_url": format!("https://github.com/u/r/blob/main/{}", file)
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/search/code"))
        .and(query_param("q", "live m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": items.len(),
            "items": items
        })))
        .mount(server)
        .await;
}

async fn mount_head(server: &MockServer, file: &str, status: u16, expected: u64) {
    Mock::given(method("HEAD"))
        .and(path(format!("/raw/u/r/main/{}", file).as_str()))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_merges_reachable_new_urls() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir);

    std::fs::create_dir_all(dir.path().join("config")).unwrap();
    std::fs::write(&config.discovery.urls_path, format!("{}\n", raw(&server, "known.m3u8"))).unwrap();

    Mock::given(method("GET"))
        .and(path("/backup.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "{}\n\n",
            raw(&server, "backup.m3u8")
        )))
        .mount(&server)
        .await;

    mount_keyword_results(
        &server,
        &[
            "live.m3u8",
            "dead.m3u8",
            "known.m3u8",
            "backup.m3u8",
            "notes.txt",
            "test/blocked.m3u8",
        ],
    )
    .await;

    mount_head(&server, "live.m3u8", 200, 1).await;
    mount_head(&server, "dead.m3u8", 404, 1).await;
    mount_head(&server, "known.m3u8", 200, 0).await;
    mount_head(&server, "backup.m3u8", 200, 0).await;
    mount_head(&server, "test/blocked.m3u8", 200, 0).await;

    let discovery = SourceDiscovery::new(config.clone(), Credentials::new("t")).unwrap();
    let report = discovery.run().await.unwrap();

    assert_eq!(report.candidates, 2);
    assert_eq!(report.validated, 1);
    assert_eq!(report.written, Some(2));

    let saved: Vec<String> = read_url_list(&config.discovery.urls_path)
        .unwrap()
        .into_iter()
        .collect();
    // backup entries count as known but are never copied into the list
    assert_eq!(saved, vec![raw(&server, "known.m3u8"), raw(&server, "live.m3u8")]);
}

#[tokio::test]
async fn test_list_untouched_when_nothing_validates() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir);

    std::fs::create_dir_all(dir.path().join("config")).unwrap();
    let original = "https://example.com/keep.m3u8";
    std::fs::write(&config.discovery.urls_path, original).unwrap();

    // backup host is down; discovery carries on without it
    Mock::given(method("GET"))
        .and(path("/backup.txt"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    mount_keyword_results(&server, &["dead.m3u8"]).await;
    mount_head(&server, "dead.m3u8", 404, 1).await;

    let discovery = SourceDiscovery::new(config.clone(), Credentials::new("t")).unwrap();
    let report = discovery.run().await.unwrap();

    assert_eq!(report.candidates, 1);
    assert_eq!(report.validated, 0);
    assert_eq!(report.written, None);
    assert_eq!(
        std::fs::read_to_string(&config.discovery.urls_path).unwrap(),
        original
    );
}

#[tokio::test]
async fn test_missing_list_file_is_created() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir);
    config.discovery.backup_urls.clear();

    mount_keyword_results(&server, &["new.m3u8"]).await;
    mount_head(&server, "new.m3u8", 302, 1).await;

    let discovery = SourceDiscovery::new(config.clone(), Credentials::new("t")).unwrap();
    let report = discovery.run().await.unwrap();

    assert_eq!(report.written, Some(1));
    assert!(config.discovery.urls_path.exists());
}
