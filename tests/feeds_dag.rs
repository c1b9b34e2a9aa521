// tests/feeds_dag.rs

use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;
use std::time::{Duration, SystemTime};

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use tempfile::TempDir;

use ecovoyage::config::FeedConfig;
use ecovoyage::dag::{ParamValue, PassResults};
use ecovoyage::feeds::dag::{check_task_name, dir_task_name, download_task_name};
use ecovoyage::feeds::fetch::parse_last_modified;
use ecovoyage::feeds::{
    DownloadSummary, check_feed_update, create_download_dag, download_feed, run_download_dag,
    update_needed, validate_directory,
};
use ecovoyage_test_utils::{init_tracing, with_timeout};

// Nothing listens on the discard port locally, so requests fail fast.
const UNREACHABLE: &str = "http://127.0.0.1:9/feed.zip";

fn sample_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig::new("https://example.org/linz.zip", "/data/gtfs/linz.zip"),
        FeedConfig::new("https://example.org/graz.zip", "/data/gtfs/graz.zip"),
        FeedConfig::new("https://example.org/austria.pbf", "/data/osm/austria.pbf"),
    ]
}

#[test]
fn download_dag_has_shared_directory_tasks() {
    let dag = create_download_dag(&sample_feeds()).unwrap();

    // Two directories + (check, download) per feed.
    assert_eq!(dag.len(), 2 + 3 * 2);
    assert_eq!(dag.name(), "feed_download");

    let gtfs_dir = dir_task_name(Path::new("/data/gtfs"));
    let osm_dir = dir_task_name(Path::new("/data/osm"));
    assert!(dag.contains(&gtfs_dir));
    assert!(dag.contains(&osm_dir));

    assert_eq!(dag.get_task("check_0").unwrap().dependencies(), [gtfs_dir.clone()]);
    assert_eq!(dag.get_task("check_1").unwrap().dependencies(), [gtfs_dir.clone()]);
    assert_eq!(dag.get_task("check_2").unwrap().dependencies(), [osm_dir]);

    let mut dependents = dag.dependents_of(&gtfs_dir);
    dependents.sort();
    assert_eq!(dependents, ["check_0", "check_1"]);
}

#[test]
fn download_task_binds_check_result() {
    let dag = create_download_dag(&sample_feeds()).unwrap();

    for i in 0..3 {
        let download = dag.get_task(&download_task_name(i)).unwrap();
        assert_eq!(download.dependencies(), [check_task_name(i)]);
        assert_eq!(
            download.param("needs_update"),
            Some(&ParamValue::Upstream(check_task_name(i)))
        );
        assert_eq!(
            download.param("url"),
            Some(&ParamValue::Literal(json!(sample_feeds()[i].url)))
        );
    }
}

#[test]
fn download_dag_order_starts_with_directories() {
    let dag = create_download_dag(&sample_feeds()).unwrap();
    let order = dag.topological_order().unwrap();
    let pos = |name: &str| order.iter().position(|n| n == name).unwrap();

    for i in 0..3 {
        let dir = dag.get_task(&check_task_name(i)).unwrap().dependencies()[0].clone();
        assert!(pos(&dir) < pos(&check_task_name(i)));
        assert!(pos(&check_task_name(i)) < pos(&download_task_name(i)));
    }
}

#[test]
fn bare_file_name_uses_current_directory() {
    let feed = FeedConfig::new("https://example.org/a.zip", "a.zip");
    assert_eq!(feed.directory(), Path::new("."));

    let dag = create_download_dag(&[feed]).unwrap();
    assert!(dag.contains("validate_dir_."));
}

fn results(entries: &[(&str, Option<Value>)]) -> PassResults {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect::<BTreeMap<_, _>>()
}

#[test]
fn summary_classifies_each_feed() {
    let pass = results(&[
        // Updated.
        ("check_0", Some(json!(true))),
        ("download_0", Some(json!(true))),
        // Already current.
        ("check_1", Some(json!(false))),
        ("download_1", Some(json!(true))),
        // Download reported failure.
        ("check_2", Some(json!(true))),
        ("download_2", Some(json!(false))),
        // Skipped after the directory task failed.
        ("check_3", None),
        ("download_3", None),
    ]);

    let summary = DownloadSummary::from_results(4, &pass);

    assert_eq!(
        summary,
        DownloadSummary {
            updated: 1,
            current: 1,
            errors: 2,
        }
    );
}

#[test]
fn missing_timestamps_always_need_update() {
    let now = SystemTime::now();
    let remote = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    assert!(update_needed(None, Some(now)));
    assert!(update_needed(Some(remote), None));
    assert!(update_needed(None, None));
}

#[test]
fn newer_remote_needs_update() {
    let remote = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let older = SystemTime::from(remote) - Duration::from_secs(3600);
    let newer = SystemTime::from(remote) + Duration::from_secs(3600);

    assert!(update_needed(Some(remote), Some(older)));
    assert!(!update_needed(Some(remote), Some(newer)));
    assert!(!update_needed(Some(remote), Some(SystemTime::from(remote))));
}

#[test]
fn last_modified_header_parses() {
    let parsed = parse_last_modified("Wed, 21 Oct 2015 07:28:00 GMT").unwrap();
    assert_eq!(parsed, Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap());

    assert!(parse_last_modified("yesterday").is_none());
}

#[test]
fn validate_directory_creates_nested_dirs() {
    let tmp = TempDir::new().unwrap();
    let nested = tmp.path().join("austria").join("gtfs");

    assert!(validate_directory(&nested).unwrap());
    assert!(nested.is_dir());

    // Existing directory is fine too.
    assert!(validate_directory(&nested).unwrap());
}

#[test]
fn download_not_needed_is_success() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("feed.zip");

    assert!(download_feed(UNREACHABLE, &target, false));
    assert!(!target.exists());
}

#[test]
fn network_errors_are_reported_not_raised() {
    init_tracing();

    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("feed.zip");

    assert!(!check_feed_update(UNREACHABLE, &target));
    assert!(!download_feed(UNREACHABLE, &target, true));
    assert!(!target.exists());
}

#[tokio::test]
async fn unreachable_feed_counts_as_current() {
    init_tracing();

    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("gtfs").join("feed.zip");
    let feeds = [FeedConfig::new(UNREACHABLE, &target)];

    let report = with_timeout(run_download_dag(&feeds, 2)).await.unwrap();

    // The check failed and reported "no update", so nothing was downloaded.
    assert_eq!(report.results["check_0"], Some(json!(false)));
    assert_eq!(report.results["download_0"], Some(json!(true)));
    assert_eq!(report.summary.current, 1);
    assert_eq!(report.summary.errors, 0);
    assert!(tmp.path().join("gtfs").is_dir());
    assert!(!target.exists());
}

/// Answer a single HTTP request with `response`, then close the connection.
fn serve_once(response: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let _ = stream.write_all(response);
    });

    format!("http://{addr}/feed.zip")
}

#[test]
fn truncated_download_keeps_existing_feed() {
    init_tracing();

    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("feed.zip");
    fs::write(&target, "GOOD-EXISTING-FEED").unwrap();
    let before = fs::metadata(&target).unwrap().modified().unwrap();

    let url = serve_once(
        b"HTTP/1.1 200 OK\r\nContent-Length: 100000\r\nConnection: close\r\n\r\nPARTIAL",
    );

    assert!(!download_feed(&url, &target, true));
    assert_eq!(fs::read_to_string(&target).unwrap(), "GOOD-EXISTING-FEED");
    assert_eq!(fs::metadata(&target).unwrap().modified().unwrap(), before);

    // No staging file is left next to the feed.
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
}

#[test]
fn completed_download_replaces_feed_with_server_mtime() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("feed.zip");
    fs::write(&target, "OLD").unwrap();

    let url = serve_once(
        b"HTTP/1.1 200 OK\r\nContent-Length: 8\r\n\
          Last-Modified: Wed, 21 Oct 2015 07:28:00 GMT\r\n\
          Connection: close\r\n\r\nNEW-FEED",
    );

    assert!(download_feed(&url, &target, true));
    assert_eq!(fs::read_to_string(&target).unwrap(), "NEW-FEED");

    let expected = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
    assert_eq!(
        fs::metadata(&target).unwrap().modified().unwrap(),
        SystemTime::from(expected)
    );
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
}
