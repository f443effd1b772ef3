//! End-to-end runs of the fetch handler over a fake backend.

use std::sync::Arc;

use preload_cli::handlers::fetch::run;
use preload_cli::{SourceArgs, compose};
use preload_core::{LoadEvent, LoadQueueConfig};
use preload_http::testing::{CannedResponse, FakeBackend};

const CDN: &str = "https://cdn.test/";

fn config() -> LoadQueueConfig {
    LoadQueueConfig::new()
        .with_max_connections(2)
        .with_base_path(Some(CDN.to_string()))
}

fn sources(list: &[&str]) -> SourceArgs {
    SourceArgs {
        sources: list.iter().map(ToString::to_string).collect(),
        ..SourceArgs::default()
    }
}

#[tokio::test]
async fn test_fetch_reports_loaded_and_failed_items() {
    let backend = FakeBackend::new()
        .with_response("a.txt", CannedResponse::ok("alpha"))
        .with_response("b.json", CannedResponse::ok(r#"{"ok":true}"#))
        .shared();
    let context = compose(backend, config()).expect("compose");
    let descriptors = sources(&["a.txt", "b.json", "missing.css"])
        .descriptors()
        .expect("descriptors");

    let mut seen = Vec::new();
    let summary = run(context, descriptors, |event| seen.push(event.name())).await;

    assert_eq!(summary.items.len(), 3);
    assert_eq!(summary.loaded(), 2);
    assert_eq!(summary.failed(), 1);
    assert!(!summary.halted);

    let a = summary
        .items
        .iter()
        .find(|i| i.id.as_deref() == Some("a.txt"))
        .expect("a.txt reported");
    assert_eq!(a.bytes, Some(5));
    assert_eq!(a.src.as_deref(), Some("https://cdn.test/a.txt"));
    assert_eq!(seen.last(), Some(&"complete"));
}

#[tokio::test]
async fn test_sounds_load_through_fetch_elements() {
    let backend = FakeBackend::new()
        .with_response("beep.mp3", CannedResponse::ok(vec![1_u8; 16]))
        .shared();
    let context = compose(Arc::clone(&backend), config()).expect("compose");

    let summary = run(context, sources(&["beep.mp3"]).descriptors().expect("d"), |_| {}).await;

    assert_eq!(summary.loaded(), 1);
    assert_eq!(summary.items[0].resource_type.as_deref(), Some("sound"));
    // Host-element loads keep no raw payload
    assert_eq!(summary.items[0].bytes, Some(0));
    assert_eq!(backend.request_count("beep.mp3"), 1);
}

#[tokio::test]
async fn test_manifest_file_expands_in_queue() {
    let listing = r#"{"path": "https://cdn.test/levels/", "manifest": ["one.txt", "two.txt"]}"#;
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("levels.json");
    std::fs::write(&path, listing).expect("write");

    // The fake serves the manifest by name in place of the local file
    let backend = FakeBackend::new()
        .with_response("levels.json", CannedResponse::ok(listing))
        .with_response("levels/one.txt", CannedResponse::ok("1"))
        .with_response("levels/two.txt", CannedResponse::ok("2"))
        .shared();
    let context = compose(backend, LoadQueueConfig::new()).expect("compose");
    let args = SourceArgs {
        manifest: Some(path),
        ..SourceArgs::default()
    };

    let summary = run(context, args.descriptors().expect("d"), |_| {}).await;

    let ids: Vec<_> = summary.items.iter().filter_map(|i| i.id.clone()).collect();
    assert_eq!(ids.len(), 3);
    assert!(ids.contains(&"one.txt".to_string()));
    assert!(ids.contains(&"two.txt".to_string()));
    assert_eq!(summary.failed(), 0);
}

#[tokio::test]
async fn test_stop_on_error_halts_run() {
    let backend = FakeBackend::new()
        .with_response("b.txt", CannedResponse::ok("b"))
        .shared();
    let context = compose(
        backend,
        config().with_max_connections(1).with_stop_on_error(true),
    )
    .expect("compose");

    let mut events = Vec::new();
    let descriptors = sources(&["missing.txt", "b.txt"]).descriptors().expect("d");
    let summary = run(context, descriptors, |event| events.push(event.name())).await;

    assert!(summary.halted);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.loaded(), 0);
    assert!(!events.contains(&"complete"));
}

#[tokio::test]
async fn test_rejected_descriptors_are_reported_without_waiting() {
    let backend = FakeBackend::new().shared();
    let context = compose(backend, config()).expect("compose");

    let summary = run(context, sources(&["bad file.png"]).descriptors().expect("d"), |e| {
        assert!(matches!(e, LoadEvent::Error { item: None, .. }));
    })
    .await;

    assert_eq!(summary.items.len(), 1);
    assert_eq!(summary.items[0].id, None);
    assert_eq!(summary.failed(), 1);
}
