//! API integration tests.
//!
//! Tests HTTP API endpoints against a [`TestHarness`] server running on a
//! random port with a stub prober and engine.

mod common;

use common::TestHarness;

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_200() {
    let (_harness, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
}

// ---------------------------------------------------------------------------
// Compatibility
// ---------------------------------------------------------------------------

#[tokio::test]
async fn compatibility_reports_native_file() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.touch("movie.mkv");

    let resp = reqwest::get(format!("http://{addr}/api/compatibility?path=movie.mkv"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["compatible"], true);
    assert_eq!(body["video_compatible"], true);
    assert_eq!(body["audio_compatible"], true);
    assert_eq!(body["container_compatible"], true);
    assert_eq!(body["video_action"]["action"], "copy");
    assert_eq!(body["audio_action"]["action"], "copy");

    let cmd = body["recommended_command"].as_str().unwrap();
    assert!(cmd.contains("-vcodec copy"));
    assert!(cmd.contains("-acodec copy"));
}

#[tokio::test]
async fn compatibility_unreadable_file_degrades() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.touch("bad.mkv");

    let resp = reqwest::get(format!("http://{addr}/api/compatibility?path=bad.mkv"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["compatible"], false);
    assert_eq!(body["video_compatible"], false);
    assert!(body["video_action"].is_null());
}

#[tokio::test]
async fn compatibility_missing_file_is_404() {
    let (_harness, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!("http://{addr}/api/compatibility?path=nope.mkv"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn compatibility_rejects_traversal() {
    let (_harness, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!(
        "http://{addr}/api/compatibility?path=../../etc/passwd"
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 400);
}

// ---------------------------------------------------------------------------
// Browse
// ---------------------------------------------------------------------------

#[tokio::test]
async fn browse_lists_every_entry() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.touch("one.mkv");
    harness.touch("two.mp4");
    harness.mkdir("season-1");

    let resp = reqwest::get(format!("http://{addr}/api/browse?compatibility=true"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    let entries = body.as_object().unwrap();
    assert_eq!(entries.len(), 3);

    assert_eq!(entries["one.mkv"]["compatible"], true);
    assert!(entries["one.mkv"]["compatibility"].is_object());
    assert_eq!(entries["season-1"]["is_dir"], true);
    assert_eq!(entries["season-1"]["compatible"], false);
    // Directories never carry compatibility data.
    assert!(entries["season-1"].get("compatibility").is_none());
}

#[tokio::test]
async fn browse_without_classification_has_no_compat_data() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.touch("one.mkv");

    let resp = reqwest::get(format!("http://{addr}/api/browse"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    let entries = body.as_object().unwrap();
    assert!(entries["one.mkv"].get("compatibility").is_none());
    assert_eq!(entries["one.mkv"]["compatible"], false);
}

#[tokio::test]
async fn browse_subdirectory_keys_are_relative() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.mkdir("shows");
    harness.touch("shows/pilot.mkv");

    let resp = reqwest::get(format!("http://{addr}/api/browse?path=shows"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    let entries = body.as_object().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries.contains_key("shows/pilot.mkv"));
}

#[tokio::test]
async fn browse_missing_directory_is_error() {
    let (_harness, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!("http://{addr}/api/browse?path=nope"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[tokio::test]
async fn stream_relays_engine_output() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.touch("movie.mkv");

    let resp = reqwest::get(format!("http://{addr}/api/stream?path=movie.mkv"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("video/x-matroska")
    );

    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], b"transcoded");
}

#[tokio::test]
async fn stream_missing_file_is_404() {
    let (_harness, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!("http://{addr}/api/stream?path=nope.mkv"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

// ---------------------------------------------------------------------------
// Introspection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sessions_start_empty() {
    let (_harness, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!("http://{addr}/api/sessions"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn tools_endpoint_reports_both_tools() {
    let (_harness, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!("http://{addr}/api/tools"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names, vec!["ffmpeg", "ffprobe"]);
}
