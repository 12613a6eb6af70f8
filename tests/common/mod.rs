//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which builds a full [`AppContext`] around a
//! fake prober, a temp library root, and a stub engine script. The
//! [`with_server`] constructor starts Axum on a random port for
//! HTTP-level testing.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use castable::cache::ProbeCache;
use castable::compat::Classifier;
use castable::config::Config;
use castable::server::{build_router, AppContext};
use castable::streaming::{SessionRegistry, StreamController};
use castable_av::{AudioTrack, MediaInfo, OutputFormat, Prober, Result, VideoTrack};

/// Prober double returning fixed native-compatible metadata for every
/// file, unless its name contains "bad".
pub struct StubProber;

impl Prober for StubProber {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn probe(&self, path: &Path) -> Result<MediaInfo> {
        if path.to_string_lossy().contains("bad") {
            return Err(castable_av::Error::tool_failed("stub", "corrupt file"));
        }
        Ok(native_media_info(path))
    }
}

/// Metadata for a file the device plays natively.
pub fn native_media_info(path: &Path) -> MediaInfo {
    MediaInfo {
        file_path: path.to_path_buf(),
        file_size: 5,
        container: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
        duration: None,
        video_tracks: vec![VideoTrack {
            index: 0,
            codec: "h264".to_string(),
            profile: Some("High".to_string()),
            level: Some(41),
            width: Some(1920),
            height: Some(1080),
            frame_rate: Some(23.976),
            default: true,
        }],
        audio_tracks: vec![AudioTrack {
            index: 0,
            codec: "aac".to_string(),
            channels: Some(2),
            language: Some("eng".to_string()),
            default: true,
        }],
        subtitle_tracks: vec![],
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`] backed by a
/// temp library root and a stub engine.
pub struct TestHarness {
    pub ctx: AppContext,
    pub root: tempfile::TempDir,
    /// Holds the stub engine script for the harness's lifetime.
    _tools: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new harness with default configuration.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("failed to create temp library root");
        let tools = tempfile::tempdir().expect("failed to create temp tools dir");

        let mut config = Config::default();
        config.library.root = root.path().to_path_buf();

        let prober: Arc<dyn Prober> = Arc::new(StubProber);
        let cache = Arc::new(ProbeCache::new(prober));
        let classifier = Classifier::new();
        let sessions = SessionRegistry::new();
        let controller = Arc::new(StreamController::new(
            Arc::clone(&cache),
            classifier.clone(),
            sessions.clone(),
            stub_engine(tools.path()),
            OutputFormat::Matroska,
        ));

        let ctx = AppContext {
            config: Arc::new(config),
            cache,
            classifier,
            controller,
            sessions,
        };

        Self {
            ctx,
            root,
            _tools: tools,
        }
    }

    /// Start an Axum server on a random port and return the harness
    /// together with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new();
        let app = build_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Create a file under the library root.
    pub fn touch(&self, rel: &str) -> PathBuf {
        let path = self.root.path().join(rel);
        std::fs::write(&path, b"fake media payload").expect("failed to write fixture");
        path
    }

    /// Create a directory under the library root.
    pub fn mkdir(&self, rel: &str) -> PathBuf {
        let path = self.root.path().join(rel);
        std::fs::create_dir_all(&path).expect("failed to create fixture dir");
        path
    }
}

/// A stub engine: emits a fixed payload on stdout and exits cleanly.
#[cfg(unix)]
fn stub_engine(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("stub-ffmpeg");
    std::fs::write(&path, "#!/bin/sh\nprintf 'transcoded'\nexit 0\n")
        .expect("failed to write stub engine");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to mark stub engine executable");
    path
}

#[cfg(not(unix))]
fn stub_engine(_dir: &Path) -> PathBuf {
    PathBuf::from("ffmpeg")
}
