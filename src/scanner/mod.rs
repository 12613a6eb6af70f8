//! Directory scanning with optional compatibility classification.
//!
//! Scans one directory level at a time. Every entry is reported exactly
//! once; a failure on one entry never aborts its siblings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

use crate::cache::ProbeCache;
use crate::compat::{Classifier, Compatibility};

/// Filesystem snapshot for one entry.
#[derive(Debug, Clone, Serialize)]
pub struct EntryStats {
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, when the filesystem reports one.
    pub modified: Option<SystemTime>,
}

/// One entry in a scan result.
#[derive(Debug, Clone, Serialize)]
pub struct ScanEntry {
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Stat snapshot; absent when the entry could not be stat'ed.
    pub stats: Option<EntryStats>,
    /// Overall device compatibility. Always false for directories and
    /// for entries whose classification failed.
    pub compatible: bool,
    /// Full classification; absent for directories, unclassified scans,
    /// and entries whose probe failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Compatibility>,
}

/// Scanner over a library directory tree.
pub struct Scanner {
    cache: Arc<ProbeCache>,
    classifier: Classifier,
}

impl Scanner {
    /// Create a scanner sharing the given cache and classifier.
    pub fn new(cache: Arc<ProbeCache>, classifier: Classifier) -> Self {
        Self { cache, classifier }
    }

    /// Enumerate the entries directly under `base/sub` (one level), keyed
    /// by their `sub`-relative path.
    ///
    /// With `classify` set, every regular file is probed and classified
    /// in turn; a probe failure degrades that entry to incompatible with
    /// no classification data, and its siblings are still processed.
    pub async fn scan(
        &self,
        base: &Path,
        sub: &Path,
        classify: bool,
    ) -> castable_av::Result<BTreeMap<String, ScanEntry>> {
        let dir = base.join(sub);
        tracing::debug!(dir = %dir.display(), classify, "scanning directory");

        let mut entries = BTreeMap::new();
        let mut worklist: Vec<(String, PathBuf)> = Vec::new();

        let mut read_dir = tokio::fs::read_dir(&dir).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                castable_av::Error::file_not_found(&dir)
            } else {
                castable_av::Error::Io(e)
            }
        })?;
        while let Some(dir_entry) = read_dir.next_entry().await? {
            let key = sub.join(dir_entry.file_name()).to_string_lossy().into_owned();
            let abs = dir_entry.path();

            let entry = match dir_entry.metadata().await {
                Ok(meta) => {
                    let is_dir = meta.is_dir();
                    if !is_dir && classify {
                        worklist.push((key.clone(), abs));
                    }
                    ScanEntry {
                        is_dir,
                        stats: Some(EntryStats {
                            size: meta.len(),
                            modified: meta.modified().ok(),
                        }),
                        compatible: false,
                        compatibility: None,
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %abs.display(), error = %e, "failed to stat entry");
                    ScanEntry {
                        is_dir: false,
                        stats: None,
                        compatible: false,
                        compatibility: None,
                    }
                }
            };
            entries.insert(key, entry);
        }

        for (key, abs) in worklist {
            let report = match self.cache.metadata(&abs).await {
                Ok(info) => self.classifier.classify(&abs, Some(&info)),
                Err(e) => {
                    tracing::warn!(
                        path = %abs.display(),
                        error = %e,
                        "probe failed; reporting entry as incompatible"
                    );
                    continue;
                }
            };
            if let Some(entry) = entries.get_mut(&key) {
                entry.compatible = report.compatible;
                entry.compatibility = Some(report);
            }
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castable_av::{
        AudioTrack, Error, MediaInfo, Prober, Result as AvResult, VideoTrack,
    };

    /// Prober double: native metadata for every file, unless the file
    /// name contains "bad".
    struct StubProber;

    impl Prober for StubProber {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn probe(&self, path: &Path) -> AvResult<MediaInfo> {
            if path.to_string_lossy().contains("bad") {
                return Err(Error::tool_failed("stub", "corrupt file"));
            }
            Ok(MediaInfo {
                file_path: path.to_path_buf(),
                file_size: 7,
                container: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
                duration: None,
                video_tracks: vec![VideoTrack {
                    index: 0,
                    codec: "h264".to_string(),
                    profile: Some("High".to_string()),
                    level: Some(41),
                    width: Some(1920),
                    height: Some(1080),
                    frame_rate: None,
                    default: true,
                }],
                audio_tracks: vec![AudioTrack {
                    index: 0,
                    codec: "aac".to_string(),
                    channels: Some(2),
                    language: None,
                    default: true,
                }],
                subtitle_tracks: vec![],
            })
        }
    }

    fn scanner() -> Scanner {
        let cache = Arc::new(ProbeCache::new(Arc::new(StubProber)));
        Scanner::new(cache, Classifier::new())
    }

    fn populate(dir: &Path) {
        for name in ["one.mkv", "two.mp4", "three.avi"] {
            std::fs::write(dir.join(name), b"media").unwrap();
        }
        std::fs::create_dir(dir.join("season-1")).unwrap();
        std::fs::create_dir(dir.join("extras")).unwrap();
    }

    #[tokio::test]
    async fn scan_reports_every_entry_once() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());

        let entries = scanner()
            .scan(dir.path(), Path::new(""), false)
            .await
            .unwrap();

        assert_eq!(entries.len(), 5);
        assert!(entries["season-1"].is_dir);
        assert!(entries["extras"].is_dir);
        assert!(!entries["one.mkv"].is_dir);
        // Unclassified scan carries no compatibility data at all.
        assert!(entries.values().all(|e| e.compatibility.is_none()));
        assert!(entries.values().all(|e| !e.compatible));
    }

    #[tokio::test]
    async fn classified_scan_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());

        let entries = scanner()
            .scan(dir.path(), Path::new(""), true)
            .await
            .unwrap();

        assert_eq!(entries.len(), 5);
        assert!(entries["one.mkv"].compatible);
        assert!(entries["one.mkv"].compatibility.is_some());
        assert!(entries["season-1"].compatibility.is_none());
        assert!(!entries["season-1"].compatible);
    }

    #[tokio::test]
    async fn probe_failure_degrades_entry_not_scan() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.mkv"), b"media").unwrap();
        std::fs::write(dir.path().join("bad.mkv"), b"media").unwrap();

        let entries = scanner()
            .scan(dir.path(), Path::new(""), true)
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert!(entries["good.mkv"].compatible);
        assert!(!entries["bad.mkv"].compatible);
        assert!(entries["bad.mkv"].compatibility.is_none());
        // The failed entry is still reported with its stat snapshot.
        assert!(entries["bad.mkv"].stats.is_some());
    }

    #[tokio::test]
    async fn scan_keys_are_subdir_relative() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("shows");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("pilot.mkv"), b"media").unwrap();

        let entries = scanner()
            .scan(dir.path(), Path::new("shows"), false)
            .await
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("shows/pilot.mkv"));
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = scanner()
            .scan(dir.path(), Path::new("nope"), false)
            .await;
        assert!(result.is_err());
    }
}
