//! Probe result cache.
//!
//! Probing a file shells out to an external tool, so results are memoized
//! per canonical path and invalidated by the file's modification time.
//! Entries are overwritten in place when stale; there is no eviction, by
//! design, for a small long-lived catalog.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use tokio::sync::Mutex;

use castable_av::{Error, MediaInfo, Prober, Result};

struct ProbeRecord {
    mtime: SystemTime,
    info: Arc<MediaInfo>,
}

/// Modification-time validated cache in front of a [`Prober`].
///
/// Every lookup for a given path shares one slot, and the slot's mutex is
/// held across the probe itself, so concurrent lookups coalesce into a
/// single external invocation instead of racing.
pub struct ProbeCache {
    prober: Arc<dyn Prober>,
    entries: DashMap<PathBuf, Arc<Mutex<Option<ProbeRecord>>>>,
}

impl ProbeCache {
    /// Create a cache around the given prober.
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self {
            prober,
            entries: DashMap::new(),
        }
    }

    /// Get metadata for `path`, probing only when no entry exists for the
    /// file's current modification time.
    ///
    /// Prober failures are returned to the caller and never stored; the
    /// next lookup probes again.
    pub async fn metadata(&self, path: &Path) -> Result<Arc<MediaInfo>> {
        // Stat before consulting the cache; the mtime decides validity.
        let file_meta = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::file_not_found(path)
            } else {
                Error::Io(e)
            }
        })?;
        let mtime = file_meta.modified()?;
        let key = tokio::fs::canonicalize(path).await?;

        let slot = self.entries.entry(key.clone()).or_default().clone();
        let mut guard = slot.lock().await;

        if let Some(record) = guard.as_ref() {
            if record.mtime == mtime {
                tracing::trace!(path = %key.display(), "probe cache hit");
                return Ok(Arc::clone(&record.info));
            }
            tracing::debug!(path = %key.display(), "probe cache entry stale, re-probing");
        }

        let prober = Arc::clone(&self.prober);
        let prober_name = prober.name();
        let probe_path = key.clone();
        let info = tokio::task::spawn_blocking(move || prober.probe(&probe_path))
            .await
            .map_err(|e| Error::tool_failed(prober_name, format!("probe task failed: {e}")))??;

        let info = Arc::new(info);
        *guard = Some(ProbeRecord {
            mtime,
            info: Arc::clone(&info),
        });
        Ok(info)
    }

    /// Number of cached paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
