//! Media file probing.
//!
//! The [`Prober`] trait abstracts metadata extraction so callers can be
//! tested against fakes; [`FfprobeProber`] is the production
//! implementation, shelling out to ffprobe.

mod ffprobe;
mod types;

pub use types::{AudioTrack, MediaInfo, SubtitleTrack, VideoTrack};

use crate::{tools, Result};
use std::path::{Path, PathBuf};

/// A media file prober capable of extracting metadata from media files.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
pub trait Prober: Send + Sync {
    /// Human-readable name identifying this prober implementation.
    fn name(&self) -> &'static str;

    /// Probe a media file at the given path and extract metadata.
    ///
    /// Returns a [`MediaInfo`] on success, or an error if the file cannot
    /// be read or parsed. This may block on an external process; run it
    /// on a blocking-capable thread from async contexts.
    fn probe(&self, path: &Path) -> Result<MediaInfo>;
}

/// The ffprobe-backed [`Prober`].
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe: PathBuf,
}

impl FfprobeProber {
    /// Create a prober using the given ffprobe binary.
    pub fn new(ffprobe: PathBuf) -> Self {
        Self { ffprobe }
    }

    /// Locate ffprobe (preferring `config_path` over `PATH`) and build a
    /// prober around it.
    pub fn discover(config_path: Option<&Path>) -> Result<Self> {
        tools::get_tool_path("ffprobe", config_path).map(Self::new)
    }
}

impl Prober for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    fn probe(&self, path: &Path) -> Result<MediaInfo> {
        ffprobe::probe_with_ffprobe(&self.ffprobe, path)
    }
}
