//! Media information types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Path to the media file.
    pub file_path: PathBuf,
    /// File size in bytes.
    pub file_size: u64,
    /// Raw container format name as reported by the prober. This may be a
    /// comma-separated list of candidates, e.g. "mov,mp4,m4a,3gp,3g2,mj2".
    pub container: String,
    /// Duration of the media.
    pub duration: Option<Duration>,
    /// Video tracks in the file.
    pub video_tracks: Vec<VideoTrack>,
    /// Audio tracks in the file.
    pub audio_tracks: Vec<AudioTrack>,
    /// Subtitle tracks in the file.
    pub subtitle_tracks: Vec<SubtitleTrack>,
}

/// Information about a video track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoTrack {
    /// Track index within its type.
    pub index: u32,
    /// Video codec (e.g., "h264", "hevc").
    pub codec: String,
    /// Codec profile (e.g., "High" for H.264).
    pub profile: Option<String>,
    /// Codec level as reported by the prober (e.g., 41 for 4.1; some
    /// builds report level 5.0 as plain 5).
    pub level: Option<i64>,
    /// Width in pixels.
    pub width: Option<u32>,
    /// Height in pixels.
    pub height: Option<u32>,
    /// Frame rate in FPS.
    pub frame_rate: Option<f64>,
    /// Whether this is the default track.
    pub default: bool,
}

/// Information about an audio track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Track index within its type.
    pub index: u32,
    /// Audio codec (e.g., "aac", "ac3").
    pub codec: String,
    /// Number of channels.
    pub channels: Option<u32>,
    /// Language code (e.g., "eng", "spa").
    pub language: Option<String>,
    /// Whether this is the default track.
    pub default: bool,
}

/// Information about a subtitle track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleTrack {
    /// Track index within its type.
    pub index: u32,
    /// Subtitle format (e.g., "subrip", "ass").
    pub codec: String,
    /// Language code.
    pub language: Option<String>,
    /// Whether this is the default track.
    pub default: bool,
    /// Whether this is a forced track.
    pub forced: bool,
}

impl MediaInfo {
    /// The set of container format identifiers this file may satisfy.
    pub fn container_formats(&self) -> impl Iterator<Item = &str> {
        self.container
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The video track a player would select: the one flagged default,
    /// falling back to the first.
    pub fn default_video(&self) -> Option<&VideoTrack> {
        self.video_tracks
            .iter()
            .find(|t| t.default)
            .or_else(|| self.video_tracks.first())
    }

    /// The audio track a player would select: the one flagged default,
    /// falling back to the first.
    pub fn default_audio(&self) -> Option<&AudioTrack> {
        self.audio_tracks
            .iter()
            .find(|t| t.default)
            .or_else(|| self.audio_tracks.first())
    }
}
