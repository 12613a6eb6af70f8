//! Device compatibility classification.
//!
//! Decides whether a probed file plays natively on the target device and,
//! when it does not, which transcode parameters would make it play.
//!
//! The device profile matches a Chromecast-class player:
//! - Video: H.264 High Profile, levels 3.1 / 4.1 / 4.2 / 5.0
//! - Audio: AAC, MP3, Vorbis, Opus
//! - Containers: MP4, WebM

use serde::Serialize;
use std::path::{Path, PathBuf};

use castable_av::{
    AudioAction, AudioEncode, AudioTrack, MediaInfo, VideoAction, VideoEncode, VideoTrack,
};

/// Audio codecs the device decodes natively.
pub const NATIVE_AUDIO_CODECS: &[&str] = &["aac", "mp3", "vorbis", "opus"];

/// H.264 levels the device plays, in the prober's integer notation.
pub const NATIVE_H264_LEVELS: &[i64] = &[31, 41, 42, 50];

/// Container formats the device accepts.
pub const NATIVE_CONTAINERS: &[&str] = &["mp4", "webm"];

/// Result of classifying one file against the device profile.
#[derive(Debug, Clone, Serialize)]
pub struct Compatibility {
    pub video_compatible: bool,
    pub audio_compatible: bool,
    pub container_compatible: bool,
    /// Overall verdict: all three of the above.
    pub compatible: bool,
    /// How the video stream should be handled; absent when the file has
    /// no video stream or probing failed.
    pub video_action: Option<VideoAction>,
    /// How the audio stream should be handled; absent when the file has
    /// no audio stream or probing failed.
    pub audio_action: Option<AudioAction>,
    /// Sidecar subtitle file next to the source, if one exists.
    pub subtitle_file: Option<PathBuf>,
    /// Advisory engine invocation for an offline conversion to MP4.
    pub recommended_command: Option<String>,
    /// Raw probe metadata, when probing succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_info: Option<MediaInfo>,
}

impl Compatibility {
    /// The all-false value used when no metadata is available.
    fn incompatible(subtitle_file: Option<PathBuf>) -> Self {
        Self {
            video_compatible: false,
            audio_compatible: false,
            container_compatible: false,
            compatible: false,
            video_action: None,
            audio_action: None,
            subtitle_file,
            recommended_command: None,
            media_info: None,
        }
    }
}

/// Classifier for the fixed device profile.
#[derive(Debug, Clone, Default)]
pub struct Classifier;

impl Classifier {
    /// Create a new classifier.
    pub fn new() -> Self {
        Self
    }

    /// Classify a file against the device profile.
    ///
    /// `info` is `None` when probing failed; the file is then reported
    /// incompatible on all axes. This function itself never fails.
    pub fn classify(&self, path: &Path, info: Option<&MediaInfo>) -> Compatibility {
        // The sidecar check does not depend on probe data.
        let subtitle_file = find_subtitle_sidecar(path);

        let Some(info) = info else {
            return Compatibility::incompatible(subtitle_file);
        };

        let (video_compatible, video_action) = match info.default_video() {
            Some(track) => {
                let native = is_native_video(track);
                let action = if native {
                    VideoAction::Copy
                } else {
                    VideoAction::Encode(VideoEncode::h264_high_level50())
                };
                (native, Some(action))
            }
            None => (false, None),
        };

        let (audio_compatible, audio_action) = match info.default_audio() {
            Some(track) => {
                let native = is_native_audio(track);
                let action = if native {
                    AudioAction::Copy
                } else {
                    AudioAction::Encode(AudioEncode::aac_quality100())
                };
                (native, Some(action))
            }
            None => (false, None),
        };

        let container_compatible = info
            .container_formats()
            .any(|f| NATIVE_CONTAINERS.contains(&f));

        let compatible = video_compatible && audio_compatible && container_compatible;

        let recommended_command = Some(recommended_command(
            path,
            video_action.as_ref(),
            audio_action.as_ref(),
        ));

        Compatibility {
            video_compatible,
            audio_compatible,
            container_compatible,
            compatible,
            video_action,
            audio_action,
            subtitle_file,
            recommended_command,
            media_info: Some(info.clone()),
        }
    }
}

fn is_native_video(track: &VideoTrack) -> bool {
    track.codec == "h264"
        && track.profile.as_deref() == Some("High")
        && track
            .level
            .map(normalize_level)
            .is_some_and(|level| NATIVE_H264_LEVELS.contains(&level))
}

/// Some prober builds report level 5.0 as plain 5 rather than 50.
fn normalize_level(level: i64) -> i64 {
    if (1..10).contains(&level) {
        level * 10
    } else {
        level
    }
}

fn is_native_audio(track: &AudioTrack) -> bool {
    NATIVE_AUDIO_CODECS.contains(&track.codec.as_str())
}

/// A sidecar `.srt` sharing the source's stem counts as the file's
/// subtitles. Existence only; content is never validated here.
fn find_subtitle_sidecar(path: &Path) -> Option<PathBuf> {
    let candidate = path.with_extension("srt");
    candidate.is_file().then_some(candidate)
}

/// Advisory command line for converting the file offline into MP4.
fn recommended_command(
    path: &Path,
    video: Option<&VideoAction>,
    audio: Option<&AudioAction>,
) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut cmd = format!("ffmpeg -i \"{name}\"");
    if let Some(video) = video {
        cmd.push(' ');
        cmd.push_str(&video.to_args().join(" "));
    }
    if let Some(audio) = audio {
        cmd.push(' ');
        cmd.push_str(&audio.to_args().join(" "));
    }
    cmd.push_str(&format!(" \"{stem}.mp4\""));
    cmd
}
