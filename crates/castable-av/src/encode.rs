//! Typed transcode parameters.
//!
//! The classifier decides *what* should happen to each stream; this module
//! owns the vocabulary for those decisions and renders them to engine
//! argument syntax at the tool boundary, so nothing outside this crate
//! formats ffmpeg arguments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// What to do with the video stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum VideoAction {
    /// Pass the stream through untouched.
    Copy,
    /// Re-encode with the given parameters.
    Encode(VideoEncode),
}

/// Video re-encode parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEncode {
    /// Engine encoder name, e.g. "libx264".
    pub encoder: String,
    /// Target profile, e.g. "high".
    pub profile: String,
    /// Target level, e.g. "5.0".
    pub level: String,
}

impl VideoEncode {
    /// H.264 High Profile level 5.0, the widest target the device plays.
    pub fn h264_high_level50() -> Self {
        Self {
            encoder: "libx264".to_string(),
            profile: "high".to_string(),
            level: "5.0".to_string(),
        }
    }
}

impl VideoAction {
    /// Render to engine arguments.
    pub fn to_args(&self) -> Vec<String> {
        match self {
            VideoAction::Copy => vec!["-vcodec".into(), "copy".into()],
            VideoAction::Encode(e) => vec![
                "-vcodec".into(),
                e.encoder.clone(),
                "-profile:v".into(),
                e.profile.clone(),
                "-level".into(),
                e.level.clone(),
            ],
        }
    }
}

impl fmt::Display for VideoAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoAction::Copy => write!(f, "copy"),
            VideoAction::Encode(e) => write!(f, "{} {}@{}", e.encoder, e.profile, e.level),
        }
    }
}

/// What to do with the audio stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AudioAction {
    /// Pass the stream through untouched.
    Copy,
    /// Re-encode with the given parameters.
    Encode(AudioEncode),
}

/// Audio re-encode parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioEncode {
    /// Engine encoder name, e.g. "aac".
    pub encoder: String,
    /// Variable-quality target (`-q:a`).
    pub quality: u32,
}

impl AudioEncode {
    /// AAC at quality target 100.
    pub fn aac_quality100() -> Self {
        Self {
            encoder: "aac".to_string(),
            quality: 100,
        }
    }
}

impl AudioAction {
    /// Render to engine arguments.
    pub fn to_args(&self) -> Vec<String> {
        match self {
            AudioAction::Copy => vec!["-acodec".into(), "copy".into()],
            AudioAction::Encode(e) => vec![
                "-acodec".into(),
                e.encoder.clone(),
                "-q:a".into(),
                e.quality.to_string(),
            ],
        }
    }
}

impl fmt::Display for AudioAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioAction::Copy => write!(f, "copy"),
            AudioAction::Encode(e) => write!(f, "{} q{}", e.encoder, e.quality),
        }
    }
}

/// Container format for the engine's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Matroska muxes incrementally, which a pipe needs.
    #[default]
    Matroska,
    Mp4,
    Webm,
}

impl OutputFormat {
    /// Engine muxer name.
    pub fn as_engine_name(&self) -> &'static str {
        match self {
            OutputFormat::Matroska => "matroska",
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
        }
    }

    /// MIME type for HTTP responses carrying this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Matroska => "video/x-matroska",
            OutputFormat::Mp4 => "video/mp4",
            OutputFormat::Webm => "video/webm",
        }
    }
}

/// Ordered parameters for one streaming transcode.
#[derive(Debug, Clone)]
pub struct TranscodePlan {
    /// Source file.
    pub input: PathBuf,
    /// Output container format, written to stdout.
    pub format: OutputFormat,
    /// Video stream handling; `None` leaves the engine's default.
    pub video: Option<VideoAction>,
    /// Audio stream handling; `None` leaves the engine's default.
    pub audio: Option<AudioAction>,
    /// Subtitle file to burn into the video, if any.
    pub burn_subtitles: Option<PathBuf>,
    /// Source audio track to select, by index within the audio streams.
    pub audio_track: Option<u32>,
}

impl TranscodePlan {
    /// Create a plan with no stream directives.
    pub fn new(input: PathBuf, format: OutputFormat) -> Self {
        Self {
            input,
            format,
            video: None,
            audio: None,
            burn_subtitles: None,
            audio_track: None,
        }
    }

    /// Render the full engine argument sequence, output to stdout.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-i".into(),
            self.input.to_string_lossy().into_owned(),
            "-strict".into(),
            "experimental".into(),
        ];

        if let Some(track) = self.audio_track {
            args.push("-map".into());
            args.push("0:v:0".into());
            args.push("-map".into());
            args.push(format!("0:a:{}", track));
        }

        if let Some(ref video) = self.video {
            args.extend(video.to_args());
        }
        if let Some(ref audio) = self.audio {
            args.extend(audio.to_args());
        }

        if let Some(ref subs) = self.burn_subtitles {
            args.push("-vf".into());
            args.push(format!("subtitles={}", subs.display()));
        }

        args.push("-f".into());
        args.push(self.format.as_engine_name().into());
        args.push("pipe:1".into());

        args
    }
}
