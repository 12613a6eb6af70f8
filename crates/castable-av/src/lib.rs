//! # castable-av
//!
//! Media probing and transcode-engine driving for castable.
//!
//! This crate owns the boundary to the external media tools:
//! - Probing media files via ffprobe to extract per-stream metadata
//! - Typed transcode parameters, rendered to engine argument syntax
//! - Spawning and classifying the exit of streaming ffmpeg transcodes
//! - External tool discovery and capability detection
//!
//! ## Example
//!
//! ```no_run
//! use castable_av::{FfprobeProber, Prober};
//!
//! let prober = FfprobeProber::discover(None)?;
//! let info = prober.probe(std::path::Path::new("/path/to/video.mkv"))?;
//! println!("Container: {}", info.container);
//! # Ok::<(), castable_av::Error>(())
//! ```

mod error;

pub mod encode;
pub mod engine;
pub mod probe;
pub mod tools;

// Re-exports
pub use encode::{
    AudioAction, AudioEncode, OutputFormat, TranscodePlan, VideoAction, VideoEncode,
};
pub use engine::{classify_exit, collect_stderr, spawn_transcode, ExitKind};
pub use error::{Error, Result};
pub use probe::{AudioTrack, FfprobeProber, MediaInfo, Prober, SubtitleTrack, VideoTrack};
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};
