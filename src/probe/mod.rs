// Re-export all probe functionality from castable-av
pub use castable_av::probe::*;
pub use castable_av::{check_tool, check_tools, ToolInfo};

use castable_av::Result;
use std::path::Path;

/// Probe a media file with the ffprobe found on PATH.
pub fn probe_file(path: &Path) -> Result<MediaInfo> {
    FfprobeProber::discover(None)?.probe(path)
}
