//! External tool detection and management.

use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

/// Information about an external tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check if a tool is available and get its information.
pub fn check_tool(name: &str) -> ToolInfo {
    let result = Command::new(name).arg("-version").output();

    match result {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string());

            let path = which::which(name).ok();

            ToolInfo {
                name: name.to_string(),
                available: true,
                version,
                path,
            }
        }
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check the media tools this crate drives.
///
/// Returns information about ffmpeg and ffprobe.
pub fn check_tools() -> Vec<ToolInfo> {
    vec![check_tool("ffmpeg"), check_tool("ffprobe")]
}

/// Require that a tool is available, returning its path.
///
/// # Errors
///
/// Returns an error if the tool is not found.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Get the path to a tool, preferring a configured path over PATH lookup.
pub fn get_tool_path(name: &str, config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    require_tool(name)
}

static SUBTITLE_FILTER: OnceLock<bool> = OnceLock::new();

/// Whether the engine build carries the `subtitles` burn-in filter.
///
/// ffmpeg builds without libass lack it; callers gate burn-in on this so a
/// missing filter degrades to streaming without subtitles instead of a
/// failed session. Detected once per process.
pub fn supports_subtitle_burn(ffmpeg: &Path) -> bool {
    *SUBTITLE_FILTER.get_or_init(|| {
        let output = Command::new(ffmpeg)
            .args(["-hide_banner", "-filters"])
            .output();

        match output {
            Ok(out) if out.status.success() => {
                let listed = String::from_utf8_lossy(&out.stdout)
                    .lines()
                    .any(|line| line.split_whitespace().nth(1) == Some("subtitles"));
                tracing::debug!(supported = listed, "subtitle burn-in filter detection");
                listed
            }
            _ => false,
        }
    })
}
