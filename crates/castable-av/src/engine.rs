//! Launching and reaping the external transcoding engine.
//!
//! The engine runs as a long-lived child process whose stdout carries the
//! encoded byte stream. The caller owns the returned [`Child`] for the
//! session's lifetime; `kill_on_drop` guarantees the process does not
//! outlive its session even on abnormal exit paths.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, Command};

use crate::encode::TranscodePlan;
use crate::{Error, Result};

/// Spawn the engine for a live streaming transcode.
///
/// stdout is piped (the encoded output), stderr is piped (diagnostics),
/// stdin is closed.
pub fn spawn_transcode(ffmpeg: &Path, plan: &TranscodePlan) -> Result<Child> {
    let args = plan.to_args();
    tracing::debug!(engine = %ffmpeg.display(), ?args, "launching transcode engine");

    Command::new(ffmpeg)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found("ffmpeg")
            } else {
                Error::Io(e)
            }
        })
}

/// How an engine exit status should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// The engine finished its work.
    Clean,
    /// The engine was stopped from outside (signal, or ffmpeg's 255 exit
    /// when its output pipe closes under it).
    Terminated,
    /// The engine itself failed with this exit code.
    Error(i32),
}

/// Classify an engine exit status.
pub fn classify_exit(status: ExitStatus) -> ExitKind {
    match status.code() {
        Some(0) => ExitKind::Clean,
        Some(255) | None => ExitKind::Terminated,
        Some(code) => ExitKind::Error(code),
    }
}

/// Collect up to `max` trailing bytes of the engine's stderr.
///
/// The engine can emit a great deal of progress chatter on a long
/// transcode; only the tail matters for diagnostics.
pub async fn collect_stderr(mut stderr: ChildStderr, max: usize) -> String {
    let mut tail: Vec<u8> = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stderr.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                tail.extend_from_slice(&buf[..n]);
                if tail.len() > max {
                    let excess = tail.len() - max;
                    tail.drain(..excess);
                }
            }
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&tail).into_owned()
}
