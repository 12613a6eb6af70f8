//! On-demand transcode streaming.
//!
//! The controller classifies the source through the shared probe cache,
//! assembles engine parameters from the classification, and relays the
//! engine's output into a byte sink for as long as the consumer stays
//! connected. The engine process is killed and reaped on every exit path,
//! including consumer disconnect and cancellation.

mod sessions;

pub use sessions::{SessionGuard, SessionRegistry, StreamSession};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use castable_av::{engine, tools, ExitKind, OutputFormat, Result, TranscodePlan};

use crate::cache::ProbeCache;
use crate::compat::{Classifier, Compatibility};

/// Maximum bytes of engine stderr kept for diagnostics.
const STDERR_TAIL: usize = 16 * 1024;

/// Caller-tunable options for one stream request.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Burn a subtitle sidecar into the video, when the engine supports it.
    pub use_subtitles: bool,
    /// Explicit subtitle path; defaults to the classified sidecar.
    pub subtitle_path: Option<PathBuf>,
    /// Source audio track to select, by index within the audio streams.
    pub audio_track: Option<u32>,
}

/// Terminal state of a streaming session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The engine finished, or was stopped because the consumer went away.
    Completed {
        terminated_early: bool,
        exit_code: Option<i32>,
    },
    /// The engine itself failed.
    Failed {
        exit_code: Option<i32>,
        diagnostic: String,
    },
}

impl StreamOutcome {
    /// Whether this outcome is an engine failure.
    pub fn is_error(&self) -> bool {
        matches!(self, StreamOutcome::Failed { .. })
    }
}

/// Drives one external engine process per stream request.
pub struct StreamController {
    cache: Arc<ProbeCache>,
    classifier: Classifier,
    registry: SessionRegistry,
    ffmpeg: PathBuf,
    format: OutputFormat,
}

impl StreamController {
    /// Create a controller sharing the given cache and classifier.
    pub fn new(
        cache: Arc<ProbeCache>,
        classifier: Classifier,
        registry: SessionRegistry,
        ffmpeg: PathBuf,
        format: OutputFormat,
    ) -> Self {
        Self {
            cache,
            classifier,
            registry,
            ffmpeg,
            format,
        }
    }

    /// The container format this controller streams.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Stream a transcode of `path` into `sink`.
    ///
    /// Returns an error only when the session cannot start (probe or
    /// spawn failure); once the engine is running every ending is
    /// reported as a [`StreamOutcome`]. Consumer disconnect (the sink
    /// failing) and cancellation both terminate the engine and count as
    /// a completed, terminated-early session.
    pub async fn stream_transcode<W>(
        &self,
        path: &Path,
        mut sink: W,
        options: &StreamOptions,
        cancel: CancellationToken,
    ) -> Result<StreamOutcome>
    where
        W: AsyncWrite + Unpin,
    {
        tracing::debug!(source = %path.display(), "classifying stream source");
        let info = self.cache.metadata(path).await?;
        let report = self.classifier.classify(path, Some(&info));

        let plan = self.build_plan(path, &report, options);

        let session = self.registry.register(path.to_path_buf());
        let mut child = engine::spawn_transcode(&self.ffmpeg, &plan)?;
        tracing::info!(session = %session.id(), source = %path.display(), "transcode running");

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| castable_av::Error::tool_failed("ffmpeg", "stdout not captured"))?;
        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(engine::collect_stderr(stderr, STDERR_TAIL)));

        // Relay until EOF, sink failure, or cancellation. The latter two
        // must stop the engine itself, not merely stop reading from it.
        let mut stopped_locally = false;
        tokio::select! {
            relayed = tokio::io::copy(&mut stdout, &mut sink) => {
                match relayed {
                    Ok(bytes) => {
                        tracing::debug!(session = %session.id(), bytes, "engine output drained");
                    }
                    Err(e) => {
                        tracing::debug!(session = %session.id(), error = %e, "consumer went away, stopping engine");
                        stopped_locally = true;
                        let _ = child.start_kill();
                    }
                }
            }
            _ = cancel.cancelled() => {
                tracing::debug!(session = %session.id(), "stream cancelled, stopping engine");
                stopped_locally = true;
                let _ = child.start_kill();
            }
        }

        let status = child.wait().await?;
        let diagnostic = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        let _ = sink.flush().await;

        let outcome = match engine::classify_exit(status) {
            ExitKind::Clean => StreamOutcome::Completed {
                terminated_early: stopped_locally,
                exit_code: status.code(),
            },
            ExitKind::Terminated => StreamOutcome::Completed {
                terminated_early: true,
                exit_code: status.code(),
            },
            // The stop raced the engine's own exit; the consumer asked
            // for the stop, so it is not a failure.
            ExitKind::Error(_) if stopped_locally => StreamOutcome::Completed {
                terminated_early: true,
                exit_code: status.code(),
            },
            ExitKind::Error(code) => StreamOutcome::Failed {
                exit_code: Some(code),
                diagnostic,
            },
        };

        match &outcome {
            StreamOutcome::Completed {
                terminated_early, ..
            } => {
                tracing::info!(session = %session.id(), terminated_early, "transcode completed");
            }
            StreamOutcome::Failed { exit_code, .. } => {
                tracing::warn!(session = %session.id(), ?exit_code, "transcode failed");
            }
        }

        Ok(outcome)
    }

    fn build_plan(
        &self,
        path: &Path,
        report: &Compatibility,
        options: &StreamOptions,
    ) -> TranscodePlan {
        let mut plan = TranscodePlan::new(path.to_path_buf(), self.format);
        plan.video = report.video_action.clone();
        plan.audio = report.audio_action.clone();
        plan.audio_track = options.audio_track;
        if options.use_subtitles {
            plan.burn_subtitles = self.resolve_subtitles(report, options);
        }
        plan
    }

    /// Resolve the subtitle file to burn, if burning is possible at all.
    /// Missing engine support or a missing sidecar degrades to streaming
    /// without subtitles rather than failing the session.
    fn resolve_subtitles(
        &self,
        report: &Compatibility,
        options: &StreamOptions,
    ) -> Option<PathBuf> {
        let path = options
            .subtitle_path
            .clone()
            .or_else(|| report.subtitle_file.clone())?;

        if !tools::supports_subtitle_burn(&self.ffmpeg) {
            tracing::warn!("engine lacks the subtitles filter, streaming without burn-in");
            return None;
        }
        Some(path)
    }
}
