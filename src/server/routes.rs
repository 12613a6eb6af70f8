//! Route handlers.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use super::error::AppError;
use super::AppContext;
use crate::compat::Compatibility;
use crate::scanner::{ScanEntry, Scanner};
use crate::streaming::{StreamOptions, StreamSession};

pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Reject absolute paths and parent traversal, then resolve under the
/// library root.
fn resolve_library_path(ctx: &AppContext, rel: &str) -> Result<PathBuf, AppError> {
    let rel = sanitize_relative(rel)?;
    Ok(ctx.config.library.root.join(rel))
}

fn sanitize_relative(rel: &str) -> Result<PathBuf, AppError> {
    let path = Path::new(rel);
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir));
    if escapes {
        return Err(AppError::validation("path escapes the library root"));
    }
    Ok(path.to_path_buf())
}

#[derive(Debug, Deserialize)]
pub struct CompatibilityQuery {
    pub path: String,
}

/// GET /api/compatibility?path=<relative>
///
/// A missing file is a 404; an unreadable one degrades to an all-false
/// classification rather than an error.
pub async fn compatibility(
    State(ctx): State<AppContext>,
    Query(query): Query<CompatibilityQuery>,
) -> Result<Json<Compatibility>, AppError> {
    let abs = resolve_library_path(&ctx, &query.path)?;

    let report = match ctx.cache.metadata(&abs).await {
        Ok(info) => ctx.classifier.classify(&abs, Some(&info)),
        Err(e @ castable_av::Error::FileNotFound { .. }) => return Err(e.into()),
        Err(e) => {
            tracing::warn!(path = %abs.display(), error = %e, "probe failed, reporting incompatible");
            ctx.classifier.classify(&abs, None)
        }
    };

    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub compatibility: bool,
}

/// GET /api/browse?path=<relative>&compatibility=<bool>
pub async fn browse(
    State(ctx): State<AppContext>,
    Query(query): Query<BrowseQuery>,
) -> Result<Json<BTreeMap<String, ScanEntry>>, AppError> {
    let sub = sanitize_relative(&query.path)?;
    let scanner = Scanner::new(Arc::clone(&ctx.cache), ctx.classifier.clone());
    let entries = scanner
        .scan(&ctx.config.library.root, &sub, query.compatibility)
        .await?;
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub path: String,
    #[serde(default)]
    pub subtitles: bool,
    pub audio_track: Option<u32>,
}

/// GET /api/stream?path=<relative>&subtitles=<bool>&audio_track=<n>
///
/// Relays the transcode as the engine produces it. Dropping the
/// connection tears the engine process down.
pub async fn stream(
    State(ctx): State<AppContext>,
    Query(query): Query<StreamQuery>,
) -> Result<Response, AppError> {
    let abs = resolve_library_path(&ctx, &query.path)?;

    // Probe up front so unreadable sources fail with a status code
    // instead of an empty 200 stream; the controller reuses the cached
    // result.
    ctx.cache.metadata(&abs).await?;

    let options = StreamOptions {
        use_subtitles: query.subtitles || ctx.config.streaming.use_subtitles,
        subtitle_path: None,
        audio_track: query.audio_track,
    };
    let content_type = ctx.controller.format().content_type();

    let (reader, writer) = tokio::io::duplex(64 * 1024);
    let controller = Arc::clone(&ctx.controller);
    let cancel = CancellationToken::new();
    tokio::spawn(async move {
        match controller
            .stream_transcode(&abs, writer, &options, cancel)
            .await
        {
            Ok(outcome) if outcome.is_error() => {
                tracing::warn!(source = %abs.display(), ?outcome, "stream session failed");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(source = %abs.display(), error = %e, "stream session did not start");
            }
        }
    });

    let body = Body::from_stream(ReaderStream::new(reader));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(body)
        .map_err(|e| castable_av::Error::InvalidInput(e.to_string()).into())
}

/// GET /api/tools
pub async fn tools() -> Json<Vec<castable_av::ToolInfo>> {
    Json(castable_av::check_tools())
}

/// GET /api/sessions
pub async fn sessions(State(ctx): State<AppContext>) -> Json<Vec<StreamSession>> {
    Json(ctx.sessions.list())
}
