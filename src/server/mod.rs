//! HTTP server assembly.

mod error;
mod routes;

pub use error::AppError;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use castable_av::{tools, FfprobeProber, Prober};

use crate::cache::ProbeCache;
use crate::compat::Classifier;
use crate::config::Config;
use crate::streaming::{SessionRegistry, StreamController};

/// Shared application context (cheaply cloneable; Arcs only).
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub cache: Arc<ProbeCache>,
    pub classifier: Classifier,
    pub controller: Arc<StreamController>,
    pub sessions: SessionRegistry,
}

impl AppContext {
    /// Wire up the component graph: one cache, one classifier, one
    /// stream controller, shared by every request.
    pub fn from_config(config: Config) -> Result<Self> {
        let prober: Arc<dyn Prober> = Arc::new(
            FfprobeProber::discover(config.tools.ffprobe_path.as_deref())
                .context("ffprobe is required")?,
        );
        let cache = Arc::new(ProbeCache::new(prober));
        let classifier = Classifier::new();
        let sessions = SessionRegistry::new();

        let ffmpeg = tools::get_tool_path("ffmpeg", config.tools.ffmpeg_path.as_deref())
            .context("ffmpeg is required")?;
        let controller = Arc::new(StreamController::new(
            Arc::clone(&cache),
            classifier.clone(),
            sessions.clone(),
            ffmpeg,
            config.streaming.format,
        ));

        Ok(Self {
            config: Arc::new(config),
            cache,
            classifier,
            controller,
            sessions,
        })
    }
}

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health_check))
        .route("/api/compatibility", get(routes::compatibility))
        .route("/api/browse", get(routes::browse))
        .route("/api/stream", get(routes::stream))
        .route("/api/tools", get(routes::tools))
        .route("/api/sessions", get(routes::sessions))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::from_config(config)?;
    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
