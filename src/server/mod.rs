//! HTTP analysis server.
//!
//! The server resolves its run configuration once at startup. Every request
//! clones that base configuration, applies its own metadata and runs the
//! classifier on a blocking task.

mod handler;
mod meta;
mod routes;
mod storage;

pub use handler::{
    AnalyzeReply, AnalyzeRequest, AnalyzeResponse, RequestFailure, RequestHandler, RequestStage,
    UploadedAudio,
};
pub use meta::{RequestMeta, server_sensitivity};
pub use routes::router;
pub use storage::StoredUpload;

use crate::config::{Config, ConfigResolver, Profile, RunConfiguration, RunMode, ServerConfig};
use crate::error::{Error, Result};
use crate::inference::{Classifier, ExternalAnalyzer, SpeciesFilter};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Immutable state shared by all requests.
pub struct ServerContext {
    /// Configuration resolved at startup.
    pub base: RunConfiguration,
    /// Root directory for persisted uploads.
    pub storage_path: PathBuf,
    /// Directory for temporary uploads; system default when `None`.
    pub temp_dir: Option<PathBuf>,
    /// Classifier invoked once per request.
    pub classifier: Arc<dyn Classifier>,
    /// Species filter used when a request carries coordinates.
    pub species_filter: Arc<dyn SpeciesFilter>,
}

/// Resolve the server configuration, failing on an unknown area.
pub fn build_context(settings: &ServerConfig, config: &Config) -> Result<ServerContext> {
    let resolver = ConfigResolver::new(Profile::Server, config).high_accuracy(settings.no_noise);
    let base = resolver.resolve_strict(
        &settings.area,
        &settings.locale,
        RunMode::SingleFile {
            threads: settings.threads,
        },
    )?;

    let analyzer = Arc::new(ExternalAnalyzer::from_config(&config.analyzer));

    Ok(ServerContext {
        base,
        storage_path: settings.storage_path.clone(),
        temp_dir: settings.temp_dir.clone(),
        classifier: analyzer.clone(),
        species_filter: analyzer,
    })
}

/// Resolve the configuration and serve until Ctrl+C.
pub fn run(settings: &ServerConfig, config: &Config) -> Result<()> {
    let context = build_context(settings, config)?;
    let handler = Arc::new(RequestHandler::new(context));
    let addr = format!("{}:{}", settings.host, settings.port);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(handler, &addr, settings.max_upload_bytes))
}

/// Bind `addr` and serve requests until shutdown.
pub async fn serve(handler: Arc<RequestHandler>, addr: &str, max_upload_bytes: usize) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::ServerBind {
            addr: addr.to_string(),
            source: e,
        })?;

    info!("UP AND RUNNING! LISTENING ON {addr}");

    axum::serve(listener, router(handler, max_upload_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
