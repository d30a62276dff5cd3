//! Local feed publisher.
//!
//! A trust-boundary-free HTTP distribution point for a fixed directory
//! containing a descriptor document (`latest.yml`) and installer artifacts.
//! No authentication, no TLS, no range requests — it plays the role of a
//! local/dev feed origin.
//!
//! ## Endpoints
//!
//! - `GET /update-info` — descriptor text in a JSON envelope
//! - `GET /download/{file}` — raw bytes of any file under the root
//! - `GET /` — liveness string

use crate::config::PublisherConfig;
use crate::error::{Result, UpdaterError};
use crate::feed::client::FeedEnvelope;
use crate::feed::descriptor::VersionDescriptor;
use axum::Router;
use axum::extract::{Path as UrlPath, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Liveness string served at `/`.
const LIVENESS: &str = "updraft feed server running";

/// Shared state for axum handlers.
#[derive(Clone)]
struct AppState {
    root: Arc<PathBuf>,
    descriptor_path: Arc<PathBuf>,
}

/// Long-running HTTP service publishing the feed for one root directory.
pub struct FeedPublisher {
    /// The address the server is listening on.
    addr: SocketAddr,
    /// Handle to the background server task.
    handle: JoinHandle<()>,
}

impl FeedPublisher {
    /// Start the feed publisher.
    ///
    /// Binds to `{config.host}:{config.port}` (use port `0` for auto-assign)
    /// and begins serving in a background tokio task. Reads and parses the
    /// descriptor once at boot to log the published version and artifact
    /// URL; an unreadable or unparsable descriptor falls back to a
    /// hardcoded default so the service always starts, at the cost of
    /// logging possibly-stale metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot bind.
    pub async fn start(config: &PublisherConfig) -> Result<Self> {
        let state = AppState {
            root: Arc::new(config.root_dir.clone()),
            descriptor_path: Arc::new(config.descriptor_path()),
        };

        let app = Router::new()
            .route("/", get(handle_liveness))
            .route("/update-info", get(handle_update_info))
            .route("/download/{*file}", get(handle_download))
            .with_state(state);

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| UpdaterError::Server(format!("feed server bind failed: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| UpdaterError::Server(format!("failed to get local addr: {e}")))?;

        let descriptor = boot_descriptor(&config.descriptor_path());
        info!("feed server listening on http://{addr}");
        info!("- version: {}", descriptor.version);
        info!(
            "- descriptor: http://{addr}/download/{}",
            config.descriptor_file
        );
        info!("- artifact: http://{addr}/download/{}", descriptor.path);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("feed server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Base URL of the feed, as a client would configure it.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for FeedPublisher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Descriptor used for the startup log. Falls back to a hardcoded default
/// when the document is unreadable so startup never fails.
fn boot_descriptor(path: &std::path::Path) -> VersionDescriptor {
    match std::fs::read_to_string(path) {
        Ok(text) => match VersionDescriptor::parse(&text) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!("descriptor {} unparsable at boot: {e}", path.display());
                fallback_descriptor()
            }
        },
        Err(e) => {
            warn!("descriptor {} unreadable at boot: {e}", path.display());
            fallback_descriptor()
        }
    }
}

fn fallback_descriptor() -> VersionDescriptor {
    VersionDescriptor {
        version: semver::Version::new(1, 0, 0),
        path: "updraft-demo-1.0.0-setup.exe".to_owned(),
        release_date: None,
        size: None,
        sha512: None,
    }
}

/// `GET /` — liveness probe.
async fn handle_liveness() -> &'static str {
    LIVENESS
}

/// `GET /update-info` — descriptor document text, wrapped in the envelope.
/// Read fresh on every request; the stored document is the single source of
/// truth for "latest version".
async fn handle_update_info(State(state): State<AppState>) -> (StatusCode, Json<FeedEnvelope>) {
    match tokio::fs::read_to_string(state.descriptor_path.as_ref()).await {
        Ok(text) => (
            StatusCode::OK,
            Json(FeedEnvelope {
                success: true,
                data: Some(text),
                message: Some("update info read".to_owned()),
                error: None,
            }),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(FeedEnvelope {
                success: false,
                data: None,
                message: Some("failed to read update info".to_owned()),
                error: Some(e.to_string()),
            }),
        ),
    }
}

/// `GET /download/{file}` — static file bytes from the root directory.
async fn handle_download(
    State(state): State<AppState>,
    UrlPath(file): UrlPath<String>,
) -> Response {
    if !is_safe_relative(&file) {
        warn!("rejected download path {file:?}");
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = state.root.join(&file);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, content_type_for(&file))],
            bytes,
        )
            .into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Reject anything that could resolve outside the served root.
fn is_safe_relative(file: &str) -> bool {
    !file.is_empty()
        && !file.starts_with('/')
        && !file.contains('\\')
        && file.split('/').all(|segment| segment != ".." && !segment.is_empty())
}

/// Static-file content type by extension.
fn content_type_for(file: &str) -> &'static str {
    match file.rsplit('.').next() {
        Some("yml" | "yaml") => "text/yaml",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}
