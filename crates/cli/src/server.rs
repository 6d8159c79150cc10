//! Local file server
//!
//! Serves project files to the app while a test runs. The app asks for
//! `GET /?file=<name>&root=<dir>` and receives the file bytes as base64 text.
//! Every resolved path must stay inside the serving root.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use vbook_common::{Error, Result};

/// How long `stop` waits for in-flight requests before aborting the listener
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

struct ServerState {
    root: PathBuf,
}

/// Handle to a running file server
///
/// The listener is released by `stop()` or, failing that, on drop.
pub struct LocalServer {
    address: SocketAddr,
    root: PathBuf,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl LocalServer {
    /// Bind on all interfaces at `port` and serve files below `root`.
    pub async fn start(port: u16, root: &Path) -> Result<Self> {
        let root = root
            .canonicalize()
            .map_err(|e| Error::filesystem("resolve", root, e))?;

        let bind_addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = tokio::net::TcpListener::bind(bind_addr)
            .await
            .map_err(|e| Error::network("bind", bind_addr.to_string(), e))?;
        let address = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = router(root.clone());
        let task = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                warn!("File server stopped with error: {}", e);
            }
        });

        info!("File server listening on {} for {}", address, root.display());
        Ok(Self {
            address,
            root,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn port(&self) -> u16 {
        self.address.port()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop accepting connections and wait briefly for the listener task.
    pub async fn stop(mut self) {
        self.signal_shutdown();
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                warn!("File server did not stop within {:?}, aborting", SHUTDOWN_GRACE);
                task.abort();
            }
        }
        debug!("File server on {} stopped", self.address);
    }

    fn signal_shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for LocalServer {
    fn drop(&mut self) {
        self.signal_shutdown();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Router with the single catch-all file route
pub(crate) fn router(root: PathBuf) -> Router {
    Router::new()
        .fallback(serve_file)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(ServerState { root }))
}

async fn serve_file(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let file = params.get("file").map(String::as_str).unwrap_or_default();
    let dir = params.get("root").map(String::as_str).unwrap_or_default();

    if file.is_empty() || dir.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "Missing required query parameters: file and root",
        )
            .into_response();
    }

    let Some(requested) = resolve_within(&state.root, dir, file) else {
        warn!("Rejected path outside serving root: root={} file={}", dir, file);
        return forbidden();
    };

    // symlinks may still point outside the root
    let resolved = match tokio::fs::canonicalize(&requested).await {
        Ok(path) => path,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("File not found: {}", requested.display());
            return (StatusCode::NOT_FOUND, "File not found").into_response();
        }
        Err(e) => {
            warn!("Failed to resolve {}: {}", requested.display(), e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error reading file").into_response();
        }
    };
    if !resolved.starts_with(&state.root) {
        warn!(
            "Rejected symlink escape: {} -> {}",
            requested.display(),
            resolved.display()
        );
        return forbidden();
    }

    match tokio::fs::read(&resolved).await {
        Ok(bytes) => {
            let encoded = STANDARD.encode(&bytes);
            debug!("Serving {} ({} bytes)", resolved.display(), bytes.len());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/plain".to_string()),
                    (header::CONTENT_LENGTH, encoded.len().to_string()),
                ],
                encoded,
            )
                .into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
        Err(e) => {
            warn!("Failed to read {}: {}", resolved.display(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error reading file").into_response()
        }
    }
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        "Access denied: file outside project directory",
    )
        .into_response()
}

/// Join `dir/file` onto `root` lexically, `None` if the result leaves `root`.
pub(crate) fn resolve_within(root: &Path, dir: &str, file: &str) -> Option<PathBuf> {
    let joined = Path::new(dir).join(file);
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in joined.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.iter().fold(root.to_path_buf(), |path, part| path.join(part)))
}
