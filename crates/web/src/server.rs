//! Folder server lifecycle - binding, serving and closing

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{WebError, WebResult};
use crate::static_files::folder_router;

/// Port the folder server binds unless told otherwise
pub const DEFAULT_PORT: u16 = 8080;

/// How long `close` waits for in-flight connections to drain
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle to a bound server serving a folder
///
/// The listening socket is owned by a background task. `close` consumes the
/// handle, so a server is closed exactly once.
pub struct StaticServer {
    dir: PathBuf,
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

/// Configuration for serving a folder
#[derive(Debug, Clone)]
pub struct FolderConfig {
    /// Folder to serve
    pub dir: PathBuf,

    /// Port to listen on (0 = any free port)
    pub port: u16,

    /// Fallback file for unmatched routes
    pub spa: Option<String>,
}

impl FolderConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            port: DEFAULT_PORT,
            spa: None,
        }
    }
}

/// Bind a server for `dir` on `port`, with optional SPA fallback
pub async fn serve_folder(dir: &Path, port: u16, spa: Option<&str>) -> WebResult<StaticServer> {
    StaticServer::bind(FolderConfig {
        dir: dir.to_path_buf(),
        port,
        spa: spa.map(str::to_string),
    })
    .await
}

impl StaticServer {
    /// Bind and start serving
    ///
    /// Fails before binding when the folder does not exist.
    pub async fn bind(config: FolderConfig) -> WebResult<Self> {
        debug!(
            "serving local folder {} on port {} (spa: {:?})",
            config.dir.display(),
            config.port,
            config.spa
        );

        if !config.dir.is_dir() {
            return Err(WebError::FolderNotFound(config.dir));
        }

        let listener = TcpListener::bind(("127.0.0.1", config.port))
            .await
            .map_err(|source| WebError::Bind {
                port: config.port,
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let app = folder_router(&config.dir, config.spa.as_deref());
        let (tx, rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
        });

        info!(
            "Local server for {} listening on {}",
            config.dir.display(),
            local_addr
        );

        Ok(Self {
            dir: config.dir,
            local_addr,
            shutdown: Some(tx),
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Base URL tests run against
    pub fn base_url(&self) -> String {
        format!("http://localhost:{}", self.port())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stop accepting connections and wait for the server task to finish
    pub async fn close(mut self) -> WebResult<()> {
        let port = self.port();

        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        let Some(mut task) = self.task.take() else {
            return Ok(());
        };

        match tokio::time::timeout(CLOSE_TIMEOUT, &mut task).await {
            Ok(Ok(Ok(()))) => {
                debug!("closed local server on port {}", port);
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(WebError::Close {
                port,
                reason: e.to_string(),
            }),
            Ok(Err(join)) => Err(WebError::Close {
                port,
                reason: join.to_string(),
            }),
            Err(_) => {
                task.abort();
                Err(WebError::CloseTimeout {
                    port,
                    timeout: CLOSE_TIMEOUT,
                })
            }
        }
    }
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        // Only reached when `close` was never awaited
        if let Some(tx) = self.shutdown.take() {
            warn!("Local server on port {} dropped without close", self.port());
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
