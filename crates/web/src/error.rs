//! Error types for the static folder server

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Cannot find folder \"{}\" to serve", .0.display())]
    FolderNotFound(PathBuf),

    #[error("Failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Server on port {port} failed while closing: {reason}")]
    Close { port: u16, reason: String },

    #[error("Server on port {port} did not close within {timeout:?}")]
    CloseTimeout { port: u16, timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WebResult<T> = Result<T, WebError>;
