//! Error types for sitegate

use thiserror::Error;

/// Result type alias using the sitegate common Error
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration and input errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported browser \"{0}\", expected one of: chromium, electron")]
    UnsupportedBrowser(String),

    #[error("Invalid wait-on-timeout \"{0}\", expected a positive number of seconds")]
    InvalidTimeout(String),

    #[error("Missing {0}")]
    MissingEnv(&'static str),
}
