//! Sitegate Web
//!
//! Serves a built publish folder over HTTP so end-to-end tests can run
//! against it before the site is deployed.

pub mod error;
pub mod server;
pub mod static_files;

pub use error::{WebError, WebResult};
pub use server::{serve_folder, FolderConfig, StaticServer, DEFAULT_PORT};
pub use static_files::folder_router;
