//! Static file serving for a built publish folder

use std::path::Path;

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Build the router serving `dir`
///
/// With `spa` set, any path that does not match a file is answered with that
/// file from `dir` (status 200), so client-side routes resolve.
pub fn folder_router(dir: &Path, spa: Option<&str>) -> Router {
    let serve_dir = ServeDir::new(dir).append_index_html_on_directories(true);

    let router = match spa {
        Some(file) => {
            let fallback = ServeFile::new(dir.join(file));
            Router::new().fallback_service(serve_dir.fallback(fallback))
        }
        None => Router::new().fallback_service(serve_dir),
    };

    router.layer(TraceLayer::new_for_http())
}
