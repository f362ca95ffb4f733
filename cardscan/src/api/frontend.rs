use std::path::Path;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use super::AppState;

/// Attach the page fallback: the built frontend bundle when `STATIC_DIR` is
/// set, a bare 404 otherwise. Unknown non-file paths get `index.html` so
/// client-side routes like `/fr/dashboard` resolve.
pub fn with_frontend(router: Router<AppState>, static_dir: Option<&str>) -> Router<AppState> {
    match static_dir {
        Some(dir) => {
            let index = Path::new(dir).join("index.html");
            router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)))
        }
        None => router.fallback(not_found),
    }
}

async fn not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}
