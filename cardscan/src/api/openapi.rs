use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cardscan API",
        version = "1.0.0",
        description = "Insurance-card text extraction backed by Google Cloud Vision.",
    ),
    paths(handlers::ocr::extract_text, handlers::ocr::ocr_status),
    components(schemas(
        handlers::ocr::OcrResponse,
        handlers::ocr::OcrErrorResponse,
        handlers::ocr::OcrStatusResponse,
    )),
    tags(
        (name = "ocr", description = "Image upload and text detection"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
