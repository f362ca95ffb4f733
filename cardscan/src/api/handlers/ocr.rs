use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::extractors::Delay;
use crate::api::state::AppState;
use crate::error::{CardscanError, Result};

/// Multipart field carrying the card image.
pub const IMAGE_FIELD: &str = "image";

/// Largest accepted image, in bytes (4 MiB).
pub const MAX_FILE_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct OcrResponse {
    /// First text annotation, or `"No text found."`.
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct OcrErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct OcrStatusResponse {
    pub message: String,
}

/// `POST /api/ocr`
///
/// Accepts a multipart form with an `image` field, runs text detection and
/// returns `{ text }`. An optional `delay` query parameter (milliseconds)
/// holds the response back for latency testing.
#[utoipa::path(
    post,
    path = "/api/ocr",
    tag = "ocr",
    operation_id = "ocr.extract",
    params(
        ("delay" = Option<String>, Query, description = "Artificial latency in milliseconds; ignored unless numeric"),
    ),
    request_body(content_type = "multipart/form-data", content = String, description = "Card image in the `image` field (image/*, at most 4 MiB)"),
    responses(
        (status = 200, description = "Extracted text", body = OcrResponse),
        (status = 400, description = "Missing, non-image or oversized file", body = OcrErrorResponse),
        (status = 500, description = "OCR not configured or provider failure", body = OcrErrorResponse),
    )
)]
pub async fn extract_text(
    State(state): State<AppState>,
    Delay(delay): Delay,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>> {
    if !state.ocr.is_available() {
        return Err(CardscanError::CredentialsMissing);
    }

    if let Some(delay) = delay {
        debug!(delay_ms = delay.as_millis() as u64, "Delaying OCR request");
        tokio::time::sleep(delay).await;
    }

    let mut multipart = multipart.map_err(|e| CardscanError::Multipart(e.body_text()))?;
    let image = read_image(&mut multipart).await?;

    let text = state.ocr.ocr(&image).await?;
    info!(
        bytes = image.len(),
        chars = text.chars().count(),
        "OCR request completed"
    );

    Ok(Json(OcrResponse { text }))
}

/// `GET /api/ocr`
///
/// Reports whether the OCR provider was configured at startup.
#[utoipa::path(
    get,
    path = "/api/ocr",
    tag = "ocr",
    operation_id = "ocr.status",
    responses(
        (status = 200, description = "OCR is configured", body = OcrStatusResponse),
        (status = 500, description = "OCR is not configured", body = OcrStatusResponse),
    )
)]
pub async fn ocr_status(State(state): State<AppState>) -> (StatusCode, Json<OcrStatusResponse>) {
    if state.ocr.is_available() {
        (
            StatusCode::OK,
            Json(OcrStatusResponse {
                message: "OCR API is working.".to_string(),
            }),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(OcrStatusResponse {
                message: "OCR API is not configured.".to_string(),
            }),
        )
    }
}

/// Find the first `image` field, check its declared type and read it with
/// the size cap applied while streaming.
async fn read_image(multipart: &mut Multipart) -> Result<Vec<u8>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let is_image = field
            .content_type()
            .map(|ct| ct.to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            return Err(CardscanError::InvalidType);
        }

        return read_capped(field).await;
    }

    Err(CardscanError::MissingFile)
}

async fn read_capped(mut field: Field<'_>) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if bytes.len() + chunk.len() > MAX_FILE_SIZE {
            return Err(CardscanError::TooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// The body limit can trip while reading field headers or field data; both
/// count as an oversized upload.
fn multipart_error(e: MultipartError) -> CardscanError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        CardscanError::TooLarge
    } else {
        CardscanError::Multipart(e.body_text())
    }
}
