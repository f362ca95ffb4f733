use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::OcrConfig;
use crate::error::{CardscanError, Result};

use super::api::VisionClient;
use super::credentials::ServiceAccountCredentials;

/// Returned when the provider finds no text in the image.
pub const NO_TEXT_FOUND: &str = "No text found.";

/// Anything that can pull text out of image bytes.
///
/// `Ok(None)` means the provider answered but found no text.
#[async_trait]
pub trait TextDetector: Send + Sync {
    async fn detect_text(&self, image_bytes: &[u8]) -> Result<Option<String>>;
}

#[derive(Clone)]
enum OcrBackend {
    Vision { detector: Arc<dyn TextDetector> },
    Unavailable { reason: String },
}

/// Process-wide OCR entry point. Built once at startup and shared read-only.
#[derive(Clone)]
pub struct OcrProvider {
    backend: OcrBackend,
}

impl OcrProvider {
    pub fn new(config: &OcrConfig) -> Self {
        let Some(encoded) = config.credentials.as_deref() else {
            let reason =
                "GOOGLE_CLOUD_KEY is not set; /api/ocr answers 500 until it is configured"
                    .to_string();
            warn!("{}", reason);
            return Self::unavailable(reason);
        };

        let backend = match ServiceAccountCredentials::from_base64(encoded)
            .and_then(|creds| VisionClient::new(config, creds))
        {
            Ok(client) => {
                info!(project_id = %client.project_id(), "Google Cloud Vision backend initialized");
                OcrBackend::Vision {
                    detector: Arc::new(client),
                }
            }
            Err(e) => {
                let reason = format!("Google Cloud Vision backend unavailable: {e}");
                warn!("{}", reason);
                OcrBackend::Unavailable { reason }
            }
        };

        Self { backend }
    }

    pub fn with_detector(detector: Arc<dyn TextDetector>) -> Self {
        Self {
            backend: OcrBackend::Vision { detector },
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            backend: OcrBackend::Unavailable {
                reason: reason.into(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    pub async fn ocr(&self, image_bytes: &[u8]) -> Result<String> {
        match &self.backend {
            OcrBackend::Vision { detector } => Ok(detector
                .detect_text(image_bytes)
                .await?
                .unwrap_or_else(|| NO_TEXT_FOUND.to_string())),
            OcrBackend::Unavailable { reason } => {
                tracing::debug!(reason = %reason, "OCR requested while unavailable");
                Err(CardscanError::CredentialsMissing)
            }
        }
    }
}
