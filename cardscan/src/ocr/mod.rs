//! OCR (Optical Character Recognition) Module
//!
//! Text extraction for uploaded insurance-card images. All recognition work
//! happens in Google Cloud Vision; this module only authenticates, ships the
//! bytes and reads back the first text annotation.
//!
//! # Architecture
//!
//! - `TextDetector` trait is the seam between the HTTP handler and the vendor
//! - `VisionClient` implements it against the `images:annotate` REST endpoint
//! - `OcrProvider` is the process-wide handle; it is `Unavailable` when no
//!   usable service-account key was found at startup
//!
//! # Configuration
//!
//! See `OcrConfig` in `config.rs`:
//! - `credentials`: base64 service-account JSON from `GOOGLE_CLOUD_KEY`
//! - `base_url` / `token_url`: overridable for proxies and tests
//! - `timeout_secs`: HTTP client timeout
//!
//! # Usage
//!
//! ```rust,ignore
//! let ocr = OcrProvider::new(&config.ocr);
//! let text = ocr.ocr(&image_bytes).await?;
//! ```

mod api;
mod credentials;
mod provider;

pub use api::VisionClient;
pub use credentials::ServiceAccountCredentials;
pub use provider::{OcrProvider, TextDetector, NO_TEXT_FOUND};
