use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Public message for every failure that happens after validation.
pub const PROCESSING_FAILED: &str = "OCR processing failed.";

#[derive(Error, Debug)]
pub enum CardscanError {
    #[error("No image file provided.")]
    MissingFile,

    #[error("Only image files are allowed.")]
    InvalidType,

    #[error("File size exceeds 4MB.")]
    TooLarge,

    #[error("Google Cloud credentials not found.")]
    CredentialsMissing,

    #[error("Invalid credentials: {0}")]
    Credentials(String),

    #[error("Multipart error: {0}")]
    Multipart(String),

    #[error("Vision API error: {0}")]
    Vision(String),

    #[error("Token exchange error: {0}")]
    Token(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl CardscanError {
    pub fn status(&self) -> StatusCode {
        match self {
            CardscanError::MissingFile | CardscanError::InvalidType | CardscanError::TooLarge => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to put on the wire. Provider and transport details are
    /// collapsed into [`PROCESSING_FAILED`].
    pub fn public_message(&self) -> String {
        match self {
            CardscanError::MissingFile
            | CardscanError::InvalidType
            | CardscanError::TooLarge
            | CardscanError::CredentialsMissing => self.to_string(),
            _ => PROCESSING_FAILED.to_string(),
        }
    }
}

impl IntoResponse for CardscanError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "OCR request failed");
        }

        let body = Json(json!({ "error": self.public_message() }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, CardscanError>;
