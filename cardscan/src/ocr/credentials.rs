use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;

use crate::error::{CardscanError, Result};

/// The subset of a Google service-account key file the Vision client needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    pub project_id: String,
}

impl std::fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl ServiceAccountCredentials {
    /// Decode the base64 JSON blob carried in `GOOGLE_CLOUD_KEY`.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CardscanError::Credentials(format!("not valid base64: {e}")))?;
        let creds: Self = serde_json::from_slice(&raw)
            .map_err(|e| CardscanError::Credentials(format!("not a service-account key: {e}")))?;

        if creds.client_email.is_empty() || creds.private_key.is_empty() {
            return Err(CardscanError::Credentials(
                "client_email and private_key must be set".to_string(),
            ));
        }

        Ok(creds)
    }
}
