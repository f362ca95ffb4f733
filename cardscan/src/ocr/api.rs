use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::{CardscanError, Result};

use super::credentials::ServiceAccountCredentials;
use super::provider::TextDetector;

const VISION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-vision";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before Google says they expire.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Google Cloud Vision `images:annotate` client authenticated with a
/// service account.
#[derive(Clone)]
pub struct VisionClient {
    client: Client,
    credentials: ServiceAccountCredentials,
    signing_key: EncodingKey,
    base_url: String,
    token_url: String,
    token: Arc<RwLock<Option<AccessToken>>>,
}

#[derive(Clone, Debug)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    assertion: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    error: Option<RpcStatus>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

impl VisionClient {
    pub fn new(config: &OcrConfig, credentials: ServiceAccountCredentials) -> Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|e| CardscanError::Credentials(format!("invalid private key: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CardscanError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
            signing_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token_url: config.token_url.clone(),
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.credentials.project_id
    }

    async fn access_token(&self) -> Result<String> {
        let now = Utc::now();
        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_fresh(now) {
                return Ok(token.value.clone());
            }
        }

        let mut slot = self.token.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(token) = slot.as_ref() {
            if token.is_fresh(now) {
                return Ok(token.value.clone());
            }
        }

        let token = self.exchange_assertion(now).await?;
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    async fn exchange_assertion(&self, now: DateTime<Utc>) -> Result<AccessToken> {
        let claims = AssertionClaims {
            iss: &self.credentials.client_email,
            scope: VISION_SCOPE,
            aud: &self.token_url,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| CardscanError::Token(format!("failed to sign assertion: {e}")))?;

        let resp = self
            .client
            .post(&self.token_url)
            .form(&TokenRequest {
                grant_type: JWT_BEARER_GRANT,
                assertion: &assertion,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CardscanError::Token(format!(
                "token endpoint returned {status} - {body}"
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| CardscanError::Token(format!("Failed to parse token response: {e}")))?;

        debug!(
            expires_in = ?token.expires_in,
            "Obtained Vision access token"
        );

        Ok(AccessToken {
            value: token.access_token,
            expires_at: now
                + ChronoDuration::seconds(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS)),
        })
    }
}

#[async_trait]
impl TextDetector for VisionClient {
    async fn detect_text(&self, image_bytes: &[u8]) -> Result<Option<String>> {
        let token = self.access_token().await?;

        let request = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image_bytes),
                },
                features: vec![Feature {
                    kind: "TEXT_DETECTION",
                }],
            }],
        };

        let resp = self
            .client
            .post(format!("{}/v1/images:annotate", self.base_url))
            .bearer_auth(token)
            .header("x-goog-user-project", &self.credentials.project_id)
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CardscanError::Vision(format!(
                "API request failed: {status} - {body}"
            )));
        }

        let annotate: AnnotateResponse = resp
            .json()
            .await
            .map_err(|e| CardscanError::Vision(format!("Failed to parse response: {e}")))?;

        let Some(first) = annotate.responses.into_iter().next() else {
            return Ok(None);
        };

        if let Some(status) = first.error {
            return Err(CardscanError::Vision(format!(
                "annotate error {}: {}",
                status.code, status.message
            )));
        }

        Ok(first
            .text_annotations
            .into_iter()
            .next()
            .and_then(|a| a.description)
            .filter(|d| !d.is_empty()))
    }
}
