//! Session token verification.
//!
//! Session tokens are JWTs issued by the identity provider. They are read from
//! the session cookie first and the `Authorization: Bearer` header second.

use axum::http::{header, HeaderMap};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AuthConfig;

use super::Principal;

/// JWT session claims
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // Subject (user ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>, // Session ID
    pub exp: i64, // Expiration time
    #[serde(default)]
    pub iat: i64, // Issued at
}

impl From<SessionClaims> for Principal {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.sub,
            session_id: claims.sid,
        }
    }
}

#[derive(Clone)]
struct VerificationKey {
    key: DecodingKey,
    algorithm: Algorithm,
}

#[derive(Clone)]
pub struct SessionVerifier {
    key: Option<VerificationKey>,
    cookie_name: String,
}

impl SessionVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let key = if let Some(pem) = &config.jwt_public_key {
            match DecodingKey::from_rsa_pem(pem.as_bytes()) {
                Ok(key) => {
                    info!("Session tokens verified with RS256 public key");
                    Some(VerificationKey {
                        key,
                        algorithm: Algorithm::RS256,
                    })
                }
                Err(e) => {
                    warn!("AUTH_JWT_PUBLIC_KEY is not a valid RSA PEM key: {}", e);
                    None
                }
            }
        } else {
            config.jwt_secret.as_ref().map(|secret| {
                info!("Session tokens verified with HS256 shared secret");
                VerificationKey {
                    key: DecodingKey::from_secret(secret.as_bytes()),
                    algorithm: Algorithm::HS256,
                }
            })
        };

        Self {
            key,
            cookie_name: config.session_cookie.clone(),
        }
    }

    /// A verifier with no key treats every request as signed out.
    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    pub fn verify(&self, token: &str) -> Option<Principal> {
        let verification = self.key.as_ref()?;
        let validation = Validation::new(verification.algorithm);

        match decode::<SessionClaims>(token, &verification.key, &validation) {
            Ok(data) => Some(data.claims.into()),
            Err(e) => {
                debug!(error = %e, "Rejected session token");
                None
            }
        }
    }

    /// Resolve the signed-in principal for a request, if any.
    pub fn authenticate(&self, headers: &HeaderMap) -> Option<Principal> {
        if !self.is_enabled() {
            return None;
        }

        let jar = CookieJar::from_headers(headers);
        if let Some(cookie) = jar.get(&self.cookie_name) {
            if let Some(principal) = self.verify(cookie.value()) {
                return Some(principal);
            }
        }

        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))?;

        self.verify(bearer.trim())
    }
}
