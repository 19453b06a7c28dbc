//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs signed with a shared secret. The `sub` claim is the
//! user ID, resolved to a tenant and role through the user directory.

use axum::http::{HeaderMap, header};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use workroom_config::AuthConfig;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("Authorization header must use the Bearer scheme")]
    MalformedHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// JWT claims accepted and issued by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

pub struct JwtAuthenticator {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
    issuer: Option<String>,
    audience: Option<String>,
    ttl_secs: u64,
    has_secret: bool,
}

impl JwtAuthenticator {
    pub fn new(
        secret: &str,
        issuer: Option<String>,
        audience: Option<String>,
        ttl_secs: u64,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(iss) = &issuer {
            validation.set_issuer(&[iss]);
        }
        match &audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer,
            audience,
            ttl_secs,
            has_secret: !secret.is_empty(),
        }
    }

    /// An authenticator for the configured secret. A missing secret yields
    /// one that rejects every token.
    pub fn from_config(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.clone().unwrap_or_default();
        Self::new(
            &secret,
            config.issuer.clone(),
            config.audience.clone(),
            config.token_ttl_secs,
        )
    }

    /// Verify the bearer token in `headers` and return its subject.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<String, AuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingCredentials)?
            .to_str()
            .map_err(|_| AuthError::MalformedHeader)?;

        let token = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MalformedHeader)?;

        Ok(self.verify(token)?.sub)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        if !self.has_secret {
            return Err(AuthError::InvalidToken("no signing secret configured".into()));
        }
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if data.claims.sub.is_empty() {
            return Err(AuthError::InvalidToken("empty subject".into()));
        }
        Ok(data.claims)
    }

    /// Mint a token for `subject`, valid for the configured lifetime.
    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        if !self.has_secret {
            return Err(AuthError::Signing("no signing secret configured".into()));
        }
        let now = Utc::now().timestamp().max(0) as usize;
        let claims = Claims {
            sub: subject.to_string(),
            exp: now + self.ttl_secs as usize,
            iat: now,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}
