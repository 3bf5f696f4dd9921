//! Identity tokens for authenticated users
//!
//! Tokens are HS256 JWTs: `base64url(header).base64url(claims).base64url(mac)`.
//! They are bound to one username and expire after a fixed lifetime.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use crate::crypto::SigningKey;
use crate::error::{AuthError, Result};

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Longest accepted token lifetime: 10 years
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Claims carried by an identity token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expires at (Unix timestamp)
    pub exp: i64,
    /// Token ID for logging
    pub jti: String,
}

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

/// A freshly issued token
#[derive(Debug, Clone, Serialize)]
pub struct IdentityToken {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates identity tokens
pub struct TokenIssuer {
    key: SigningKey,
    ttl_secs: i64,
}

impl TokenIssuer {
    /// Default token lifetime: 1 hour
    pub const DEFAULT_TTL_SECS: u64 = 60 * 60;

    pub fn new(key: SigningKey, ttl_secs: Option<u64>) -> Self {
        let ttl_secs = ttl_secs.unwrap_or(Self::DEFAULT_TTL_SECS).min(MAX_TTL_SECS);
        Self {
            key,
            ttl_secs: ttl_secs as i64,
        }
    }

    /// Issue a token for a verified username
    pub fn issue(&self, username: &str) -> Result<IdentityToken> {
        self.issue_at(username, Utc::now())
    }

    fn issue_at(&self, username: &str, now: DateTime<Utc>) -> Result<IdentityToken> {
        let expires_at = now + Duration::seconds(self.ttl_secs);
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&signing_input)?.finalize().into_bytes());

        debug!("Issued token {} expiring at {}", claims.jti, expires_at);

        Ok(IdentityToken {
            token: format!("{}.{}", signing_input, signature),
            username: claims.sub,
            expires_at,
        })
    }

    /// Check signature and expiry, returning the claims
    pub fn validate(&self, token: &str) -> Result<Claims> {
        self.validate_at(token, Utc::now())
    }

    fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::InvalidToken("expected three segments".to_string()));
        };

        let signature = decode_segment(signature)?;
        self.mac(&format!("{}.{}", header, payload))?
            .verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken("bad signature".to_string()))?;

        let header: Header = serde_json::from_slice(&decode_segment(header)?)
            .map_err(|e| AuthError::InvalidToken(format!("bad header: {}", e)))?;
        if header.alg != "HS256" {
            return Err(AuthError::InvalidToken(format!("unsupported alg {}", header.alg)));
        }

        let claims: Claims = serde_json::from_slice(&decode_segment(payload)?)
            .map_err(|e| AuthError::InvalidToken(format!("bad claims: {}", e)))?;

        if now.timestamp() >= claims.exp {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }

    fn mac(&self, signing_input: &str) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.key.as_bytes())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        mac.update(signing_input.as_bytes());
        Ok(mac)
    }
}

fn decode_segment(segment: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::InvalidToken(format!("bad encoding: {}", e)))
}
