//! Signed approval-token codec.
//!
//! A token is the only representation of a pending registration: there is no
//! backing store. The payload travels inside the token itself, bound to the
//! action (approve/deny) it was minted for and to an expiry timestamp, and
//! authenticated with HMAC-SHA256.
//!
//! Wire format:
//! `base64url( base64url(json({data, action})) + "." + hex(hmac(secret, inner_b64)) )`
//!
//! The outer encoding keeps the token a single opaque query-string value with
//! no `.` visible to URL handling.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// How long an approval link stays valid.
pub const VALIDITY_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Approve,
    Deny,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Approve => write!(f, "approve"),
            Action::Deny => write!(f, "deny"),
        }
    }
}

/// The registration request as captured at submission time. Embedded verbatim
/// in both tokens minted for one registration and never stored anywhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationPayload {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub submitted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RegistrationPayload {
    pub fn new(
        username: String,
        email: String,
        first_name: String,
        last_name: String,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            username,
            email,
            first_name,
            last_name,
            submitted_at,
            expires_at: submitted_at + Duration::days(VALIDITY_DAYS),
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("token action does not match this link")]
    InvalidAction,

    #[error("token expired")]
    Expired,
}

/// Inner canonical form. Field order is fixed by the struct, so the same
/// payload/action pair always serializes to the same bytes.
#[derive(Serialize, Deserialize)]
struct Envelope {
    data: RegistrationPayload,
    action: Action,
}

/// Encodes and verifies signed tokens with an explicitly injected secret.
#[derive(Clone)]
pub struct TokenCodec {
    secret: String,
}

impl TokenCodec {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn encode(
        &self,
        payload: &RegistrationPayload,
        action: Action,
    ) -> Result<String, anyhow::Error> {
        let envelope = Envelope {
            data: payload.clone(),
            action,
        };
        let canonical = serde_json::to_string(&envelope)
            .map_err(|e| anyhow::anyhow!("Failed to serialize token payload: {}", e))?;

        let payload_b64 = URL_SAFE.encode(canonical.as_bytes());
        let signature = self.sign(&payload_b64)?;

        Ok(URL_SAFE.encode(format!("{}.{}", payload_b64, signature)))
    }

    /// Verify and unpack a token. Checks run strictly in the order
    /// malformed → signature → action → expiry, so nothing inside a forged
    /// token is trusted before its signature has been verified.
    pub fn decode(
        &self,
        token: &str,
        expected_action: Action,
    ) -> Result<RegistrationPayload, TokenError> {
        let decoded = URL_SAFE.decode(token).map_err(|_| TokenError::Malformed)?;
        let decoded = String::from_utf8(decoded).map_err(|_| TokenError::Malformed)?;

        let mut parts = decoded.split('.');
        let (payload_b64, signature) = match (parts.next(), parts.next(), parts.next()) {
            (Some(payload), Some(signature), None) => (payload, signature),
            _ => return Err(TokenError::Malformed),
        };

        let expected_signature = self
            .sign(payload_b64)
            .map_err(|_| TokenError::InvalidSignature)?;

        if expected_signature.len() != signature.len() {
            return Err(TokenError::InvalidSignature);
        }
        let matches: bool = expected_signature
            .as_bytes()
            .ct_eq(signature.as_bytes())
            .into();
        if !matches {
            return Err(TokenError::InvalidSignature);
        }

        let canonical = URL_SAFE
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let envelope: Envelope =
            serde_json::from_slice(&canonical).map_err(|_| TokenError::Malformed)?;

        if envelope.action != expected_action {
            return Err(TokenError::InvalidAction);
        }

        if Utc::now() > envelope.data.expires_at {
            return Err(TokenError::Expired);
        }

        Ok(envelope.data)
    }

    fn sign(&self, payload_b64: &str) -> Result<String, anyhow::Error> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
        mac.update(payload_b64.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}
