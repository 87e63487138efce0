//! Bearer token payload decoding.
//!
//! Tokens are JWT-shaped (`header.payload.signature`). The client never
//! verifies the signature; it only reads the claims it needs to decide
//! whether a token is still worth sending. Every decode failure is treated
//! as an expired token by the callers in this crate.

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token must have 3 segments, found {0}")]
    SegmentCount(usize),

    #[error("Token payload is not valid base64url: {0}")]
    Base64(String),

    #[error("Token payload is not valid JSON: {0}")]
    Payload(String),

    #[error("Token expiration {0} is out of range")]
    ExpirationRange(String),
}

/// Payload as sent. Only `exp` is read; other claims are ignored whatever
/// their type.
#[derive(Deserialize)]
struct RawClaims {
    exp: serde_json::Number,
}

/// Claims the client relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Expiration in whole epoch seconds, fractional values floored.
    pub exp: i64,
    expires_at: DateTime<Utc>,
}

impl Claims {
    fn from_exp(exp: &serde_json::Number) -> Result<Self, TokenError> {
        let out_of_range = || TokenError::ExpirationRange(exp.to_string());
        let secs = match exp.as_i64() {
            Some(secs) => secs,
            None => {
                let secs = exp.as_f64().ok_or_else(out_of_range)?.floor();
                if !secs.is_finite() || secs < i64::MIN as f64 || secs >= i64::MAX as f64 {
                    return Err(out_of_range());
                }
                secs as i64
            }
        };
        let expires_at = DateTime::from_timestamp(secs, 0).ok_or_else(out_of_range)?;
        Ok(Self {
            exp: secs,
            expires_at,
        })
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// A token is valid only while `exp` is strictly in the future.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// Decode the payload segment of a token into its claims.
pub fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::SegmentCount(segments.len()));
    }

    let payload = segments[1];
    let bytes = if payload.ends_with('=') {
        URL_SAFE.decode(payload)
    } else {
        URL_SAFE_NO_PAD.decode(payload)
    }
    .map_err(|e| TokenError::Base64(e.to_string()))?;

    let raw: RawClaims =
        serde_json::from_slice(&bytes).map_err(|e| TokenError::Payload(e.to_string()))?;
    Claims::from_exp(&raw.exp)
}

/// Decode only the expiration instant of a token.
pub fn decode_expiration(token: &str) -> Result<DateTime<Utc>, TokenError> {
    Ok(decode_claims(token)?.expires_at())
}

/// Whether `token` should be considered expired at `now`.
/// Undecodable tokens are expired.
pub fn is_token_expired(token: &str, now: DateTime<Utc>) -> bool {
    match decode_claims(token) {
        Ok(claims) => claims.is_expired_at(now),
        Err(e) => {
            debug!(error = %e, "Treating undecodable token as expired");
            true
        }
    }
}

/// Build an unsigned token carrying the given claims. Useful for tests and
/// local tooling; the signature segment is a fixed placeholder.
pub fn encode_unsigned(exp: i64, sub: Option<i64>) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = match sub {
        Some(sub) => serde_json::json!({ "exp": exp, "sub": sub }),
        None => serde_json::json!({ "exp": exp }),
    };
    let payload = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, payload)
}
