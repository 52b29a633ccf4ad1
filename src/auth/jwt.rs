//! Decode-only inspection of bearer tokens.
//!
//! The payload segment is decoded without verifying the signature; the
//! server remains the source of truth via the validate endpoint. Malformed
//! tokens are never surfaced as errors, only folded into "expired".

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use crate::auth::types::{now_ms, now_secs};

/// Claims carried in the access token payload
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub email: Option<String>,
    /// Expiry, seconds since the Unix epoch
    pub exp: Option<i64>,
    pub iat: Option<i64>,
}

/// Decode the payload segment of a token without verifying its signature.
///
/// Returns `None` on any malformation: wrong segment count, invalid
/// base64url, or invalid JSON.
pub fn decode(token: &str) -> Option<Claims> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Check whether the token is expired, with a safety buffer in minutes.
///
/// Undecodable tokens and tokens without an `exp` claim count as expired.
pub fn is_expired(token: &str, buffer_minutes: i64) -> bool {
    expired_at(decode(token).and_then(|c| c.exp), now_secs(), buffer_minutes)
}

/// Check whether the token should be refreshed proactively. Identical
/// comparison to [`is_expired`] with the refresh buffer.
pub fn needs_refresh(token: &str, refresh_minutes: i64) -> bool {
    is_expired(token, refresh_minutes)
}

/// Milliseconds until the token truly expires; 0 for undecodable tokens
/// or tokens already past expiry.
pub fn time_until_expiry_ms(token: &str) -> i64 {
    match decode(token).and_then(|c| c.exp) {
        Some(exp) => (exp * 1000 - now_ms()).max(0),
        None => 0,
    }
}

fn expired_at(exp: Option<i64>, now_secs: i64, buffer_minutes: i64) -> bool {
    match exp {
        Some(exp) => exp <= now_secs + buffer_minutes * 60,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Build an unsigned token with the given payload claims
    pub(crate) fn make_token(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        format!("{}.{}.sig", header, payload)
    }

    #[test]
    fn decodes_payload_claims() {
        let token = make_token(json!({"sub": "u1", "email": "a@b.c", "exp": 1000, "iat": 1}));
        let claims = decode(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("u1"));
        assert_eq!(claims.email.as_deref(), Some("a@b.c"));
        assert_eq!(claims.exp, Some(1000));
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(decode("").is_none());
        assert!(decode("only-one-segment").is_none());
        assert!(decode("a.b").is_none());
        assert!(decode("a.b.c.d").is_none());
        assert!(decode("head.!!!not-base64!!!.sig").is_none());

        let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode(b"not json"));
        assert!(decode(&not_json).is_none());
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let now = 1_000_000;
        // exp exactly at now + buffer is expired
        assert!(expired_at(Some(now + 5 * 60), now, 5));
        // one second past the buffer is not
        assert!(!expired_at(Some(now + 5 * 60 + 1), now, 5));
        // missing exp counts as expired
        assert!(expired_at(None, now, 5));
    }

    #[test]
    fn undecodable_token_counts_as_expired() {
        assert!(is_expired("garbage", 0));
        assert!(needs_refresh("garbage", 5));
        assert_eq!(time_until_expiry_ms("garbage"), 0);
    }

    #[test]
    fn fresh_token_is_not_expired() {
        let token = make_token(json!({"exp": now_secs() + 3600}));
        assert!(!is_expired(&token, 5));
        assert!(!needs_refresh(&token, 5));
        assert!(time_until_expiry_ms(&token) > 3_500_000);
    }

    #[test]
    fn near_expiry_token_needs_refresh() {
        let token = make_token(json!({"exp": now_secs() + 60}));
        assert!(needs_refresh(&token, 5));
        assert!(!is_expired(&token, 0));
    }

    #[test]
    fn time_until_expiry_clamps_to_zero() {
        let token = make_token(json!({"exp": now_secs() - 100}));
        assert_eq!(time_until_expiry_ms(&token), 0);
    }
}
