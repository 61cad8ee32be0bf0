//! LINE webhook signature verification.
//!
//! LINE signs each webhook body with HMAC-SHA256 keyed by the channel
//! secret and sends the base64 digest in `X-Line-Signature`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// No signature header on the request.
    Missing,
    /// Header present but not valid base64, or the key was rejected.
    Malformed,
    /// Well-formed signature that does not match the body.
    Mismatch,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureError::Missing => write!(f, "Missing signature"),
            SignatureError::Malformed => write!(f, "Malformed signature"),
            SignatureError::Mismatch => write!(f, "Invalid signature"),
        }
    }
}

impl std::error::Error for SignatureError {}

fn mac_for(channel_secret: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes())
        .map_err(|_| SignatureError::Malformed)?;
    mac.update(body);
    Ok(mac)
}

/// Computes the base64 signature LINE would send for `body`.
pub fn sign(channel_secret: &str, body: &[u8]) -> Result<String, SignatureError> {
    let mac = mac_for(channel_secret, body)?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Checks `signature` against `body` in constant time.
pub fn verify_signature(
    channel_secret: &str,
    body: &[u8],
    signature: &str,
) -> Result<(), SignatureError> {
    let expected = STANDARD
        .decode(signature.trim())
        .map_err(|_| SignatureError::Malformed)?;
    mac_for(channel_secret, body)?
        .verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_matches_rfc4231_vector() {
        // RFC 4231 test case 2, base64 encoded.
        let signature = sign("Jefe", b"what do ya want for nothing?").expect("any key length");
        assert_eq!(signature, "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM=");
    }

    #[test]
    fn test_verify_accepts_matching_signature() {
        let body = br#"{"events":[]}"#;
        assert_eq!(
            verify_signature(
                "test-channel-secret",
                body,
                "sKRrt+MTE71nWWZPaYrvYSdH9JGlgckmBidZxDuPgPc="
            ),
            Ok(())
        );
    }

    #[test]
    fn test_verify_rejects_tampered_body() {
        let signature = sign("test-channel-secret", br#"{"events":[]}"#).expect("sign");
        assert_eq!(
            verify_signature("test-channel-secret", br#"{"events":[{}]}"#, &signature),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let signature = sign("other-secret", b"body").expect("sign");
        assert_eq!(
            verify_signature("test-channel-secret", b"body", &signature),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_verify_rejects_non_base64_header() {
        assert_eq!(
            verify_signature("test-channel-secret", b"body", "not base64!!"),
            Err(SignatureError::Malformed)
        );
    }
}
