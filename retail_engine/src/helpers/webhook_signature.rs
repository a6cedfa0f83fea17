//! # Payment webhook signatures
//!
//! The payment gateway signs every webhook delivery so that the server can reject forged or replayed callbacks before
//! touching any order. The signature travels in a header of the form
//!
//! ```text
//!    t=1718000000,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd
//! ```
//!
//! where
//!   * `t` is the unix timestamp (seconds) at which the gateway signed the payload,
//!   * `v1` is the hex-encoded `HMAC-SHA256(secret, "{t}.{raw body}")`. The gateway may send several `v1` entries while
//!     rolling its secret; a match on any of them is accepted.
//!
//! Other schemes (e.g. `v0`) are ignored. Signatures are compared in constant time, and deliveries whose timestamp is
//! further than the tolerance from the server clock are rejected.
use std::str::FromStr;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("The signature header is missing")]
    MissingHeader,
    #[error("The signature header is malformed: {0}")]
    MalformedHeader(String),
    #[error("The signature header does not contain a v1 signature")]
    NoSignature,
    #[error("The signature timestamp is outside the tolerance window")]
    TimestampOutOfTolerance,
    #[error("No signature matches the payload")]
    Mismatch,
    #[error("The signing secret cannot be used as an HMAC key")]
    InvalidSecret,
    #[error("No webhook signing secret is configured")]
    NoSecret,
}

/// A parsed signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSignature {
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

impl FromStr for WebhookSignature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(SignatureError::MissingHeader);
        }
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in s.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| SignatureError::MalformedHeader(format!("'{part}' is not a key=value pair")))?;
            match key {
                "t" => {
                    let t = value
                        .parse::<i64>()
                        .map_err(|_| SignatureError::MalformedHeader(format!("invalid timestamp '{value}'")))?;
                    timestamp = Some(t);
                },
                "v1" => {
                    let sig = hex::decode(value)
                        .map_err(|_| SignatureError::MalformedHeader("v1 signature is not valid hex".into()))?;
                    signatures.push(sig);
                },
                _ => {},
            }
        }
        let timestamp = timestamp.ok_or_else(|| SignatureError::MalformedHeader("missing timestamp".into()))?;
        if signatures.is_empty() {
            return Err(SignatureError::NoSignature);
        }
        Ok(Self { timestamp, signatures })
    }
}

impl WebhookSignature {
    /// Checks the signature against `payload` at time `now` (unix seconds). A `tolerance_secs` of zero disables the
    /// timestamp check.
    pub fn verify_at(&self, secret: &str, payload: &[u8], tolerance_secs: i64, now: i64) -> Result<(), SignatureError> {
        if secret.is_empty() {
            return Err(SignatureError::NoSecret);
        }
        if tolerance_secs > 0 && (now - self.timestamp).abs() > tolerance_secs {
            return Err(SignatureError::TimestampOutOfTolerance);
        }
        for sig in &self.signatures {
            let mac = signing_mac(secret, self.timestamp, payload)?;
            if mac.verify_slice(sig).is_ok() {
                return Ok(());
            }
        }
        Err(SignatureError::Mismatch)
    }

    pub fn verify(&self, secret: &str, payload: &[u8], tolerance_secs: i64) -> Result<(), SignatureError> {
        self.verify_at(secret, payload, tolerance_secs, Utc::now().timestamp())
    }

    /// Parses `header` and verifies it against `payload` using the current time.
    pub fn verify_header(
        header: &str,
        secret: &str,
        payload: &[u8],
        tolerance_secs: i64,
    ) -> Result<Self, SignatureError> {
        let signature = header.parse::<Self>()?;
        signature.verify(secret, payload, tolerance_secs)?;
        Ok(signature)
    }
}

fn signing_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    // HMAC accepts an empty key, which anyone can sign with
    if secret.is_empty() {
        return Err(SignatureError::NoSecret);
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Produces a signature header for `payload`, as the payment gateway would. Used by tests and tooling.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    let mac = signing_mac(secret, timestamp, payload)?;
    Ok(format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes())))
}
