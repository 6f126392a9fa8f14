//! Signed Entry Timestamp verification.
//!
//! The log signs the JCS (RFC 8785) canonicalization of
//! `{body, integratedTime, logID, logIndex}` with its ECDSA P-256 key. A
//! generic JSON encoder must not be substituted here: key order and number
//! formatting are part of the signed bytes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use p256::ecdsa::signature::DigestVerifier;
use p256::ecdsa::{Signature, VerifyingKey};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::ProofError;

#[derive(Serialize)]
struct SetPayload<'a> {
    body: &'a str,
    #[serde(rename = "integratedTime")]
    integrated_time: i64,
    #[serde(rename = "logID")]
    log_id: &'a str,
    #[serde(rename = "logIndex")]
    log_index: i64,
}

/// The canonical bytes the log signed for this entry.
pub fn canonical_payload(
    body: &str,
    integrated_time: i64,
    log_id: &str,
    log_index: i64,
) -> Result<Vec<u8>, ProofError> {
    serde_jcs::to_vec(&SetPayload {
        body,
        integrated_time,
        log_id,
        log_index,
    })
    .map_err(|err| ProofError::Malformed(format!("canonicalizing entry payload: {err}")))
}

/// Verify the signed entry timestamp against the log public key.
pub fn verify_set(
    body: &str,
    integrated_time: i64,
    log_id: &str,
    log_index: i64,
    signed_entry_timestamp: &str,
    log_key: &VerifyingKey,
) -> Result<(), ProofError> {
    let signature_bytes = STANDARD
        .decode(signed_entry_timestamp.trim())
        .map_err(|_| ProofError::Malformed("signed entry timestamp is not base64".to_string()))?;
    let signature = parse_signature(&signature_bytes)?;

    let canonical = canonical_payload(body, integrated_time, log_id, log_index)?;
    let mut digest = Sha256::new();
    digest.update(&canonical);

    log_key
        .verify_digest(digest, &signature)
        .map_err(|_| ProofError::SetVerifyFailed)
}

/// The log emits ASN.1 DER signatures; accept the raw 64-byte form too.
fn parse_signature(bytes: &[u8]) -> Result<Signature, ProofError> {
    if let Ok(signature) = Signature::from_der(bytes) {
        return Ok(signature);
    }
    Signature::from_slice(bytes)
        .map_err(|_| ProofError::Malformed("signed entry timestamp is not an ECDSA signature".to_string()))
}
