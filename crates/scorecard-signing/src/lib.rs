//! Transparency-log lookup and cryptographic verification for submitted
//! scorecard reports: entry resolution, RFC 6962 inclusion proofs, signed
//! entry timestamps, and the signing-certificate chain with its provenance
//! claims.

pub mod certs;
pub mod inclusion;
pub mod keys;
pub mod merkle;
pub mod set;
pub mod tlog;

use thiserror::Error;

pub use certs::{CertError, CertInfo, CertificateVerifier, certificates_from_pem, extract_cert_info};
pub use inclusion::verify_log_entry;
pub use keys::{TrustError, TrustMaterial};
pub use tlog::{HashedRecord, LogEntry, TlogClient, TlogError};

/// Failure modes of entry-level proof verification.
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("log entry carries no inclusion proof")]
    MissingProof,
    #[error("inclusion proof is malformed: {0}")]
    Malformed(String),
    #[error("inclusion proof does not reproduce the signed root hash")]
    InclusionFailed,
    #[error("signed entry timestamp verification failed")]
    SetVerifyFailed,
}
