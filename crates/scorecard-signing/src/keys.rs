//! Trust material compiled into the binary.
//!
//! The certificate-authority root and intermediate and the transparency
//! log's public key load once at process start. A deployment can point the
//! `SCORECARD_FULCIO_ROOT`, `SCORECARD_FULCIO_INTERMEDIATE`, and
//! `SCORECARD_TLOG_KEY` variables at replacement PEM files; malformed
//! material is a fatal startup error either way.

use p256::ecdsa::VerifyingKey;
use p256::pkcs8::DecodePublicKey;
use thiserror::Error;

use crate::certs::{CertError, CertificateVerifier};

pub const FULCIO_ROOT_PEM: &[u8] = include_bytes!("../certs/fulcio_v1.crt.pem");
pub const FULCIO_INTERMEDIATE_PEM: &[u8] = include_bytes!("../certs/fulcio_intermediate.crt.pem");
pub const TLOG_PUBLIC_KEY_PEM: &[u8] = include_bytes!("../certs/tlog.pub.pem");

#[derive(Debug, Error)]
pub enum TrustError {
    #[error("trusted certificate bundle is malformed")]
    Certificates(#[from] CertError),
    #[error("transparency-log public key is malformed")]
    LogKey,
}

/// Everything the verification pipeline trusts, parsed once and shared
/// read-only across requests.
#[derive(Debug)]
pub struct TrustMaterial {
    pub certificates: CertificateVerifier,
    pub log_key: VerifyingKey,
}

impl TrustMaterial {
    pub fn embedded() -> Result<Self, TrustError> {
        Self::from_pem(FULCIO_ROOT_PEM, FULCIO_INTERMEDIATE_PEM, TLOG_PUBLIC_KEY_PEM)
    }

    pub fn from_pem(
        root_pem: &[u8],
        intermediate_pem: &[u8],
        log_key_pem: &[u8],
    ) -> Result<Self, TrustError> {
        let certificates = CertificateVerifier::from_pem(root_pem, intermediate_pem)?;
        let pem = std::str::from_utf8(log_key_pem).map_err(|_| TrustError::LogKey)?;
        let log_key = VerifyingKey::from_public_key_pem(pem).map_err(|_| TrustError::LogKey)?;
        Ok(Self {
            certificates,
            log_key,
        })
    }
}
