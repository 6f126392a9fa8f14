//! Certificate chain verification and provenance extraction.
//!
//! Entries embed a short-lived signing certificate whose custom OID
//! extensions record the repository, branch ref, and commit SHA of the
//! workflow run that obtained it, and whose SAN URI names the workflow file
//! itself. The chain must verify against the embedded root and intermediate
//! pools, the key must be usable for code signing, and the certificate must
//! have been valid at the instant the entry was integrated into the log.

use thiserror::Error;
use x509_parser::pem::Pem;
use x509_parser::prelude::{FromDer, GeneralName, X509Certificate};

pub const OID_REPO_SHA: &str = "1.3.6.1.4.1.57264.1.3";
pub const OID_REPO_FULL_NAME: &str = "1.3.6.1.4.1.57264.1.5";
pub const OID_REPO_BRANCH_REF: &str = "1.3.6.1.4.1.57264.1.6";

#[derive(Debug, Error)]
pub enum CertError {
    #[error("no certificates found for the entry")]
    NoCertificates,
    #[error("multiple certificates found for the entry")]
    MultipleCertificates,
    #[error("error during PEM decoding")]
    Pem,
    #[error("error during certificate parsing")]
    Parse,
    #[error("certificate does not chain to the trusted roots")]
    ChainVerification,
    #[error("certificate is not valid for code signing")]
    KeyUsage,
    #[error("certificate expired before signatures were entered in the log")]
    Expired,
    #[error("certificate was issued after signatures were entered in the log")]
    NotYetValid,
    #[error("cert has empty repository ref")]
    EmptyRef,
    #[error("cert has empty repository path")]
    EmptyPath,
    #[error("certificate has no URIs")]
    MissingUri,
    #[error("cert workflow path is empty")]
    EmptyWorkflowPath,
    #[error("cert workflow path is malformed")]
    MalformedWorkflowPath,
}

/// Provenance claims extracted from the signing certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertInfo {
    pub repo_full_name: String,
    pub repo_branch_ref: String,
    pub repo_sha: String,
    pub workflow_path: String,
    pub workflow_ref: String,
}

/// Split a PEM bundle into DER certificates.
pub fn certificates_from_pem(bundle: &[u8]) -> Result<Vec<Vec<u8>>, CertError> {
    let mut certificates = Vec::new();
    for pem in Pem::iter_from_buffer(bundle) {
        let pem = pem.map_err(|_| CertError::Pem)?;
        if pem.label != "CERTIFICATE" {
            continue;
        }
        certificates.push(pem.contents);
    }
    if certificates.is_empty() {
        return Err(CertError::NoCertificates);
    }
    Ok(certificates)
}

/// Immutable verification pools loaded at process start.
#[derive(Debug)]
pub struct CertificateVerifier {
    roots: Vec<Vec<u8>>,
    intermediates: Vec<Vec<u8>>,
}

impl CertificateVerifier {
    pub fn from_pem(root_pem: &[u8], intermediate_pem: &[u8]) -> Result<Self, CertError> {
        let roots = certificates_from_pem(root_pem)?;
        let intermediates = certificates_from_pem(intermediate_pem)?;
        // Reject bundles that do not even parse, so a bad deployment fails
        // at startup instead of on the first submission.
        for der in roots.iter().chain(&intermediates) {
            X509Certificate::from_der(der).map_err(|_| CertError::Parse)?;
        }
        Ok(Self {
            roots,
            intermediates,
        })
    }

    /// Verify the leaf chains to a trusted root, is a code-signing
    /// certificate, and was valid when the log integrated the entry.
    pub fn verify(&self, leaf_der: &[u8], integrated_time: i64) -> Result<(), CertError> {
        let (_, leaf) = X509Certificate::from_der(leaf_der).map_err(|_| CertError::Parse)?;

        let code_signing = leaf
            .extended_key_usage()
            .map_err(|_| CertError::Parse)?
            .is_some_and(|eku| eku.value.code_signing || eku.value.any);
        if !code_signing {
            return Err(CertError::KeyUsage);
        }

        // Chain certificates are checked for validity at the leaf's own
        // notBefore, matching how the original service pinned CurrentTime.
        let reference_time = leaf.validity().not_before.timestamp();
        if !self.chains_to_root(&leaf, reference_time) {
            return Err(CertError::ChainVerification);
        }

        if leaf.validity().not_after.timestamp() < integrated_time {
            return Err(CertError::Expired);
        }
        if leaf.validity().not_before.timestamp() > integrated_time {
            return Err(CertError::NotYetValid);
        }
        Ok(())
    }

    fn chains_to_root(&self, leaf: &X509Certificate<'_>, at: i64) -> bool {
        for issuer_der in &self.intermediates {
            let Ok((_, issuer)) = X509Certificate::from_der(issuer_der) else {
                continue;
            };
            if !issued_by(leaf, &issuer, at) {
                continue;
            }
            for root_der in &self.roots {
                let Ok((_, root)) = X509Certificate::from_der(root_der) else {
                    continue;
                };
                if issued_by(&issuer, &root, at) {
                    return true;
                }
            }
        }
        // Accept a leaf issued directly by a trusted root.
        self.roots.iter().any(|root_der| {
            X509Certificate::from_der(root_der)
                .map(|(_, root)| issued_by(leaf, &root, at))
                .unwrap_or(false)
        })
    }
}

fn issued_by(cert: &X509Certificate<'_>, issuer: &X509Certificate<'_>, at: i64) -> bool {
    cert.issuer().as_raw() == issuer.subject().as_raw()
        && issuer.validity().not_before.timestamp() <= at
        && at <= issuer.validity().not_after.timestamp()
        && cert.verify_signature(Some(issuer.public_key())).is_ok()
}

/// Extract the provenance claims from the leaf certificate.
pub fn extract_cert_info(leaf_der: &[u8]) -> Result<CertInfo, CertError> {
    let (_, leaf) = X509Certificate::from_der(leaf_der).map_err(|_| CertError::Parse)?;

    let mut repo_full_name = String::new();
    let mut repo_branch_ref = String::new();
    let mut repo_sha = String::new();
    for ext in leaf.extensions() {
        let oid = ext.oid.to_id_string();
        match oid.as_str() {
            OID_REPO_BRANCH_REF => {
                if ext.value.is_empty() {
                    return Err(CertError::EmptyRef);
                }
                repo_branch_ref = String::from_utf8_lossy(ext.value).into_owned();
            }
            OID_REPO_FULL_NAME => {
                if ext.value.is_empty() {
                    return Err(CertError::EmptyPath);
                }
                repo_full_name = String::from_utf8_lossy(ext.value).into_owned();
            }
            OID_REPO_SHA => {
                repo_sha = String::from_utf8_lossy(ext.value).into_owned();
            }
            _ => {}
        }
    }
    if repo_branch_ref.is_empty() {
        return Err(CertError::EmptyRef);
    }
    if repo_full_name.is_empty() {
        return Err(CertError::EmptyPath);
    }

    let uri = first_san_uri(&leaf)?.ok_or(CertError::MissingUri)?;
    let path = uri_path(&uri);
    if path.is_empty() {
        return Err(CertError::EmptyWorkflowPath);
    }

    // Path shape: /{org}/{repo}/{workflow file}@{ref}. The org/repo prefix
    // stays in workflow_path; it names the repository hosting the workflow
    // file, which differs from repo_full_name for reusable workflows.
    let trimmed = path.trim_start_matches('/');
    let (workflow_path, workflow_ref) = match trimmed.split_once('@') {
        Some((path, reference)) => (path, reference),
        None => (trimmed, ""),
    };
    if workflow_path.is_empty() {
        return Err(CertError::EmptyWorkflowPath);
    }

    Ok(CertInfo {
        repo_full_name,
        repo_branch_ref,
        repo_sha,
        workflow_path: workflow_path.to_string(),
        workflow_ref: workflow_ref.to_string(),
    })
}

fn first_san_uri(leaf: &X509Certificate<'_>) -> Result<Option<String>, CertError> {
    let san = leaf
        .subject_alternative_name()
        .map_err(|_| CertError::Parse)?;
    let Some(san) = san else {
        return Ok(None);
    };
    for name in &san.value.general_names {
        if let GeneralName::URI(uri) = name {
            return Ok(Some((*uri).to_string()));
        }
    }
    Ok(None)
}

/// The path component of a SAN URI. Falls back to manual splitting for
/// URIs the `url` crate refuses (it requires a known scheme layout).
fn uri_path(uri: &str) -> String {
    if let Ok(parsed) = url::Url::parse(uri)
        && parsed.has_host()
    {
        return parsed.path().to_string();
    }
    match uri.split_once("://") {
        Some((_, rest)) => match rest.split_once('/') {
            Some((_, path)) => format!("/{path}"),
            None => String::new(),
        },
        None => String::new(),
    }
}
