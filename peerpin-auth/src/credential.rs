//! PEM credential parsing.
//!
//! Callers read the files; this module only decodes the bytes so that the
//! same rules apply to the accepting and the connecting role.

use rustls_pki_types::pem::{self, PemObject};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use thiserror::Error;

/// Errors that can occur while decoding PEM credentials.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CredentialError {
    #[error("invalid PEM: {0}")]
    Pem(#[from] pem::Error),

    #[error("no CERTIFICATE block found")]
    NoCertificate,

    #[error("expected exactly one certificate, found {0}")]
    NotSingleCertificate(usize),
}

/// Decode every `CERTIFICATE` block in a PEM document, in order.
///
/// # Errors
///
/// Returns `CredentialError::NoCertificate` if the document holds none.
pub fn parse_certificates_pem(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, CredentialError> {
    let certs = CertificateDer::pem_slice_iter(pem).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(CredentialError::NoCertificate);
    }
    Ok(certs)
}

/// Decode a PEM document that must hold exactly one certificate.
///
/// # Errors
///
/// Returns `CredentialError::NotSingleCertificate` for bundles.
pub fn parse_single_certificate_pem(pem: &[u8]) -> Result<CertificateDer<'static>, CredentialError> {
    let mut certs = parse_certificates_pem(pem)?;
    if certs.len() != 1 {
        return Err(CredentialError::NotSingleCertificate(certs.len()));
    }
    Ok(certs.remove(0))
}

/// Decode the first private key (PKCS#8, PKCS#1 or SEC1) in a PEM document.
pub fn parse_private_key_pem(pem: &[u8]) -> Result<PrivateKeyDer<'static>, CredentialError> {
    Ok(PrivateKeyDer::from_pem_slice(pem)?)
}
