//! Certificate utilities for X.509 parsing.
//!
//! # Security
//!
//! - Input is limited to 16KB to prevent DoS
//! - The x509_parser library handles ASN.1 parsing safely

use thiserror::Error;
use x509_parser::prelude::*;

use crate::identity::Fingerprint;

/// Maximum certificate size (16KB is generous for a single cert)
pub const MAX_CERT_SIZE: usize = 16 * 1024;

/// Errors that can occur during certificate parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CertError {
    #[error("certificate too large: {0} bytes (max {MAX_CERT_SIZE})")]
    TooLarge(usize),

    #[error("failed to parse X.509 certificate: {0}")]
    ParseError(String),

    #[error("certificate is not yet valid")]
    NotYetValid,

    #[error("certificate has expired")]
    Expired,
}

/// The parts of a presented certificate that authorization looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateIdentity {
    /// Subject common name, empty if the certificate has none.
    pub common_name: String,
    /// Fingerprint of the certificate's raw DER bytes.
    pub fingerprint: Fingerprint,
}

/// Parse a DER-encoded X.509 certificate and extract its identity.
///
/// The input must be exactly one certificate; the fingerprint covers all of
/// it.
///
/// # Errors
///
/// Returns `CertError::TooLarge` if certificate exceeds 16KB.
/// Returns `CertError::ParseError` if the certificate is malformed or
/// followed by trailing bytes.
pub fn inspect_certificate(cert_der: &[u8]) -> Result<CertificateIdentity, CertError> {
    let cert = parse(cert_der)?;

    let common_name = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap_or_default()
        .to_string();

    Ok(CertificateIdentity {
        common_name,
        fingerprint: Fingerprint::from_cert_der(cert_der),
    })
}

/// Check the certificate's validity period against `now` (Unix seconds).
///
/// # Errors
///
/// Returns `CertError::NotYetValid` or `CertError::Expired` outside the
/// period, and the parse errors of [`inspect_certificate`].
pub fn check_validity(cert_der: &[u8], now: u64) -> Result<(), CertError> {
    let cert = parse(cert_der)?;
    let validity = cert.validity();
    let now = i64::try_from(now).unwrap_or(i64::MAX);

    if now < validity.not_before.timestamp() {
        return Err(CertError::NotYetValid);
    }
    if now > validity.not_after.timestamp() {
        return Err(CertError::Expired);
    }
    Ok(())
}

fn parse(cert_der: &[u8]) -> Result<X509Certificate<'_>, CertError> {
    if cert_der.len() > MAX_CERT_SIZE {
        return Err(CertError::TooLarge(cert_der.len()));
    }

    let (rest, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| CertError::ParseError(format!("{:?}", e)))?;
    if !rest.is_empty() {
        return Err(CertError::ParseError(format!(
            "{} bytes of trailing data",
            rest.len()
        )));
    }
    Ok(cert)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};

    fn self_signed(common_name: Option<&str>) -> Vec<u8> {
        let key_pair = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        params.distinguished_name = DistinguishedName::new();
        if let Some(cn) = common_name {
            params.distinguished_name.push(DnType::CommonName, cn);
        }
        params.self_signed(&key_pair).unwrap().der().to_vec()
    }

    #[test]
    fn test_cert_too_large() {
        let large_data = vec![0u8; MAX_CERT_SIZE + 1];
        let result = inspect_certificate(&large_data);
        assert!(matches!(result, Err(CertError::TooLarge(_))));
    }

    #[test]
    fn test_invalid_cert() {
        let invalid_data = b"not a certificate";
        let result = inspect_certificate(invalid_data);
        assert!(matches!(result, Err(CertError::ParseError(_))));
    }

    #[test]
    fn test_extracts_common_name_and_fingerprint() {
        let der = self_signed(Some("my_secure_client"));

        let identity = inspect_certificate(&der).unwrap();

        assert_eq!(identity.common_name, "my_secure_client");
        assert_eq!(identity.fingerprint, Fingerprint::from_cert_der(&der));
    }

    #[test]
    fn test_missing_common_name_is_empty() {
        let der = self_signed(None);

        let identity = inspect_certificate(&der).unwrap();

        assert_eq!(identity.common_name, "");
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let der = self_signed(Some("peer"));
        let mut padded = der.clone();
        padded.extend_from_slice(b"trailing");

        let result = inspect_certificate(&padded);

        assert_eq!(
            result,
            Err(CertError::ParseError("8 bytes of trailing data".to_string()))
        );
    }

    #[test]
    fn test_validity_period() {
        let key_pair = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        params.not_before = rcgen::date_time_ymd(2020, 1, 1);
        params.not_after = rcgen::date_time_ymd(2030, 1, 1);
        let der = params.self_signed(&key_pair).unwrap().der().to_vec();

        // 2019-01-01, 2025-01-01, 2031-01-01
        assert_eq!(check_validity(&der, 1_546_300_800), Err(CertError::NotYetValid));
        assert_eq!(check_validity(&der, 1_735_689_600), Ok(()));
        assert_eq!(check_validity(&der, 1_924_992_000), Err(CertError::Expired));
    }
}
