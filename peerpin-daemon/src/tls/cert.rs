//! Self-signed X.509 certificate generation for provisioning.
//!
//! Uses rcgen to generate an ECDSA P-256 key pair and a self-signed
//! certificate whose fingerprint goes straight into a known-peers file.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use peerpin_auth::Fingerprint;
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, SanType};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use zeroize::Zeroizing;

use super::identity::TlsIdentity;

/// Parameters for certificate generation.
#[derive(Debug, Clone)]
pub struct CertParams {
    /// Subject common name; this is the name peers are registered under
    pub common_name: String,
    /// Validity period in days
    pub validity_days: u32,
    /// Subject alternative names (DNS names)
    pub san_dns: Vec<String>,
    /// Subject alternative names (IP addresses)
    pub san_ips: Vec<IpAddr>,
}

impl Default for CertParams {
    fn default() -> Self {
        Self {
            common_name: "localhost".to_string(),
            validity_days: 365,
            san_dns: vec!["localhost".to_string()],
            san_ips: vec![
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(Ipv6Addr::LOCALHOST),
            ],
        }
    }
}

/// A freshly generated certificate and its private key.
pub struct GeneratedCert {
    /// Subject common name written into the certificate
    pub common_name: String,
    /// Certificate in PEM format
    pub cert_pem: String,
    /// PKCS#8 private key in PEM format
    pub key_pem: Zeroizing<String>,
    /// Certificate in DER format
    pub cert_der: CertificateDer<'static>,
    key_der: Zeroizing<Vec<u8>>,
    /// SHA-256 fingerprint of `cert_der`
    pub fingerprint: Fingerprint,
}

impl GeneratedCert {
    /// Registry line for this certificate: `<common_name> <fingerprint>`.
    pub fn registry_line(&self) -> String {
        format!("{} {}", self.common_name, self.fingerprint)
    }

    /// Use the generated certificate directly as a TLS identity.
    pub fn tls_identity(&self) -> TlsIdentity {
        TlsIdentity {
            cert_chain: vec![self.cert_der.clone()],
            key: PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key_der.to_vec())),
        }
    }
}

impl std::fmt::Debug for GeneratedCert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedCert")
            .field("common_name", &self.common_name)
            .field("fingerprint", &self.fingerprint)
            .field("cert_der_len", &self.cert_der.len())
            .finish_non_exhaustive()
    }
}

/// Generate a self-signed certificate with a new ECDSA P-256 key.
///
/// DNS names that are not valid IA5 strings are skipped.
pub fn build_self_signed(params: &CertParams) -> Result<GeneratedCert, CertError> {
    let key_pair = KeyPair::generate().map_err(|e| CertError::KeyPair(e.to_string()))?;

    let mut cert_params = CertificateParams::default();
    cert_params.distinguished_name = DistinguishedName::new();
    cert_params
        .distinguished_name
        .push(DnType::CommonName, &params.common_name);

    cert_params.not_before = time::OffsetDateTime::now_utc();
    cert_params.not_after =
        cert_params.not_before + time::Duration::days(i64::from(params.validity_days));

    for dns in &params.san_dns {
        // rcgen requires Ia5String for DNS names
        if let Ok(san) = dns.clone().try_into() {
            cert_params.subject_alt_names.push(SanType::DnsName(san));
        }
    }
    for ip in &params.san_ips {
        cert_params.subject_alt_names.push(SanType::IpAddress(*ip));
    }

    let cert = cert_params
        .self_signed(&key_pair)
        .map_err(|e| CertError::Generation(e.to_string()))?;

    let cert_der = cert.der().clone();
    let fingerprint = Fingerprint::from_cert_der(cert_der.as_ref());

    Ok(GeneratedCert {
        common_name: params.common_name.clone(),
        cert_pem: cert.pem(),
        key_pem: Zeroizing::new(key_pair.serialize_pem()),
        cert_der,
        key_der: Zeroizing::new(key_pair.serialize_der()),
        fingerprint,
    })
}

/// Errors that can occur during certificate generation.
#[derive(Debug, thiserror::Error)]
pub enum CertError {
    #[error("failed to create key pair: {0}")]
    KeyPair(String),
    #[error("failed to generate certificate: {0}")]
    Generation(String),
}
