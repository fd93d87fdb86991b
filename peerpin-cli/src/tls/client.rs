//! TLS client configuration for mTLS connections.
//!
//! Provides client-side TLS configuration using rustls 0.23+.
//!
//! # Pinning
//!
//! The server is self-signed, so there is no CA to trust. Instead the only
//! trust anchor is one certificate, the [`PinnedCertificate`], checked by
//! [`PinnedServerVerifier`]. Verification only succeeds for the pinned
//! certificate itself (and only for a server name listed in its SANs). This
//! is pinning, not a general trust store: never add a second certificate.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use peerpin_auth::credential::{
    parse_certificates_pem, parse_private_key_pem, parse_single_certificate_pem,
};
use peerpin_auth::{ConfigLoadError, Fingerprint};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ClientConfig;

use super::verifier::PinnedServerVerifier;

/// Client TLS identity (certificate chain + private key).
pub struct ClientIdentity {
    /// Certificate chain, leaf first
    pub cert_chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl ClientIdentity {
    /// Load the client identity from PEM certificate and key files.
    pub fn load_pem(cert_path: &Path, key_path: &Path) -> Result<Self, ConfigLoadError> {
        let cert_pem =
            std::fs::read(cert_path).map_err(|e| ConfigLoadError::read(cert_path, e))?;
        let cert_chain = parse_certificates_pem(&cert_pem)
            .map_err(|e| ConfigLoadError::credential(cert_path, e))?;

        let key_pem = std::fs::read(key_path).map_err(|e| ConfigLoadError::read(key_path, e))?;
        let key =
            parse_private_key_pem(&key_pem).map_err(|e| ConfigLoadError::credential(key_path, e))?;

        Ok(Self { cert_chain, key })
    }

    pub fn from_der(cert_chain: Vec<CertificateDer<'static>>, key: PrivateKeyDer<'static>) -> Self {
        Self { cert_chain, key }
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("chain_len", &self.cert_chain.len())
            .finish_non_exhaustive()
    }
}

/// The one server certificate the client trusts.
#[derive(Debug, Clone)]
pub struct PinnedCertificate {
    cert: CertificateDer<'static>,
}

impl PinnedCertificate {
    /// Load the pinned certificate. The file must hold exactly one.
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let pem = std::fs::read(path).map_err(|e| ConfigLoadError::read(path, e))?;
        let cert =
            parse_single_certificate_pem(&pem).map_err(|e| ConfigLoadError::credential(path, e))?;
        Ok(Self { cert })
    }

    pub fn from_der(cert: CertificateDer<'static>) -> Self {
        Self { cert }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_cert_der(self.cert.as_ref())
    }
}

/// Build a TLS client config that presents `identity` and trusts only
/// `pinned`.
pub fn build_pinned_config(
    identity: ClientIdentity,
    pinned: &PinnedCertificate,
) -> Result<ClientConfig, ConfigLoadError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let verifier = PinnedServerVerifier::new(pinned.cert.clone(), provider.clone())
        .map_err(|e| ConfigLoadError::Policy(format!("unusable pinned certificate: {e}")))?;

    let mut config = ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])
        .map_err(|e| ConfigLoadError::Policy(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_client_auth_cert(identity.cert_chain, identity.key)
        .map_err(|e| ConfigLoadError::Policy(e.to_string()))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(config)
}
