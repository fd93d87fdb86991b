//! Server TLS identity loading.

use std::fmt;
use std::path::Path;

use peerpin_auth::credential::{parse_certificates_pem, parse_private_key_pem};
use peerpin_auth::{ConfigLoadError, Fingerprint};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

/// TLS identity bundle (certificate chain + private key).
pub struct TlsIdentity {
    /// Certificate chain, leaf first
    pub cert_chain: Vec<CertificateDer<'static>>,
    /// Private key matching the leaf
    pub key: PrivateKeyDer<'static>,
}

impl TlsIdentity {
    /// Load an identity from PEM certificate and key files.
    ///
    /// # Errors
    ///
    /// Returns `ConfigLoadError` naming the file that could not be read or
    /// decoded.
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

    /// Fingerprint of the leaf certificate.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.cert_chain
            .first()
            .map(|leaf| Fingerprint::from_cert_der(leaf.as_ref()))
    }
}

impl Clone for TlsIdentity {
    fn clone(&self) -> Self {
        Self {
            cert_chain: self.cert_chain.clone(),
            key: self.key.clone_key(),
        }
    }
}

impl fmt::Debug for TlsIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsIdentity")
            .field("fingerprint", &self.fingerprint())
            .field("chain_len", &self.cert_chain.len())
            .finish_non_exhaustive()
    }
}
