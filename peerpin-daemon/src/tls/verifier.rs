//! rustls client-certificate verifier backed by the known-peers registry.
//!
//! Self-signed client certificates have no issuer to chain to, so instead of
//! `WebPkiClientVerifier` the server installs [`KnownPeersVerifier`]. It hands
//! the presented certificates to a [`PeerAuthorizer`] and writes the audit
//! trail. rustls still verifies the handshake signature afterwards with the
//! provider's algorithms, so a copied certificate without its key is useless.

use std::sync::Arc;

use peerpin_auth::{PeerAuthorizer, VerifyError};
use rustls::client::danger::HandshakeSignatureValid;
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, UnixTime};
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::{CertificateError, DigitallySignedStruct, DistinguishedName, OtherError, SignatureScheme};

/// Tracing target for authorization decisions.
pub const AUDIT_TARGET: &str = "peerpin::audit";

/// Mandatory client authentication against a [`PeerAuthorizer`].
#[derive(Debug)]
pub struct KnownPeersVerifier {
    authorizer: Arc<dyn PeerAuthorizer>,
    provider: Arc<CryptoProvider>,
}

impl KnownPeersVerifier {
    pub fn new(authorizer: Arc<dyn PeerAuthorizer>, provider: Arc<CryptoProvider>) -> Self {
        Self {
            authorizer,
            provider,
        }
    }
}

impl ClientCertVerifier for KnownPeersVerifier {
    fn client_auth_mandatory(&self) -> bool {
        true
    }

    // No CA hints: every client certificate is self-signed.
    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        &[]
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _now: UnixTime,
    ) -> Result<ClientCertVerified, rustls::Error> {
        let presented: Vec<CertificateDer<'_>> = std::iter::once(end_entity)
            .chain(intermediates)
            .cloned()
            .collect();

        match self.authorizer.authorize(&presented) {
            Ok(peer) => {
                tracing::info!(
                    target: AUDIT_TARGET,
                    name = peer.name(),
                    fingerprint = %peer.fingerprint(),
                    "Client certificate authorized"
                );
                Ok(ClientCertVerified::assertion())
            }
            Err(err) => {
                log_rejection(&err);
                Err(to_rustls_error(err))
            }
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Audit a rejected handshake.
///
/// rustls refuses an empty certificate message before the verifier runs, so
/// the accept loop also calls this for `NoCertificatesPresented`.
pub fn log_rejection(err: &VerifyError) {
    match err {
        VerifyError::PeerCredentialMismatch {
            name,
            expected,
            presented,
        } => tracing::warn!(
            target: AUDIT_TARGET,
            reason = err.reason(),
            name = name.as_str(),
            expected = %expected,
            presented = %presented,
            "Client certificate rejected: fingerprint mismatch"
        ),
        _ => tracing::warn!(
            target: AUDIT_TARGET,
            reason = err.reason(),
            name = err.claimed_name().unwrap_or_default(),
            error = %err,
            "Client certificate rejected"
        ),
    }
}

fn to_rustls_error(err: VerifyError) -> rustls::Error {
    match err {
        VerifyError::CredentialAbsent => rustls::Error::NoCertificatesPresented,
        VerifyError::MalformedCredential(_) => {
            rustls::Error::InvalidCertificate(CertificateError::BadEncoding)
        }
        other => rustls::Error::InvalidCertificate(CertificateError::Other(OtherError(
            Arc::new(other),
        ))),
    }
}
