//! Server certificate verification against a single pinned certificate.
//!
//! webpki does the work: the pinned certificate is the only trust anchor,
//! so it checks the server name, validity period, and that the presented
//! certificate is the pinned one. The one case it refuses that pinning must
//! accept is a pinned certificate flagged `CA:TRUE` (the default output of
//! `openssl req -x509`), which webpki will not take as an end entity. For a
//! presented certificate byte-identical to the pin, [`PinnedServerVerifier`]
//! redoes the name and validity checks itself and accepts it.

use std::sync::Arc;

use peerpin_auth::{check_validity, CertError};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::{verify_server_name, WebPkiServerVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::server::ParsedCertificate;
use rustls::{CertificateError, DigitallySignedStruct, RootCertStore, SignatureScheme};

/// Accepts exactly one server certificate.
#[derive(Debug)]
pub struct PinnedServerVerifier {
    pinned: CertificateDer<'static>,
    inner: Arc<WebPkiServerVerifier>,
}

impl PinnedServerVerifier {
    /// Build a verifier whose only trust anchor is `pinned`.
    pub fn new(
        pinned: CertificateDer<'static>,
        provider: Arc<CryptoProvider>,
    ) -> Result<Self, rustls::Error> {
        let mut roots = RootCertStore::empty();
        roots.add(pinned.clone())?;
        let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider)
            .build()
            .map_err(|e| rustls::Error::General(e.to_string()))?;
        Ok(Self { pinned, inner })
    }

    fn verify_identical(
        &self,
        end_entity: &CertificateDer<'_>,
        server_name: &ServerName<'_>,
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        check_validity(end_entity.as_ref(), now.as_secs()).map_err(|e| {
            rustls::Error::InvalidCertificate(match e {
                CertError::NotYetValid => CertificateError::NotValidYet,
                CertError::Expired => CertificateError::Expired,
                _ => CertificateError::BadEncoding,
            })
        })?;
        verify_server_name(&ParsedCertificate::try_from(end_entity)?, server_name)?;
        Ok(ServerCertVerified::assertion())
    }
}

impl ServerCertVerifier for PinnedServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        match self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            // webpki reports CaUsedAsEndEntity through `Other`
            Err(rustls::Error::InvalidCertificate(CertificateError::Other(_)))
                if end_entity.as_ref() == self.pinned.as_ref() =>
            {
                self.verify_identical(end_entity, server_name, now)
            }
            result => result,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair};

    fn self_signed(is_ca: bool) -> CertificateDer<'static> {
        let key_pair = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        if is_ca {
            params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        }
        params.self_signed(&key_pair).unwrap().der().clone()
    }

    fn verifier(pinned: &CertificateDer<'static>) -> PinnedServerVerifier {
        PinnedServerVerifier::new(
            pinned.clone(),
            Arc::new(rustls::crypto::ring::default_provider()),
        )
        .unwrap()
    }

    fn verify(
        verifier: &PinnedServerVerifier,
        presented: &CertificateDer<'_>,
        name: &str,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let server_name = ServerName::try_from(name.to_string()).unwrap();
        verifier.verify_server_cert(presented, &[], &server_name, &[], UnixTime::now())
    }

    #[test]
    fn test_pinned_end_entity_accepted() {
        let pinned = self_signed(false);

        assert!(verify(&verifier(&pinned), &pinned, "localhost").is_ok());
    }

    #[test]
    fn test_pinned_ca_flagged_certificate_accepted() {
        let pinned = self_signed(true);

        assert!(verify(&verifier(&pinned), &pinned, "localhost").is_ok());
    }

    #[test]
    fn test_ca_flagged_pin_still_checks_server_name() {
        let pinned = self_signed(true);

        let err = verify(&verifier(&pinned), &pinned, "elsewhere.test").unwrap_err();

        assert!(matches!(err, rustls::Error::InvalidCertificate(_)));
    }

    #[test]
    fn test_different_certificate_rejected() {
        for is_ca in [false, true] {
            let pinned = self_signed(is_ca);
            let other = self_signed(is_ca);

            assert!(verify(&verifier(&pinned), &other, "localhost").is_err());
        }
    }
}
