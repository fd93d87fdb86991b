//! TLS server configuration for mTLS with self-signed clients.
//!
//! Uses rustls 0.23+ with an explicit ring provider.

use std::sync::Arc;

use peerpin_auth::PeerAuthorizer;
use rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

use super::identity::TlsIdentity;
use super::verifier::KnownPeersVerifier;

/// Protocol versions offered, most preferred first. Nothing below TLS 1.2.
static PROTOCOL_VERSIONS: &[&rustls::SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];

/// TLS server configuration wrapper.
#[derive(Debug, Clone)]
pub struct TlsServerConfig {
    config: Arc<ServerConfig>,
}

impl TlsServerConfig {
    /// Create the mTLS server config for the accepting role.
    ///
    /// Every client must present a certificate, and `authorizer` is the only
    /// thing that decides whether it is accepted. No client trust anchors are
    /// configured and no chain validation happens.
    ///
    /// # Arguments
    /// * `identity` - The server's certificate chain and private key
    /// * `authorizer` - Decides which presented client certificates are accepted
    pub fn with_known_peers(
        identity: TlsIdentity,
        authorizer: Arc<dyn PeerAuthorizer>,
    ) -> Result<Self, TlsConfigError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let verifier = Arc::new(KnownPeersVerifier::new(authorizer, provider.clone()));

        let mut config = ServerConfig::builder_with_provider(provider)
            .with_protocol_versions(PROTOCOL_VERSIONS)
            .map_err(|e| TlsConfigError::Protocol(e.to_string()))?
            .with_client_cert_verifier(verifier)
            .with_single_cert(identity.cert_chain, identity.key)
            .map_err(|e| TlsConfigError::Config(e.to_string()))?;
        config.alpn_protocols = vec![b"http/1.1".to_vec()];

        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Get the underlying rustls ServerConfig.
    pub fn into_rustls_config(self) -> Arc<ServerConfig> {
        self.config
    }

    /// Build the acceptor the listener drives handshakes with.
    pub fn acceptor(&self) -> TlsAcceptor {
        TlsAcceptor::from(self.config.clone())
    }
}

/// Errors that can occur during TLS configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TlsConfigError {
    #[error("unsupported protocol versions: {0}")]
    Protocol(String),
    #[error("failed to build config: {0}")]
    Config(String),
}
