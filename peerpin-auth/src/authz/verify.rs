//! Peer verification against the known-peers registry.

use rustls_pki_types::CertificateDer;

use crate::cert::inspect_certificate;
use crate::identity::Fingerprint;
use crate::registry::Registry;

use super::error::VerifyError;

/// Decides whether a presented certificate list belongs to an authorized peer.
///
/// This is the capability the accepting role injects into its handshake
/// policy in place of chain validation.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: one instance is shared by every
/// concurrent handshake.
pub trait PeerAuthorizer: std::fmt::Debug + Send + Sync {
    /// Authorize the peer from the certificates it presented, leaf first.
    ///
    /// Must not block or perform I/O.
    fn authorize(&self, presented: &[CertificateDer<'_>]) -> Result<AuthorizedPeer, VerifyError>;
}

/// A peer that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedPeer {
    name: String,
    fingerprint: Fingerprint,
}

impl AuthorizedPeer {
    /// Crate-private so that an `AuthorizedPeer` only comes out of
    /// [`verify_peer`].
    pub(crate) fn new(name: String, fingerprint: Fingerprint) -> Self {
        Self { name, fingerprint }
    }

    /// The verified common name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

/// Verify a presented certificate list against the registry.
///
/// Only the leaf (first) certificate is considered; no issuer chain is
/// configured, so later entries are ignored.
///
/// # Errors
///
/// - `VerifyError::CredentialAbsent` if the list is empty
/// - `VerifyError::MalformedCredential` if the leaf does not parse
/// - `VerifyError::PeerNotAuthorized` if the common name is unknown
/// - `VerifyError::PeerCredentialMismatch` if the name is known but the
///   fingerprint differs
pub fn verify_peer(
    presented: &[CertificateDer<'_>],
    registry: &Registry,
) -> Result<AuthorizedPeer, VerifyError> {
    let leaf = presented.first().ok_or(VerifyError::CredentialAbsent)?;

    let identity = inspect_certificate(leaf.as_ref())
        .map_err(|e| VerifyError::MalformedCredential(e.to_string()))?;

    let Some(expected) = registry.expected_fingerprint(&identity.common_name) else {
        return Err(VerifyError::PeerNotAuthorized {
            name: identity.common_name,
        });
    };

    if *expected != identity.fingerprint {
        return Err(VerifyError::PeerCredentialMismatch {
            name: identity.common_name,
            expected: *expected,
            presented: identity.fingerprint,
        });
    }

    Ok(AuthorizedPeer::new(identity.common_name, identity.fingerprint))
}

impl PeerAuthorizer for Registry {
    fn authorize(&self, presented: &[CertificateDer<'_>]) -> Result<AuthorizedPeer, VerifyError> {
        verify_peer(presented, self)
    }
}
