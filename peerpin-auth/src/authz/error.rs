//! Peer verification error types.

use crate::identity::Fingerprint;

/// Why a presented peer credential was rejected.
///
/// Every variant is terminal for the connection that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum VerifyError {
    /// The peer presented no certificate.
    #[error("no client certificate presented")]
    CredentialAbsent,

    /// The leaf certificate could not be parsed.
    #[error("malformed client certificate: {0}")]
    MalformedCredential(String),

    /// The certificate's common name is not in the registry.
    #[error("client CN '{name}' not authorized")]
    PeerNotAuthorized { name: String },

    /// The common name is known but the certificate is not the one
    /// provisioned for it.
    #[error("client fingerprint mismatch for CN '{name}'")]
    PeerCredentialMismatch {
        name: String,
        expected: Fingerprint,
        presented: Fingerprint,
    },
}

impl VerifyError {
    /// Stable identifier for logs and metrics.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::CredentialAbsent => "credential_absent",
            Self::MalformedCredential(_) => "malformed_credential",
            Self::PeerNotAuthorized { .. } => "peer_not_authorized",
            Self::PeerCredentialMismatch { .. } => "peer_credential_mismatch",
        }
    }

    /// Common name the peer claimed, when one was readable.
    #[must_use]
    pub fn claimed_name(&self) -> Option<&str> {
        match self {
            Self::PeerNotAuthorized { name } | Self::PeerCredentialMismatch { name, .. } => {
                Some(name)
            }
            Self::CredentialAbsent | Self::MalformedCredential(_) => None,
        }
    }
}
