//! Startup configuration errors shared by both roles.

use std::path::PathBuf;

use crate::credential::CredentialError;

/// A credential or registry file could not be used.
///
/// These are configuration errors: they abort role initialization before any
/// network activity and always name the offending file.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigLoadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid credential in {}: {source}", path.display())]
    Credential {
        path: PathBuf,
        #[source]
        source: CredentialError,
    },

    #[error("failed to build handshake policy: {0}")]
    Policy(String),
}

impl ConfigLoadError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn credential(path: impl Into<PathBuf>, source: CredentialError) -> Self {
        Self::Credential {
            path: path.into(),
            source,
        }
    }
}
