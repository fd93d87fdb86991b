//! Pure trust primitives for self-signed mutual TLS.
//!
//! This crate is intentionally IO-free:
//! - No filesystem operations
//! - No network calls
//! - No logging
//!
//! Callers read files and log; this crate decodes, decides, and returns
//! warnings as data ([`registry::MalformedLine`]).
//!
//! - [`identity::Fingerprint`] - SHA-256 of a certificate's DER bytes
//! - [`registry::Registry`] - known peer names and their fingerprints
//! - [`authz::PeerAuthorizer`] - the verification capability injected into
//!   the accepting role's handshake policy
//! - [`credential`] - PEM decoding for certificates and private keys
//!
//! # Example
//!
//! ```ignore
//! use peerpin_auth::{registry::Registry, verify_peer};
//!
//! let (registry, malformed) = Registry::parse(&known_peers_text);
//! for line in &malformed {
//!     eprintln!("skipping {line}");
//! }
//! let peer = verify_peer(&presented_certs, &registry)?;
//! println!("authorized {}", peer.name());
//! ```

pub mod authz;
pub mod cert;
pub mod credential;
pub mod error;
pub mod identity;
pub mod registry;

pub use authz::{verify_peer, AuthorizedPeer, PeerAuthorizer, VerifyError};
pub use cert::{check_validity, inspect_certificate, CertError, CertificateIdentity};
pub use credential::CredentialError;
pub use error::ConfigLoadError;
pub use identity::{Fingerprint, FingerprintError};
pub use registry::{MalformedLine, Registry};
