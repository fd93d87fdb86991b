//! TLS configuration for the daemon.
//!
//! Provides server identity loading, the known-peers client verifier,
//! the server config builder, and certificate generation for provisioning.

mod cert;
mod connect_info;
mod identity;
mod server;
mod verifier;

pub use cert::{build_self_signed, CertError, CertParams, GeneratedCert};
pub use connect_info::PeerInfo;
pub use identity::TlsIdentity;
pub use server::{TlsConfigError, TlsServerConfig};
pub use verifier::{log_rejection, KnownPeersVerifier, AUDIT_TARGET};
