//! TLS configuration for the connecting role.

mod client;
mod verifier;

pub use client::{build_pinned_config, ClientIdentity, PinnedCertificate};
pub use verifier::PinnedServerVerifier;
