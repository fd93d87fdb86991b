//! Peer authorization for the accepting role.
//!
//! Self-signed peers have no issuer to validate against, so the handshake
//! policy replaces chain validation with [`PeerAuthorizer`]: the leaf
//! certificate's common name must be in the [`Registry`](crate::registry::Registry)
//! and its fingerprint must equal the one provisioned for that name.

mod error;
mod verify;

pub use error::VerifyError;
pub use verify::{verify_peer, AuthorizedPeer, PeerAuthorizer};
