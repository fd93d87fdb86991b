//! Verified peer information for an established TLS connection.

use std::net::SocketAddr;

use peerpin_auth::{inspect_certificate, Fingerprint};
use rustls::ServerConnection;

/// Connection info extracted from a completed handshake.
///
/// Handed to the request handler so it knows which registered peer it is
/// talking to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    /// Remote socket address of the client
    pub remote_addr: SocketAddr,
    /// Common name from the client certificate
    pub name: String,
    pub fingerprint: Fingerprint,
}

impl PeerInfo {
    /// Read the peer identity from a server session.
    ///
    /// Returns `None` if the session carries no parseable client
    /// certificate, which cannot happen once the verifier accepted it.
    pub fn from_session(remote_addr: SocketAddr, session: &ServerConnection) -> Option<Self> {
        let leaf = session.peer_certificates()?.first()?;
        let identity = inspect_certificate(leaf.as_ref()).ok()?;
        Some(Self {
            remote_addr,
            name: identity.common_name,
            fingerprint: identity.fingerprint,
        })
    }
}
