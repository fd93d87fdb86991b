//! Peer authorization for the daemon.
//!
//! Provides:
//! - [`load_known_peers`]: Reads the known-peers file into a [`Registry`](peerpin_auth::Registry)

mod known_peers;

pub use known_peers::{load_known_peers, load_known_peers_from};
