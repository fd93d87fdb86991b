//! Accepting role for self-signed mutual TLS.
//!
//! Loads the known-peers registry and the server identity, builds a rustls
//! server config whose only client-authorization gate is the registry, and
//! serves HTTP/1.1 to peers that pass it.

pub mod auth;
pub mod provision;
pub mod server;
pub mod tls;

pub use server::Server;
