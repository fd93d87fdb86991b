//! Registry of authorized peers (name -> expected fingerprint).

mod known_peers;

pub use known_peers::{MalformedLine, MalformedReason, Registry, RegistryBuilder};
