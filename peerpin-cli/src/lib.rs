//! Connecting role for self-signed mutual TLS.
//!
//! Presents the client certificate and trusts exactly one pinned server
//! certificate.

pub mod client;
pub mod tls;

pub use client::{Client, Reply, Target};
