//! Certificate identity types.
//!
//! - [`Fingerprint`] - SHA-256 of a certificate's DER bytes, rendered as
//!   uppercase colon-separated hex: `AA:BB:...:FF`
//!
//! The same canonical rendering is produced by the registry tooling and by
//! the runtime verifier, so a fingerprint copied from one always compares
//! equal in the other.
//!
//! # Example
//!
//! ```
//! use peerpin_auth::identity::Fingerprint;
//!
//! let fingerprint = Fingerprint::from_cert_der(b"raw certificate bytes");
//! let parsed = Fingerprint::parse(&fingerprint.to_string().to_lowercase()).unwrap();
//! assert_eq!(fingerprint, parsed);
//! ```

mod fingerprint;

pub use fingerprint::{Fingerprint, FingerprintError};
