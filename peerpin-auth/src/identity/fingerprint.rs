//! Certificate fingerprints.
//!
//! A fingerprint is the SHA-256 digest of a certificate's raw DER bytes,
//! rendered as uppercase hex octets joined by colons:
//! `AA:BB:...:FF` (32 octets, 95 characters).

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const DIGEST_LEN: usize = 32;

/// Errors that can occur when parsing a fingerprint string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum FingerprintError {
    /// Wrong number of colon-separated octets.
    #[error("expected {expected} octets, got {actual}")]
    OctetCount { expected: usize, actual: usize },

    /// An octet is not exactly two hex digits.
    #[error("invalid octet {octet:?} at position {position}")]
    InvalidOctet { position: usize, octet: String },
}

/// A SHA-256 fingerprint of a DER-encoded certificate.
///
/// # Security
///
/// Comparisons use constant-time equality. `Hash` is derived anyway: the
/// digest is public information and only equality needs timing protection.
#[derive(Clone, Copy, Eq, Hash)]
#[allow(clippy::derived_hash_with_manual_eq)]
pub struct Fingerprint([u8; DIGEST_LEN]);

impl Fingerprint {
    /// Digest length in bytes.
    pub const LEN: usize = DIGEST_LEN;

    /// Length of the canonical string form.
    pub const DISPLAY_LEN: usize = Self::LEN * 3 - 1;

    /// Fingerprint the raw DER bytes of a certificate.
    #[must_use]
    pub fn from_cert_der(cert_der: &[u8]) -> Self {
        Self(Sha256::digest(cert_der).into())
    }

    /// Wrap an already computed digest.
    #[must_use]
    pub fn from_digest(digest: [u8; Self::LEN]) -> Self {
        Self(digest)
    }

    /// Parse a colon-separated hex fingerprint.
    ///
    /// Hex digits are accepted in either case; the parsed value always
    /// renders in the canonical uppercase form.
    ///
    /// # Errors
    ///
    /// Returns `FingerprintError` if the string is not exactly 32
    /// colon-separated pairs of hex digits.
    pub fn parse(s: &str) -> Result<Self, FingerprintError> {
        let octets: Vec<&str> = s.split(':').collect();
        if octets.len() != Self::LEN {
            return Err(FingerprintError::OctetCount {
                expected: Self::LEN,
                actual: octets.len(),
            });
        }

        let mut digest = [0u8; Self::LEN];
        for (position, (octet, slot)) in octets.iter().zip(digest.iter_mut()).enumerate() {
            let invalid = || FingerprintError::InvalidOctet {
                position,
                octet: (*octet).to_string(),
            };
            if octet.len() != 2 {
                return Err(invalid());
            }
            let mut byte = [0u8; 1];
            hex::decode_to_slice(octet, &mut byte).map_err(|_| invalid())?;
            *slot = byte[0];
        }

        Ok(Self(digest))
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_canonical(s: &str) -> bool {
        s.len() == Fingerprint::DISPLAY_LEN
            && s.split(':').count() == Fingerprint::LEN
            && s.split(':').all(|octet| {
                octet.len() == 2
                    && octet
                        .chars()
                        .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
            })
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let input = b"not really a certificate, but bytes are bytes";

        let fp1 = Fingerprint::from_cert_der(input);
        let fp2 = Fingerprint::from_cert_der(input);

        assert_eq!(fp1, fp2);
        assert_eq!(fp1.to_string(), fp2.to_string());
    }

    #[test]
    fn test_fingerprint_canonical_format() {
        for input in [&b""[..], &b"a"[..], &[0xffu8; 4096][..], &[0u8; 17][..]] {
            let rendered = Fingerprint::from_cert_der(input).to_string();
            assert!(is_canonical(&rendered), "not canonical: {rendered}");
        }
    }

    #[test]
    fn test_fingerprint_known_digest() {
        // SHA-256 of the empty input
        let fp = Fingerprint::from_cert_der(b"");
        assert_eq!(
            fp.to_string(),
            "E3:B0:C4:42:98:FC:1C:14:9A:FB:F4:C8:99:6F:B9:24:\
             27:AE:41:E4:64:9B:93:4C:A4:95:99:1B:78:52:B8:55"
        );
    }

    #[test]
    fn test_fingerprint_parse_case_insensitive() {
        let fp = Fingerprint::from_cert_der(b"some certificate");
        let lower = fp.to_string().to_lowercase();

        let parsed = Fingerprint::parse(&lower).unwrap();

        assert_eq!(parsed, fp);
        assert_eq!(parsed.to_string(), fp.to_string());
    }

    #[test]
    fn test_fingerprint_parse_invalid() {
        // Too few octets
        assert!(matches!(
            Fingerprint::parse("AA:BB"),
            Err(FingerprintError::OctetCount { actual: 2, .. })
        ));

        // Empty string
        assert!(Fingerprint::parse("").is_err());

        // Non-hex octet
        let mut octets = vec!["AA"; Fingerprint::LEN];
        octets[5] = "ZZ";
        assert!(matches!(
            Fingerprint::parse(&octets.join(":")),
            Err(FingerprintError::InvalidOctet { position: 5, .. })
        ));

        // Single-digit octet
        octets[5] = "A";
        assert!(Fingerprint::parse(&octets.join(":")).is_err());

        // Uncolonned digest
        assert!(Fingerprint::parse(&"AB".repeat(Fingerprint::LEN)).is_err());
    }

    #[test]
    fn test_fingerprint_from_str() {
        let fp = Fingerprint::from_cert_der(b"cert");
        let parsed: Fingerprint = fp.to_string().parse().unwrap();
        assert_eq!(parsed, fp);
    }

    #[test]
    fn test_different_input_different_fingerprint() {
        let fp1 = Fingerprint::from_cert_der(b"cert one");
        let fp2 = Fingerprint::from_cert_der(b"cert two");
        assert_ne!(fp1, fp2);
    }
}
