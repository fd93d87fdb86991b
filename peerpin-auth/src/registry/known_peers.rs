//! Known-peers registry.
//!
//! The registry maps a peer's certificate common name to the fingerprint
//! that was provisioned for it. Its text form is one entry per line:
//!
//! ```text
//! # name              fingerprint
//! my_secure_client    AA:11:...:FF
//! ```
//!
//! Parsing is a single fold over the lines. Malformed lines are reported
//! and skipped; a later line for the same name replaces the earlier one.

use std::collections::BTreeMap;
use std::fmt;

use crate::identity::{Fingerprint, FingerprintError};

/// Why a registry line was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MalformedReason {
    /// The line does not have exactly two whitespace-separated fields.
    FieldCount(usize),
    /// The second field is not a valid fingerprint.
    InvalidFingerprint(FingerprintError),
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount(found) => write!(
                f,
                "expected '<common_name> <fingerprint>', found {found} field(s)"
            ),
            Self::InvalidFingerprint(e) => write!(f, "invalid fingerprint: {e}"),
        }
    }
}

/// A registry line that was skipped during parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line_number}: {reason}")]
pub struct MalformedLine {
    /// 1-based line number in the source.
    pub line_number: usize,
    pub reason: MalformedReason,
}

/// Incremental registry construction, one line at a time.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: BTreeMap<String, Fingerprint>,
    lines_seen: usize,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next line of the source.
    ///
    /// Blank lines and `#` comments are ignored. A well-formed line is
    /// inserted, replacing any earlier entry with the same name.
    ///
    /// # Errors
    ///
    /// Returns the `MalformedLine` when the line was skipped. The builder
    /// stays usable either way.
    pub fn push_line(&mut self, line: &str) -> Result<(), MalformedLine> {
        self.lines_seen += 1;
        let line_number = self.lines_seen;

        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [name, fingerprint] = fields.as_slice() else {
            return Err(MalformedLine {
                line_number,
                reason: MalformedReason::FieldCount(fields.len()),
            });
        };

        let fingerprint = Fingerprint::parse(fingerprint).map_err(|e| MalformedLine {
            line_number,
            reason: MalformedReason::InvalidFingerprint(e),
        })?;

        self.entries.insert(name.to_string(), fingerprint);
        Ok(())
    }

    /// Freeze the entries collected so far.
    #[must_use]
    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
        }
    }
}

/// Immutable mapping from peer name to expected fingerprint.
///
/// Built once at startup and shared read-only; it is never mutated, so
/// concurrent lookups need no locking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    entries: BTreeMap<String, Fingerprint>,
}

impl Registry {
    /// Parse a complete registry source.
    ///
    /// Returns the registry together with every skipped line, in order.
    #[must_use]
    pub fn parse(source: &str) -> (Self, Vec<MalformedLine>) {
        let mut builder = RegistryBuilder::new();
        let malformed = source
            .lines()
            .filter_map(|line| builder.push_line(line).err())
            .collect();
        (builder.build(), malformed)
    }

    /// Expected fingerprint for a peer name.
    #[must_use]
    pub fn expected_fingerprint(&self, name: &str) -> Option<&Fingerprint> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Fingerprint)> {
        self.entries.iter().map(|(name, fp)| (name.as_str(), fp))
    }
}
