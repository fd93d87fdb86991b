//! Known-peers file loading.
//!
//! Reading the file is fatal on failure; individual bad lines are not.
//! Each skipped line is logged with its line number so the operator can
//! fix the file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use peerpin_auth::registry::{Registry, RegistryBuilder};
use peerpin_auth::ConfigLoadError;

/// Load the known-peers registry from a file.
///
/// # Errors
///
/// Returns `ConfigLoadError::Read` if the file cannot be opened or read,
/// including when it is not valid UTF-8.
pub fn load_known_peers(path: &Path) -> Result<Registry, ConfigLoadError> {
    let file = File::open(path).map_err(|e| ConfigLoadError::read(path, e))?;
    load_known_peers_from(BufReader::new(file), path)
}

/// Load the known-peers registry from any line source.
///
/// `source` is only used to label log lines and errors.
pub fn load_known_peers_from<R: BufRead>(
    reader: R,
    source: &Path,
) -> Result<Registry, ConfigLoadError> {
    let mut builder = RegistryBuilder::new();

    for line in reader.lines() {
        let line = line.map_err(|e| ConfigLoadError::read(source, e))?;
        if let Err(malformed) = builder.push_line(&line) {
            tracing::warn!(
                path = %source.display(),
                line = malformed.line_number,
                reason = %malformed.reason,
                "Skipping malformed known-peers line"
            );
        }
    }

    let registry = builder.build();
    if registry.is_empty() {
        tracing::warn!(
            path = %source.display(),
            "No valid peer entries found, every client will be rejected"
        );
    } else {
        tracing::info!(
            path = %source.display(),
            count = registry.len(),
            "Loaded known peers"
        );
    }

    Ok(registry)
}
