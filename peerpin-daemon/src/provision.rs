//! Credential provisioning: write a self-signed certificate and key, and
//! produce the known-peers line that authorizes it.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use peerpin_auth::Fingerprint;

use crate::tls::{build_self_signed, CertParams};

/// What to generate and where to put it.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub params: CertParams,
    /// Directory receiving `<file_stem>.crt` and `<file_stem>.key`
    pub out_dir: PathBuf,
    pub file_stem: String,
    /// Known-peers file to append the new entry to
    pub append_to: Option<PathBuf>,
    /// Overwrite existing certificate and key files
    pub force: bool,
}

/// Files written by [`provision`].
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub fingerprint: Fingerprint,
    /// `<common_name> <fingerprint>`, ready for a known-peers file
    pub registry_line: String,
}

/// Generate a certificate and key and write them to disk.
pub fn provision(request: &ProvisionRequest) -> Result<Provisioned> {
    check_registry_name(&request.params.common_name)?;

    let cert_path = request.out_dir.join(format!("{}.crt", request.file_stem));
    let key_path = request.out_dir.join(format!("{}.key", request.file_stem));

    if !request.force {
        for path in [&cert_path, &key_path] {
            anyhow::ensure!(
                !path.exists(),
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }
    }

    let generated = build_self_signed(&request.params)?;

    std::fs::create_dir_all(&request.out_dir)
        .with_context(|| format!("Failed to create {}", request.out_dir.display()))?;
    std::fs::write(&cert_path, &generated.cert_pem)
        .with_context(|| format!("Failed to write {}", cert_path.display()))?;
    write_private_key(&key_path, generated.key_pem.as_bytes())?;

    let registry_line = generated.registry_line();
    tracing::info!(
        name = %request.params.common_name,
        fingerprint = %generated.fingerprint,
        cert = %cert_path.display(),
        "Provisioned certificate"
    );

    if let Some(registry_path) = &request.append_to {
        append_registry_line(registry_path, &registry_line)?;
    }

    Ok(Provisioned {
        cert_path,
        key_path,
        fingerprint: generated.fingerprint,
        registry_line,
    })
}

/// The common name becomes the first field of a known-peers line.
fn check_registry_name(name: &str) -> Result<()> {
    anyhow::ensure!(!name.is_empty(), "certificate name must not be empty");
    anyhow::ensure!(
        !name.chars().any(char::is_whitespace),
        "certificate name {name:?} contains whitespace"
    );
    anyhow::ensure!(
        !name.starts_with('#'),
        "certificate name {name:?} would read as a comment"
    );
    Ok(())
}

fn write_private_key(path: &Path, pem: &[u8]) -> Result<()> {
    std::fs::write(path, pem).with_context(|| format!("Failed to write {}", path.display()))?;

    // Set restrictive permissions on key
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to restrict permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Append one entry to a known-peers file, creating it if needed.
///
/// An existing entry with the same name stays in the file; the new line
/// supersedes it when the registry is loaded.
pub fn append_registry_line(path: &Path, line: &str) -> Result<()> {
    let existing = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };

    if let Some(name) = line.split_whitespace().next() {
        let (registry, _) = peerpin_auth::Registry::parse(&existing);
        if registry.expected_fingerprint(name).is_some() {
            tracing::warn!(
                name,
                path = %path.display(),
                "Name already registered, new entry supersedes it"
            );
        }
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let separator = if existing.is_empty() || existing.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    writeln!(file, "{separator}{line}")
        .with_context(|| format!("Failed to append to {}", path.display()))?;

    Ok(())
}

/// Known-peers lines for every certificate in a PEM document.
pub fn registry_lines(cert_pem: &[u8]) -> Result<Vec<String>> {
    peerpin_auth::credential::parse_certificates_pem(cert_pem)?
        .iter()
        .map(|cert| -> Result<String> {
            let identity = peerpin_auth::inspect_certificate(cert.as_ref())?;
            if identity.common_name.is_empty() {
                tracing::warn!(
                    fingerprint = %identity.fingerprint,
                    "Certificate has no common name and cannot be registered"
                );
            }
            Ok(format!("{} {}", identity.common_name, identity.fingerprint))
        })
        .collect()
}
