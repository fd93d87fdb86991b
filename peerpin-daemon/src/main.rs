//! peerpin daemon - mTLS listener for self-signed peers
//!
//! Serves authorized peers, provisions certificates, and prints
//! known-peers entries for existing certificates.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use peerpin_daemon::auth::load_known_peers;
use peerpin_daemon::provision::{provision, registry_lines, ProvisionRequest};
use peerpin_daemon::tls::{CertParams, TlsIdentity, TlsServerConfig};
use peerpin_daemon::Server;
use tokio::signal;
use tracing_subscriber::EnvFilter;

// ============================================================================
// CLI Definition
// ============================================================================

/// peerpin daemon - mutual TLS without a certificate authority
#[derive(Parser)]
#[command(name = "peerpin-daemon", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Accept mTLS connections from peers listed in the known-peers file
    Serve(ServeArgs),

    /// Generate a self-signed certificate and key
    Provision(ProvisionArgs),

    /// Print the known-peers line for each certificate in a PEM file
    Fingerprint {
        /// PEM certificate file
        cert: PathBuf,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Server certificate (PEM)
    #[arg(long, env = "PEERPIN_CERT", default_value = "certs/server.crt")]
    cert: PathBuf,

    /// Server private key (PEM)
    #[arg(long, env = "PEERPIN_KEY", default_value = "certs/server.key")]
    key: PathBuf,

    /// Known-peers file: one `<common-name> <fingerprint>` per line
    #[arg(long, env = "PEERPIN_KNOWN_PEERS", default_value = "certs/knownClients.txt")]
    known_peers: PathBuf,

    /// Listen address
    #[arg(long, env = "PEERPIN_ADDR", default_value = "0.0.0.0:8443")]
    addr: SocketAddr,

    /// Seconds a client gets to complete the TLS handshake
    #[arg(long, env = "PEERPIN_HANDSHAKE_TIMEOUT_SECS", default_value_t = 10)]
    handshake_timeout_secs: u64,
}

#[derive(Args)]
struct ProvisionArgs {
    /// Common name; the name the peer is registered under
    #[arg(long)]
    name: String,

    /// Output directory
    #[arg(long, default_value = "certs")]
    out_dir: PathBuf,

    /// Base name of the written files (defaults to the common name)
    #[arg(long)]
    file_stem: Option<String>,

    /// Validity period in days
    #[arg(long, default_value_t = 365)]
    days: u32,

    /// DNS subject alternative name (repeatable)
    #[arg(long = "dns", default_values = ["localhost"])]
    san_dns: Vec<String>,

    /// IP subject alternative name (repeatable)
    #[arg(long = "ip", default_values = ["127.0.0.1", "::1"])]
    san_ips: Vec<IpAddr>,

    /// Append the new entry to this known-peers file
    #[arg(long)]
    append_to: Option<PathBuf>,

    /// Overwrite existing files
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => cmd_serve(args).await,
        Commands::Provision(args) => cmd_provision(args),
        Commands::Fingerprint { cert } => cmd_fingerprint(&cert),
    }
}

async fn cmd_serve(args: ServeArgs) -> Result<()> {
    let registry = load_known_peers(&args.known_peers)?;
    let identity = TlsIdentity::load_pem(&args.cert, &args.key)?;
    if let Some(fingerprint) = identity.fingerprint() {
        tracing::info!(cert = %args.cert.display(), %fingerprint, "Loaded server identity");
    }

    let tls_config = TlsServerConfig::with_known_peers(identity, Arc::new(registry))
        .context("Failed to build TLS server config")?;

    let server = Server::bind(args.addr, tls_config.acceptor())
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?
        .with_handshake_timeout(Duration::from_secs(args.handshake_timeout_secs));
    tracing::info!(addr = %server.local_addr()?, "Listening (mTLS)");

    server.serve(shutdown_signal()).await;

    tracing::info!("Server stopped, shutdown complete");
    Ok(())
}

fn cmd_provision(args: ProvisionArgs) -> Result<()> {
    let request = ProvisionRequest {
        file_stem: args.file_stem.unwrap_or_else(|| args.name.clone()),
        params: CertParams {
            common_name: args.name,
            validity_days: args.days,
            san_dns: args.san_dns,
            san_ips: args.san_ips,
        },
        out_dir: args.out_dir,
        append_to: args.append_to,
        force: args.force,
    };

    let provisioned = provision(&request)?;

    eprintln!("Certificate: {}", provisioned.cert_path.display());
    eprintln!("Private key: {}", provisioned.key_path.display());
    println!("{}", provisioned.registry_line);
    Ok(())
}

fn cmd_fingerprint(cert: &std::path::Path) -> Result<()> {
    let pem = std::fs::read(cert).with_context(|| format!("Failed to read {}", cert.display()))?;
    let lines =
        registry_lines(&pem).with_context(|| format!("Invalid certificate in {}", cert.display()))?;
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["peerpin-daemon", "serve"]).unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };

        assert_eq!(args.known_peers, PathBuf::from("certs/knownClients.txt"));
        assert_eq!(args.addr, "0.0.0.0:8443".parse::<SocketAddr>().unwrap());
        assert_eq!(args.handshake_timeout_secs, 10);
    }

    #[test]
    fn test_provision_san_defaults() {
        let cli = Cli::try_parse_from(["peerpin-daemon", "provision", "--name", "alice"]).unwrap();
        let Commands::Provision(args) = cli.command else {
            panic!("expected provision");
        };

        assert_eq!(args.san_dns, vec!["localhost".to_string()]);
        assert_eq!(args.san_ips.len(), 2);
        assert!(args.file_stem.is_none());
    }
}
