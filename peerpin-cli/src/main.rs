//! peerpin - mTLS client that pins a single self-signed server certificate

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use peerpin_cli::tls::{build_pinned_config, ClientIdentity, PinnedCertificate};
use peerpin_cli::{Client, Target};
use tracing_subscriber::EnvFilter;

/// peerpin - mutual TLS without a certificate authority
#[derive(Parser)]
#[command(name = "peerpin", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a GET request to a peerpin daemon and print the response body
    Request(RequestArgs),
}

#[derive(Args)]
struct RequestArgs {
    /// Client certificate (PEM)
    #[arg(long, env = "PEERPIN_CLIENT_CERT", default_value = "certs/client.crt")]
    cert: PathBuf,

    /// Client private key (PEM)
    #[arg(long, env = "PEERPIN_CLIENT_KEY", default_value = "certs/client.key")]
    key: PathBuf,

    /// The one server certificate to trust (PEM)
    #[arg(long, env = "PEERPIN_SERVER_CERT", default_value = "certs/server.crt")]
    server_cert: PathBuf,

    /// Target URL
    #[arg(long, env = "PEERPIN_URL", default_value = "https://localhost:8443/hello")]
    url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Request(args) => cmd_request(args).await,
    };

    if let Err(e) = &result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

async fn cmd_request(args: RequestArgs) -> Result<()> {
    // Everything is loaded before the first packet is sent
    let target = Target::parse(&args.url)?;
    let identity = ClientIdentity::load_pem(&args.cert, &args.key)?;
    let pinned = PinnedCertificate::load(&args.server_cert)?;
    tracing::info!(
        server_cert = %args.server_cert.display(),
        fingerprint = %pinned.fingerprint(),
        "Pinned server certificate"
    );
    let config = build_pinned_config(identity, &pinned)?;

    let reply = Client::new(config)
        .get(&target)
        .await
        .with_context(|| format!("Request to {} failed", args.url))?;

    if !reply.status.is_success() {
        tracing::warn!(status = %reply.status, "Server returned an error status");
    }
    print!("{}", reply.body);
    Ok(())
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
    fn test_request_defaults() {
        let cli = Cli::try_parse_from(["peerpin", "request"]).unwrap();
        let Commands::Request(args) = cli.command;

        assert_eq!(args.cert, PathBuf::from("certs/client.crt"));
        assert_eq!(args.server_cert, PathBuf::from("certs/server.crt"));
        assert_eq!(args.url, "https://localhost:8443/hello");
    }
}
