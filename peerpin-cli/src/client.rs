//! One-shot HTTPS request over the pinned mTLS connection.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::header::HOST;
use hyper::{Request, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use rustls::ClientConfig;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

const DEFAULT_HTTPS_PORT: u16 = 443;

/// Where a request goes: `https://host[:port]/path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    /// Path and query, always starting with `/`
    pub path: String,
}

impl Target {
    pub fn parse(url: &str) -> Result<Self> {
        let uri: Uri = url.parse().with_context(|| format!("Invalid URL: {url}"))?;

        anyhow::ensure!(
            uri.scheme_str() == Some("https"),
            "Only https:// URLs are supported: {url}"
        );
        let host = uri
            .host()
            .with_context(|| format!("URL has no host: {url}"))?
            // IPv6 literals come back bracketed
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = uri.port_u16().unwrap_or(DEFAULT_HTTPS_PORT);
        let path = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .filter(|pq| pq.starts_with('/'))
            .unwrap_or("/")
            .to_string();

        Ok(Self { host, port, path })
    }

    fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
}

/// Connecting-role dialer.
#[derive(Clone)]
pub struct Client {
    connector: TlsConnector,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            connector: TlsConnector::from(Arc::new(config)),
        }
    }

    /// Connect, complete the pinned handshake, and `GET` the target path.
    pub async fn get(&self, target: &Target) -> Result<Reply> {
        let authority = target.authority();
        let tcp = TcpStream::connect(authority.as_str())
            .await
            .with_context(|| format!("Failed to connect to {authority}"))?;

        let server_name = ServerName::try_from(target.host.clone())
            .map_err(|e| anyhow::anyhow!("Invalid server name {}: {}", target.host, e))?;
        let tls = self
            .connector
            .connect(server_name, tcp)
            .await
            .context("TLS handshake failed")?;
        tracing::debug!(server = %authority, "mTLS handshake complete");

        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(tls))
            .await
            .context("HTTP handshake failed")?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(error = %e, "HTTP connection ended with error");
            }
        });

        let request = Request::get(target.path.as_str())
            .header(HOST, authority.as_str())
            .body(Empty::<Bytes>::new())
            .context("Failed to build request")?;
        let response = sender
            .send_request(request)
            .await
            .context("Request failed (the server may have rejected the client certificate)")?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .context("Failed to read response body")?
            .to_bytes();

        Ok(Reply {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_url() {
        let target = Target::parse("https://localhost:8443/hello").unwrap();

        assert_eq!(
            target,
            Target {
                host: "localhost".to_string(),
                port: 8443,
                path: "/hello".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_defaults() {
        let target = Target::parse("https://example.com").unwrap();

        assert_eq!(target.port, 443);
        assert_eq!(target.path, "/");
    }

    #[test]
    fn test_parse_query_kept() {
        let target = Target::parse("https://localhost:8443/hello?x=1").unwrap();

        assert_eq!(target.path, "/hello?x=1");
    }

    #[test]
    fn test_parse_ipv6() {
        let target = Target::parse("https://[::1]:8443/").unwrap();

        assert_eq!(target.host, "::1");
        assert_eq!(target.authority(), "[::1]:8443");
    }

    #[test]
    fn test_plain_http_rejected() {
        let err = Target::parse("http://localhost:8443/hello").unwrap_err();

        assert!(err.to_string().contains("https://"));
    }

    #[test]
    fn test_client_debug() {
        let config = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_root_certificates(rustls::RootCertStore::empty())
        .with_no_client_auth();

        let client = Client::new(config);

        assert_eq!(format!("{client:?}"), "Client { .. }");
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(Target::parse("not a url").is_err());
    }
}
