//! Test harness: a live mTLS listener on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use peerpin_auth::Registry;
use peerpin_daemon::tls::{build_self_signed, CertParams, GeneratedCert, TlsServerConfig};
use peerpin_daemon::Server;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;

/// Listener running in the background until [`TestServer::shutdown`].
pub struct TestServer {
    pub addr: SocketAddr,
    pub server_cert: GeneratedCert,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server whose known-peers file has the given contents.
    pub async fn start(known_peers: &str) -> Self {
        Self::start_with_timeout(known_peers, peerpin_daemon::server::TLS_HANDSHAKE_TIMEOUT).await
    }

    pub async fn start_with_timeout(known_peers: &str, handshake_timeout: Duration) -> Self {
        let (registry, malformed) = Registry::parse(known_peers);
        assert!(malformed.is_empty(), "test registry is malformed: {malformed:?}");

        let server_cert = build_self_signed(&CertParams::default()).unwrap();
        let config =
            TlsServerConfig::with_known_peers(server_cert.tls_identity(), Arc::new(registry))
                .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = Server::from_listener(listener, config.acceptor())
            .with_handshake_timeout(handshake_timeout);
        let addr = server.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(async {
            let _ = shutdown_rx.await;
        }));

        Self {
            addr,
            server_cert,
            shutdown_tx,
            handle,
        }
    }

    /// Stop accepting and wait for the serve loop to return.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("server did not stop")
            .unwrap();
    }
}

/// Generate a client certificate with the given common name.
pub fn client_cert(name: &str) -> GeneratedCert {
    build_self_signed(&CertParams {
        common_name: name.to_string(),
        ..Default::default()
    })
    .unwrap()
}

/// Client config trusting exactly `server`, optionally presenting `client`.
pub fn client_config(server: &GeneratedCert, client: Option<&GeneratedCert>) -> Arc<ClientConfig> {
    let mut roots = RootCertStore::empty();
    roots.add(server.cert_der.clone()).unwrap();

    let builder = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .unwrap()
    .with_root_certificates(roots);

    let config = match client {
        Some(client) => {
            let identity = client.tls_identity();
            builder
                .with_client_auth_cert(identity.cert_chain, identity.key)
                .unwrap()
        }
        None => builder.with_no_client_auth(),
    };
    Arc::new(config)
}

/// Send `GET /hello` and return the raw HTTP response.
pub async fn get_hello(config: Arc<ClientConfig>, addr: SocketAddr) -> std::io::Result<String> {
    let tcp = TcpStream::connect(addr).await?;
    let server_name = ServerName::try_from("localhost").unwrap();
    let mut tls = TlsConnector::from(config).connect(server_name, tcp).await?;

    tls.write_all(b"GET /hello HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await?;

    let mut response = Vec::new();
    tls.read_to_end(&mut response).await?;
    Ok(String::from_utf8_lossy(&response).into_owned())
}
