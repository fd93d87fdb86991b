//! mTLS listener serving HTTP/1.1 to authorized peers.
//!
//! Each accepted TCP connection gets its own task: the TLS handshake (bounded
//! by a timeout) runs the known-peers verifier, then hyper serves the stream
//! with the verified [`PeerInfo`] attached. A failed connection is logged and
//! dropped; the accept loop keeps running until the shutdown future resolves.

use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use peerpin_auth::VerifyError;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;

use crate::tls::{log_rejection, PeerInfo};

/// Connections that don't complete the TLS handshake within this time are
/// dropped.
pub const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long in-flight connections may run after shutdown is requested.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Accepting-role listener.
pub struct Server {
    listener: TcpListener,
    acceptor: TlsAcceptor,
    handshake_timeout: Duration,
}

impl Server {
    /// Bind a listener on `addr`.
    pub async fn bind(addr: SocketAddr, acceptor: TlsAcceptor) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, acceptor))
    }

    pub fn from_listener(listener: TcpListener, acceptor: TlsAcceptor) -> Self {
        Self {
            listener,
            acceptor,
            handshake_timeout: TLS_HANDSHAKE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// After shutdown, in-flight connections get [`SHUTDOWN_GRACE_PERIOD`]
    /// to finish before they are aborted.
    pub async fn serve(self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((tcp_stream, peer_addr)) => {
                            connections.spawn(handle_connection(
                                self.acceptor.clone(),
                                tcp_stream,
                                peer_addr,
                                self.handshake_timeout,
                            ));
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "TCP accept failed");
                        }
                    }
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                () = &mut shutdown => {
                    tracing::info!("Shutdown signal received, stopping accept loop");
                    break;
                }
            }
        }

        drain(connections).await;
    }
}

async fn drain(mut connections: JoinSet<()>) {
    if connections.is_empty() {
        return;
    }
    tracing::info!(
        in_flight = connections.len(),
        grace_secs = SHUTDOWN_GRACE_PERIOD.as_secs(),
        "Waiting for in-flight connections"
    );
    let finished = tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, async {
        while connections.join_next().await.is_some() {}
    })
    .await;
    if finished.is_err() {
        tracing::warn!(
            remaining = connections.len(),
            "Grace period elapsed, aborting connections"
        );
        connections.abort_all();
    }
}

async fn handle_connection(
    acceptor: TlsAcceptor,
    tcp_stream: TcpStream,
    peer_addr: SocketAddr,
    handshake_timeout: Duration,
) {
    let tls_stream =
        match tokio::time::timeout(handshake_timeout, acceptor.accept(tcp_stream)).await {
            Ok(Ok(tls_stream)) => tls_stream,
            Ok(Err(e)) => {
                log_handshake_failure(peer_addr, &e);
                return;
            }
            Err(_) => {
                tracing::warn!(peer = %peer_addr, timeout = ?handshake_timeout, "mTLS handshake timed out");
                return;
            }
        };

    let Some(peer) = PeerInfo::from_session(peer_addr, tls_stream.get_ref().1) else {
        tracing::warn!(peer = %peer_addr, "Handshake completed without a readable client certificate");
        return;
    };
    tracing::info!(peer = %peer_addr, name = %peer.name, "mTLS session established");

    let service = service_fn(move |request| {
        let response = hello(&peer, &request);
        async move { Ok::<_, Infallible>(response) }
    });

    if let Err(e) = http1::Builder::new()
        .serve_connection(TokioIo::new(tls_stream), service)
        .await
    {
        tracing::debug!(peer = %peer_addr, error = %e, "HTTP connection ended with error");
    }
}

fn log_handshake_failure(peer_addr: SocketAddr, error: &io::Error) {
    let tls_error = error
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>());

    // rustls rejects an empty certificate message before the verifier runs
    if matches!(tls_error, Some(rustls::Error::NoCertificatesPresented)) {
        log_rejection(&VerifyError::CredentialAbsent);
    }
    tracing::warn!(peer = %peer_addr, error = %error, "mTLS handshake failed");
}

/// Greet the verified peer, whatever the path.
pub fn hello<B>(peer: &PeerInfo, request: &Request<B>) -> Response<Full<Bytes>> {
    tracing::info!(
        name = %peer.name,
        method = %request.method(),
        path = request.uri().path(),
        "Request"
    );
    let body = format!("Hello, authenticated client '{}'!\n", peer.name);
    let mut response = Response::new(Full::new(Bytes::from(body)));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
