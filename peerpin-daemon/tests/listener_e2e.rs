//! End-to-end tests for the mTLS listener.

mod common;

use std::time::Duration;

use common::harness::{client_cert, client_config, get_hello, TestServer};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

fn rejected(result: &std::io::Result<String>) -> bool {
    match result {
        Ok(response) => !response.contains("Hello"),
        Err(_) => true,
    }
}

#[tokio::test]
async fn test_registered_client_is_greeted() {
    let client = client_cert("my_secure_client");
    let server = TestServer::start(&client.registry_line()).await;

    let response = get_hello(client_config(&server.server_cert, Some(&client)), server.addr)
        .await
        .unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.ends_with("Hello, authenticated client 'my_secure_client'!\n"));
    server.shutdown().await;
}

#[tokio::test]
async fn test_client_without_certificate_rejected() {
    let client = client_cert("my_secure_client");
    let server = TestServer::start(&client.registry_line()).await;

    let result = get_hello(client_config(&server.server_cert, None), server.addr).await;

    assert!(rejected(&result));
    server.shutdown().await;
}

#[tokio::test]
async fn test_unregistered_client_rejected() {
    let registered = client_cert("my_secure_client");
    let stranger = client_cert("stranger");
    let server = TestServer::start(&registered.registry_line()).await;

    let result = get_hello(client_config(&server.server_cert, Some(&stranger)), server.addr).await;

    assert!(rejected(&result));
    server.shutdown().await;
}

#[tokio::test]
async fn test_impostor_with_registered_name_rejected() {
    let registered = client_cert("my_secure_client");
    let impostor = client_cert("my_secure_client");
    let server = TestServer::start(&registered.registry_line()).await;

    let result = get_hello(client_config(&server.server_cert, Some(&impostor)), server.addr).await;

    assert!(rejected(&result));
    server.shutdown().await;
}

#[tokio::test]
async fn test_lowercase_registry_fingerprint_accepted() {
    let client = client_cert("my_secure_client");
    let line = format!(
        "my_secure_client {}",
        client.fingerprint.to_string().to_lowercase()
    );
    let server = TestServer::start(&line).await;

    let response = get_hello(client_config(&server.server_cert, Some(&client)), server.addr)
        .await
        .unwrap();

    assert!(response.contains("Hello, authenticated client 'my_secure_client'!"));
    server.shutdown().await;
}

#[tokio::test]
async fn test_listener_survives_rejections() {
    let good = client_cert("alice");
    let bad = client_cert("mallory");
    let server = TestServer::start(&good.registry_line()).await;

    for _ in 0..3 {
        let result = get_hello(client_config(&server.server_cert, Some(&bad)), server.addr).await;
        assert!(rejected(&result));
    }
    let response = get_hello(client_config(&server.server_cert, Some(&good)), server.addr)
        .await
        .unwrap();

    assert!(response.contains("Hello, authenticated client 'alice'!"));
    server.shutdown().await;
}

#[tokio::test]
async fn test_stalled_handshake_is_dropped() {
    let server = TestServer::start_with_timeout("", Duration::from_millis(200)).await;

    let mut stalled = TcpStream::connect(server.addr).await.unwrap();
    let mut buf = [0u8; 16];
    let read = tokio::time::timeout(Duration::from_secs(5), stalled.read(&mut buf))
        .await
        .expect("server kept a stalled connection open");

    // Closed (0 bytes) or reset, either way nothing was served
    assert!(matches!(read, Ok(0) | Err(_)));
    server.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_with_idle_listener() {
    let server = TestServer::start("").await;

    server.shutdown().await;
}
