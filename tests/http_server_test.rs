//! HTTP frontend tests against a real loopback socket.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use templog::data::{LogKind, LogStore};
use templog::network::{log_routes, HttpServer, ServerOptions, StaticFiles};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Duration;

fn store(dir: &Path) -> LogStore {
    let store = LogStore::new(dir.join("logs"), "all.log", "hour.log", "day.log");
    store.prepare().unwrap();
    store
}

/// Bind on an ephemeral port and serve in the background.
async fn start(dir: &Path) -> SocketAddr {
    let html = dir.join("html");
    fs::create_dir_all(&html).unwrap();

    let router = log_routes(store(dir), StaticFiles::new(vec![html], "temperature.html"));
    let options = ServerOptions {
        read_wait: Duration::from_millis(100),
        buffer_size: 1024,
        ..ServerOptions::default()
    };
    let server = HttpServer::bind("127.0.0.1:0", router, options).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve());
    addr
}

async fn send(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();
    String::from_utf8(reply).unwrap()
}

#[tokio::test]
async fn test_all_route_returns_raw_body() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("logs")).unwrap();
    fs::write(dir.path().join("logs/all.log"), "100 23.5\n").unwrap();
    let addr = start(dir.path()).await;

    let reply = send(addr, "GET /all HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply, "100 23.5\n");
}

#[tokio::test]
async fn test_hour_and_day_routes_follow_their_files() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start(dir.path()).await;
    let store = store(dir.path());

    assert_eq!(send(addr, "GET /hour HTTP/1.1\r\n\r\n").await, "");

    fs::write(store.path(LogKind::Hourly), "3600 21.25\n7200 22\n").unwrap();
    fs::write(store.path(LogKind::Daily), "86400 19.5\n").unwrap();

    assert_eq!(
        send(addr, "GET /hour?since=0 HTTP/1.1\r\nHost: localhost\r\n\r\n").await,
        "3600 21.25\n7200 22\n"
    );
    assert_eq!(send(addr, "GET /day HTTP/1.0\r\n\r\n").await, "86400 19.5\n");
}

#[tokio::test]
async fn test_unknown_path_is_html_404() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start(dir.path()).await;

    let reply = send(addr, "GET /missing.html HTTP/1.1\r\n\r\n").await;
    let (head, body) = reply.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("HTTP/1.1 404"), "{head}");
    assert!(head.contains("Content-Type: text/html"));
    assert!(head.contains(&format!("Content-Length: {}", body.len())));
    assert!(body.contains("<html>"));
}

#[tokio::test]
async fn test_non_get_on_log_route_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start(dir.path()).await;

    let reply = send(addr, "POST /all HTTP/1.1\r\n\r\n").await;
    assert!(reply.starts_with("HTTP/1.1 404"));
}

#[tokio::test]
async fn test_static_index_page() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start(dir.path()).await;
    let page = "<html><body>chart</body></html>";
    fs::write(dir.path().join("html/temperature.html"), page).unwrap();

    let reply = send(addr, "GET / HTTP/1.1\r\n\r\n").await;
    assert_eq!(
        reply,
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{page}",
            page.len()
        )
    );
}

#[tokio::test]
async fn test_traversal_is_404() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("secret.txt"), "secret").unwrap();
    let addr = start(dir.path()).await;

    let reply = send(addr, "GET /../secret.txt HTTP/1.1\r\n\r\n").await;
    assert!(reply.starts_with("HTTP/1.1 404"));
    assert!(!reply.contains("secret"));
}

#[tokio::test]
async fn test_malformed_request_gets_no_reply() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start(dir.path()).await;

    assert_eq!(send(addr, "GARBAGE\r\n\r\n").await, "");
    // The server is still accepting
    assert_eq!(send(addr, "GET /all HTTP/1.1\r\n\r\n").await, "");
}

#[tokio::test]
async fn test_silent_client_is_dropped_and_next_client_served() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("logs")).unwrap();
    fs::write(dir.path().join("logs/all.log"), "1 2\n").unwrap();
    let addr = start(dir.path()).await;

    let mut silent = TcpStream::connect(addr).await.unwrap();
    let mut nothing = Vec::new();
    silent.read_to_end(&mut nothing).await.unwrap();
    assert!(nothing.is_empty());

    assert_eq!(send(addr, "GET /all HTTP/1.1\r\n\r\n").await, "1 2\n");
}

#[tokio::test]
async fn test_sequential_clients_each_get_one_response() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("logs")).unwrap();
    fs::write(dir.path().join("logs/day.log"), "5 6\n").unwrap();
    let addr = start(dir.path()).await;

    let clients: Vec<_> = (0..5)
        .map(|_| tokio::spawn(send(addr, "GET /day HTTP/1.1\r\n\r\n")))
        .collect();
    for client in clients {
        assert_eq!(client.await.unwrap(), "5 6\n");
    }
}
