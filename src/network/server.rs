//! Sequential HTTP server.
//!
//! One connection at a time: accept, read the request, dispatch through the [`Router`],
//! write exactly one response, close. A second client waits in the listen backlog until
//! the current one is closed.

use super::request::Request;
use super::router::Router;
use crate::config::ServerConfig;
use crate::error::{Result, TemplogError};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

const DEFAULT_READ_WAIT_MS: u64 = 50;
const DEFAULT_WRITE_WAIT_MS: u64 = 5000;
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Pause after a failed `accept` so a persistent error (e.g. out of file descriptors)
/// does not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Per-connection I/O limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerOptions {
    /// Wait for request bytes before giving up on the client
    pub read_wait: Duration,
    /// Wait for the client to take the whole response before dropping it
    pub write_wait: Duration,
    /// Receive buffer size; a read shorter than this ends the request
    pub buffer_size: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            read_wait: Duration::from_millis(DEFAULT_READ_WAIT_MS),
            write_wait: Duration::from_millis(DEFAULT_WRITE_WAIT_MS),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ServerOptions {
    /// Limits from `[server]`. A zero buffer size is raised to one byte.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            read_wait: Duration::from_millis(config.read_wait_ms),
            write_wait: Duration::from_millis(config.write_wait_ms),
            buffer_size: config.read_buffer_size.max(1),
        }
    }
}

/// A bound listener plus the route table it answers with.
pub struct HttpServer {
    listener: TcpListener,
    router: Arc<Router>,
    options: ServerOptions,
}

impl HttpServer {
    /// Bind the listening socket. Failure here is fatal for the serving loop.
    pub async fn bind(addr: &str, router: Router, options: ServerOptions) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TemplogError::Socket {
                addr: addr.to_string(),
                source,
            })?;
        info!(addr, "HTTP server listening");

        Ok(Self {
            listener,
            router: Arc::new(router),
            options,
        })
    }

    /// Address actually bound, useful when the configured port is 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and answer connections forever.
    pub async fn serve(self) -> Result<()> {
        loop {
            let (socket, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            };
            debug!(%peer, "Client connected");
            if let Err(e) = self.handle_connection(socket, peer).await {
                warn!(%peer, error = %e, "Connection failed");
            }
        }
    }

    /// Accept one connection and handle it to completion.
    pub async fn serve_one(&self) -> Result<()> {
        let (socket, peer) = self.listener.accept().await?;
        debug!(%peer, "Client connected");
        self.handle_connection(socket, peer).await
    }

    async fn handle_connection(&self, mut socket: TcpStream, peer: SocketAddr) -> Result<()> {
        let raw = read_request(&mut socket, self.options).await?;
        if raw.is_empty() {
            debug!(%peer, "No request received, closing");
            return Ok(());
        }

        let text = String::from_utf8_lossy(&raw).into_owned();
        let request = match Request::parse(&text) {
            Ok(request) => request,
            Err(e) => {
                warn!(%peer, error = %e, "Dropping connection");
                return Ok(());
            }
        };
        debug!(%peer, method = %request.method, path = %request.path, "Request");

        // Handlers read log files synchronously
        let router = Arc::clone(&self.router);
        let response = tokio::task::spawn_blocking(move || router.dispatch(&request))
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        let reply = response.render();
        timeout(self.options.write_wait, socket.write_all(&reply))
            .await
            .map_err(|_| std::io::Error::new(ErrorKind::TimedOut, "client stopped reading"))??;
        socket.shutdown().await?;
        debug!(%peer, status = ?response.status(), "Reply sent");
        Ok(())
    }
}

/// Collect request bytes until a short read, end of stream, or the read wait expires.
async fn read_request(socket: &mut TcpStream, options: ServerOptions) -> Result<Vec<u8>> {
    if timeout(options.read_wait, socket.readable()).await.is_err() {
        return Ok(Vec::new());
    }

    let mut request = Vec::new();
    let mut buf = vec![0u8; options.buffer_size];
    loop {
        let n = match timeout(options.read_wait, socket.read(&mut buf)).await {
            Ok(read) => read?,
            Err(_) => break,
        };
        request.extend_from_slice(&buf[..n]);
        if n < buf.len() {
            break;
        }
    }
    Ok(request)
}
