//! IPC Server for the Pomodoro Timer.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - One JSON request (`{"command":"toggle"}`) per connection
//! - Dispatch onto the engine runner, which serializes commands with ticks

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

use crate::types::{Command, IpcRequest, IpcResponse, ResponseData};

use super::runner::EngineHandle;

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (4KB)
const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF_MS: u64 = 100;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Another daemon is already listening on the socket
    #[error("Another daemon is already listening on {0}")]
    AlreadyRunning(PathBuf),

    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Write error
    #[error("Failed to write response: {0}")]
    WriteError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
#[derive(Debug)]
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// A leftover socket file from a dead daemon is removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if a live daemon owns the socket or binding fails.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            if std::os::unix::net::UnixStream::connect(socket_path).is_ok() {
                return Err(IpcError::AlreadyRunning(socket_path.to_path_buf()).into());
            }
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove stale socket: {:?}", socket_path))?;
        }

        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Receives and deserializes an IPC request from the stream.
    ///
    /// Returns as soon as one complete JSON value has arrived, so clients
    /// may keep the connection open while waiting for the reply. Bounded by
    /// a timeout and [`MAX_REQUEST_SIZE`].
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            Self::read_request(stream),
        )
        .await
        .map_err(|_| IpcError::Timeout)?
    }

    async fn read_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = Vec::with_capacity(256);
        let mut chunk = [0u8; 512];

        loop {
            let n = stream
                .read(&mut chunk)
                .await
                .map_err(|e| IpcError::ReadError(e.to_string()))?;

            if n == 0 {
                if buffer.is_empty() {
                    anyhow::bail!("Connection closed by client");
                }
                return parse_request(&buffer)?
                    .context("Failed to deserialize IPC request: incomplete JSON");
            }

            buffer.extend_from_slice(&chunk[..n]);
            if buffer.len() > MAX_REQUEST_SIZE {
                return Err(IpcError::RequestTooLarge.into());
            }
            if let Some(request) = parse_request(&buffer)? {
                return Ok(request);
            }
        }
    }

    /// Serializes and sends an IPC response to the stream.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .map_err(|e| IpcError::WriteError(e.to_string()))?;
        stream
            .flush()
            .await
            .map_err(|e| IpcError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

/// Parses the first JSON value in `buffer`. `None` while it is incomplete.
fn parse_request(buffer: &[u8]) -> Result<Option<IpcRequest>> {
    let mut values = serde_json::Deserializer::from_slice(buffer).into_iter::<IpcRequest>();
    match values.next() {
        Some(Ok(request)) => Ok(Some(request)),
        Some(Err(e)) if e.is_eof() => Ok(None),
        Some(Err(e)) => Err(anyhow::Error::new(e).context("Failed to deserialize IPC request")),
        None => Ok(None),
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        // Clean up socket file on drop
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Translates IPC requests into engine commands.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    engine: EngineHandle,
}

impl RequestHandler {
    /// Creates a new request handler dispatching to `engine`.
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    /// Handles an IPC request and returns the appropriate response.
    ///
    /// Unknown tokens are rejected without touching the engine.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        let command: Command = match request.command.parse() {
            Ok(command) => command,
            Err(e) => {
                warn!(token = %request.command, "Rejected invalid command");
                return IpcResponse::error(e.to_string());
            }
        };

        match self.engine.dispatch(command).await {
            Ok(reply) => {
                let message = if reply.outcome.is_changed() || !command.is_mutating() {
                    format!("{command}: ok")
                } else {
                    format!("{command}: no change")
                };
                IpcResponse::success(message, Some(ResponseData::from_snapshot(&reply.snapshot)))
            }
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    /// Reads one request from `stream`, applies it and writes the reply.
    pub async fn handle_connection(&self, mut stream: UnixStream) -> Result<()> {
        let response = match IpcServer::receive_request(&mut stream).await {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                warn!(error = %e, "Bad IPC request");
                IpcResponse::error(format!("bad request: {e:#}"))
            }
        };
        IpcServer::send_response(&mut stream, &response).await
    }
}

/// Accepts connections forever, handling each on its own task.
pub async fn serve(server: IpcServer, handler: RequestHandler) {
    debug!(socket = %server.socket_path().display(), "IPC server listening");
    loop {
        match server.accept().await {
            Ok(stream) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    if let Err(e) = handler.handle_connection(stream).await {
                        debug!(error = %e, "IPC connection ended with error");
                    }
                });
            }
            Err(e) => {
                warn!(error = %e, "Failed to accept IPC connection");
                sleep(Duration::from_millis(ACCEPT_BACKOFF_MS)).await;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
