//! OVSDB Connection Management
//!
//! This module handles the persistent JSON-RPC session with `ovsdb-server`.
//! A single long-lived connection is reused across calls and re-established lazily
//! after any failure, including a call that was cancelled mid-flight.
//!
//! Messages are concatenated JSON values with no delimiter, so incoming bytes are
//! buffered until a complete value can be decoded.

use crate::error::{ExporterError, Result};
use crate::ovsdb::types::{JsonRpcMessage, JsonRpcRequest, JsonRpcResponse};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info};

const READ_CHUNK: usize = 64 * 1024;

/// Where `ovsdb-server` listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `unix:<path>`
    Unix(PathBuf),
    /// `tcp:<host>:<port>`
    Tcp(String),
}

impl FromStr for Endpoint {
    type Err = ExporterError;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(ExporterError::Endpoint(format!("missing socket path in {:?}", s)));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }

        if let Some(addr) = s.strip_prefix("tcp:") {
            let (host, port) = addr
                .rsplit_once(':')
                .ok_or_else(|| ExporterError::Endpoint(format!("missing port in {:?}", s)))?;
            if host.is_empty() || port.parse::<u16>().is_err() {
                return Err(ExporterError::Endpoint(format!(
                    "expected tcp:<host>:<port>, got {:?}",
                    s
                )));
            }
            return Ok(Endpoint::Tcp(addr.to_string()));
        }

        Err(ExporterError::Endpoint(format!(
            "unsupported endpoint {:?} (expected unix:<path> or tcp:<host>:<port>)",
            s
        )))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "tcp:{}", addr),
        }
    }
}

trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// Decode the first complete JSON value in `buffer`, removing its bytes
///
/// Returns `Ok(None)` when more bytes are needed.
pub fn decode_message(buffer: &mut Vec<u8>) -> Result<Option<Value>> {
    let Some(start) = buffer.iter().position(|b| !b.is_ascii_whitespace()) else {
        buffer.clear();
        return Ok(None);
    };

    let decoded = {
        let mut values = serde_json::Deserializer::from_slice(&buffer[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) => Some((value, start + values.byte_offset())),
            Some(Err(e)) if e.is_eof() => None,
            Some(Err(e)) => return Err(e.into()),
            None => None,
        }
    };

    Ok(decoded.map(|(value, consumed)| {
        buffer.drain(..consumed);
        value
    }))
}

/// An open session with the server
struct ActiveConnection {
    stream: Box<dyn Transport>,
    /// Bytes received but not yet decoded
    buffer: Vec<u8>,
    read_buf: Box<[u8]>,
}

impl ActiveConnection {
    async fn open(endpoint: &Endpoint) -> Result<Self> {
        let stream: Box<dyn Transport> = match endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => Box::new(tokio::net::UnixStream::connect(path).await?),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => {
                return Err(ExporterError::Endpoint(
                    "unix sockets are not supported on this platform".to_string(),
                ))
            }
            Endpoint::Tcp(addr) => Box::new(TcpStream::connect(addr).await?),
        };

        Ok(Self {
            stream,
            buffer: Vec::new(),
            read_buf: vec![0u8; READ_CHUNK].into_boxed_slice(),
        })
    }

    async fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let bytes = serde_json::to_vec(message)?;
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<JsonRpcMessage> {
        loop {
            if let Some(value) = decode_message(&mut self.buffer)? {
                return Ok(serde_json::from_value(value)?);
            }

            let n = self.stream.read(&mut self.read_buf).await?;
            if n == 0 {
                return Err(ExporterError::Ovsdb(
                    "Connection closed by server".to_string(),
                ));
            }
            self.buffer.extend_from_slice(&self.read_buf[..n]);
        }
    }
}

/// Manages a persistent JSON-RPC connection to `ovsdb-server`
pub struct ConnectionManager {
    endpoint: Endpoint,
    connection: Mutex<Option<ActiveConnection>>,
    request_id: AtomicU64,
}

impl ConnectionManager {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            connection: Mutex::new(None),
            request_id: AtomicU64::new(0),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Open the connection now instead of on first use
    pub async fn connect(&self) -> Result<()> {
        let mut conn_guard = self.connection.lock().await;
        if conn_guard.is_none() {
            info!("Connecting to OVSDB at {}", self.endpoint);
            *conn_guard = Some(ActiveConnection::open(&self.endpoint).await?);
        }
        Ok(())
    }

    /// Execute one JSON-RPC call on the persistent connection
    ///
    /// The connection is taken out of the mutex for the duration of the call and only
    /// put back once a matching response was read. Any error, or the future being
    /// dropped, leaves the slot empty so the next call reconnects.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let mut conn_guard = self.connection.lock().await;
        let mut conn = match conn_guard.take() {
            Some(conn) => conn,
            None => {
                info!("Connecting to OVSDB at {}", self.endpoint);
                ActiveConnection::open(&self.endpoint).await?
            }
        };

        let id = Value::from(self.next_id());
        let request = JsonRpcRequest {
            method: method.to_string(),
            params,
            id: id.clone(),
        };
        debug!("Sending request: {}", method);
        conn.send(&request).await?;

        let response = loop {
            let message = conn.receive().await?;
            match message.method.as_deref() {
                Some("echo") => {
                    debug!("Answering echo from server");
                    let reply = JsonRpcResponse {
                        result: message.params,
                        error: Value::Null,
                        id: message.id,
                    };
                    conn.send(&reply).await?;
                }
                Some(other) => debug!("Ignoring server message: {}", other),
                None if message.id == id => break message,
                None => debug!("Discarding response to stale request {}", message.id),
            }
        };

        *conn_guard = Some(conn);

        if !response.error.is_null() {
            return Err(ExporterError::Ovsdb(format!(
                "{} failed: {}",
                method, response.error
            )));
        }

        Ok(response.result)
    }

    /// Close the connection
    pub async fn close(&self) {
        let mut conn_guard = self.connection.lock().await;
        if let Some(mut conn) = conn_guard.take() {
            let _ = conn.stream.shutdown().await;
            info!("OVSDB connection closed");
        }
    }
}
