//! Blocking request/response client.

use std::io::{self, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::codec::{decode, decode_from_reader};
use crate::error::{DecodeError, RpcError};
use crate::model::Graph;
use crate::rpc::{ClientConfig, Protocol, read_message, write_message};

/// Client side of a remote function.
///
/// The connection is opened lazily and kept between calls. A transient
/// failure drops it; the next attempt dials again.
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    conn: Option<TcpStream>,
}

impl Client {
    /// Creates a client without connecting.
    pub fn new(config: ClientConfig) -> Self {
        Self { config, conn: None }
    }

    /// Creates a client and dials `host` right away.
    pub fn connect(host: impl Into<String>) -> Result<Self, RpcError> {
        let mut client = Self::new(ClientConfig::new(host));
        client.dial()?;
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Opens a fresh connection, closing any current one.
    pub fn dial(&mut self) -> Result<(), RpcError> {
        self.close();
        self.conn = Some(self.open()?);
        Ok(())
    }

    /// Closes the connection, if open.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            let _ = conn.shutdown(std::net::Shutdown::Both);
        }
    }

    /// Sends `request` and returns the response graph.
    ///
    /// Dial and I/O failures are retried up to `retries` more times on a new
    /// connection. A malformed or empty response is returned at once.
    pub fn call(&mut self, request: &Graph) -> Result<Graph, RpcError> {
        let payload = request.binary()?;
        let mut attempt = 0;
        loop {
            match self.attempt(&payload) {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() => {
                    self.close();
                    if attempt >= self.config.retries {
                        return Err(err);
                    }
                    attempt += 1;
                    tracing::warn!(
                        host = %self.config.host,
                        attempt,
                        error = %err,
                        "remote call failed, retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn attempt(&mut self, payload: &[u8]) -> Result<Graph, RpcError> {
        let protocol = self.config.protocol;
        let conn = self.stream()?;
        let response = match protocol {
            Protocol::V2 => {
                write_message(conn, payload)?;
                let body = read_message(conn)?;
                if body.is_empty() {
                    return Err(RpcError::EmptyResponse);
                }
                decode(&body)?
            }
            Protocol::V1 => {
                conn.write_all(payload)?;
                conn.flush()?;
                decode_from_reader(&mut *conn).map_err(stream_failure)?
            }
        };
        if response.is_nil() && response.is_empty() {
            return Err(RpcError::EmptyResponse);
        }
        Ok(response)
    }

    fn stream(&mut self) -> Result<&mut TcpStream, RpcError> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => self.open()?,
        };
        Ok(self.conn.insert(conn))
    }

    fn open(&self) -> Result<TcpStream, RpcError> {
        let host = &self.config.host;
        let connect_error = |source| RpcError::Connect {
            host: host.clone(),
            source,
        };
        let timeout = deadline(self.config.timeout);

        let mut last = io::Error::new(io::ErrorKind::InvalidInput, "host resolved to no address");
        for addr in host.to_socket_addrs().map_err(connect_error)? {
            let attempt = match timeout {
                Some(t) => TcpStream::connect_timeout(&addr, t),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    stream.set_read_timeout(timeout)?;
                    stream.set_write_timeout(timeout)?;
                    stream.set_nodelay(true)?;
                    tracing::debug!(host = %host, %addr, "connected");
                    return Ok(stream);
                }
                Err(err) => last = err,
            }
        }
        Err(connect_error(last))
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}

fn deadline(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}

/// A V1 response cut short by the connection is an I/O failure.
fn stream_failure(err: DecodeError) -> RpcError {
    match err {
        DecodeError::Io(message) => RpcError::Io(io::Error::other(message)),
        DecodeError::UnexpectedEof { context } => RpcError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("connection closed while reading {context}"),
        )),
        other => RpcError::Decode(other),
    }
}
