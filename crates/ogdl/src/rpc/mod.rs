//! Remote function calls: one encoded graph out, one encoded graph back,
//! over TCP.
//!
//! Protocol V2 frames every payload with a 4-byte big-endian length.
//! Protocol V1 sends the bare binary stream and relies on the codec's end
//! marker to find the end of the response.

mod client;

use std::io::{self, Read, Write};
use std::time::Duration;

pub use client::Client;

use crate::error::RpcError;
use crate::limits::MAX_MESSAGE_SIZE;

/// Default per-attempt read/write deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of additional attempts after a transient failure.
pub const DEFAULT_RETRIES: u32 = 2;

/// Wire framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// Unframed codec stream.
    V1,
    /// Length-prefixed codec payload.
    #[default]
    V2,
}

/// Client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// `host:port` to dial.
    pub host: String,
    /// Bounds the dial and each read and write. Zero disables the deadline.
    pub timeout: Duration,
    pub protocol: Protocol,
    /// Additional attempts after a transient failure.
    pub retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            timeout: DEFAULT_TIMEOUT,
            protocol: Protocol::default(),
            retries: DEFAULT_RETRIES,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// Writes one V2 frame: big-endian length, then the payload.
pub fn write_message<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), RpcError> {
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(RpcError::MessageTooLarge {
            len: payload.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Reads one V2 frame and returns its payload.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Vec<u8>, RpcError> {
    let mut len = [0u8; 4];
    reader.read_exact(&mut len)?;
    let len = u32::from_be_bytes(len) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(RpcError::MessageTooLarge {
            len,
            max: MAX_MESSAGE_SIZE,
        });
    }
    let mut payload = Vec::new();
    reader.take(len as u64).read_to_end(&mut payload)?;
    if payload.len() < len {
        return Err(RpcError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("message truncated at {} of {len} bytes", payload.len()),
        )));
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roundtrip() {
        let mut wire = Vec::new();
        write_message(&mut wire, b"hello").unwrap();
        assert_eq!(&wire[..4], &[0, 0, 0, 5]);
        assert_eq!(read_message(&mut wire.as_slice()).unwrap(), b"hello");
    }

    #[test]
    fn test_truncated_frame() {
        let wire = [0u8, 0, 0, 9, 1, 2];
        let err = read_message(&mut &wire[..]).unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_oversized_frame() {
        let wire = u32::MAX.to_be_bytes();
        assert!(matches!(
            read_message(&mut &wire[..]),
            Err(RpcError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new("127.0.0.1:1135")
            .with_protocol(Protocol::V1)
            .with_retries(0)
            .with_timeout(Duration::from_secs(1));
        assert_eq!(config.host, "127.0.0.1:1135");
        assert_eq!(config.protocol, Protocol::V1);
        assert_eq!(config.retries, 0);

        let defaults = ClientConfig::default();
        assert_eq!(defaults.timeout, DEFAULT_TIMEOUT);
        assert_eq!(defaults.protocol, Protocol::V2);
        assert_eq!(defaults.retries, 2);
    }
}
