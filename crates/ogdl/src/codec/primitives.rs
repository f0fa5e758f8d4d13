//! Primitive encoding/decoding for the OGDL binary format.
//!
//! Implements the prefix varint, zigzag integers and fixed-width floats,
//! over both byte slices and `std::io::Read` streams.

use std::io::{self, Read};

use crate::error::{DecodeError, EncodeError};
use crate::limits::{MAX_VARINT, MAX_VARINT_BYTES};

// =============================================================================
// VARINT
// =============================================================================
//
// The lead byte announces the length:
//
//   0xxxxxxx                             7 bits   0 ..= 0x7F
//   10xxxxxx xxxxxxxx                   14 bits   ..= 0x3FFF
//   110xxxxx xxxxxxxx xxxxxxxx          21 bits   ..= 0x1F_FFFF
//   1110xxxx xxxxxxxx xxxxxxxx xxxxxxxx 28 bits   ..= 0x0FFF_FFFF
//
// Lead bytes 0xF0 and above are invalid. Decoding insists on the shortest form.

/// Largest value representable with `n + 1` bytes.
const VARINT_LIMITS: [u32; MAX_VARINT_BYTES] = [0x7F, 0x3FFF, 0x1F_FFFF, MAX_VARINT];

/// Length of the varint whose lead byte is `lead`, or `None` for an invalid lead.
#[inline]
fn varint_len(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0x80..=0xBF => Some(2),
        0xC0..=0xDF => Some(3),
        0xE0..=0xEF => Some(4),
        _ => None,
    }
}

/// Writes `value` into `buf`, returning the number of bytes used.
#[inline]
fn put_varint(value: u32, buf: &mut [u8; MAX_VARINT_BYTES]) -> usize {
    let be = value.to_be_bytes();
    if value <= VARINT_LIMITS[0] {
        buf[0] = be[3];
        1
    } else if value <= VARINT_LIMITS[1] {
        buf[0] = 0x80 | be[2];
        buf[1] = be[3];
        2
    } else if value <= VARINT_LIMITS[2] {
        buf[0] = 0xC0 | be[1];
        buf[1..3].copy_from_slice(&be[2..]);
        3
    } else {
        buf[0] = 0xE0 | be[0];
        buf[1..4].copy_from_slice(&be[1..]);
        4
    }
}

/// Reassembles a varint from its lead byte and continuation bytes.
#[inline]
fn assemble_varint(lead: u8, rest: &[u8]) -> Result<u32, DecodeError> {
    let mask = match rest.len() {
        0 => 0x7F,
        1 => 0x3F,
        2 => 0x1F,
        _ => 0x0F,
    };
    let value = rest
        .iter()
        .fold(u32::from(lead & mask), |acc, b| (acc << 8) | u32::from(*b));
    if !rest.is_empty() && value <= VARINT_LIMITS[rest.len() - 1] {
        return Err(DecodeError::VarintNotMinimal);
    }
    Ok(value)
}

/// Encodes a varint into a fresh buffer.
///
/// Negative values and values above [`MAX_VARINT`] are rejected without
/// producing output.
pub fn encode_varint(value: i64) -> Result<Vec<u8>, EncodeError> {
    let value = u32::try_from(value)
        .ok()
        .filter(|v| *v <= MAX_VARINT)
        .ok_or(EncodeError::VarintOutOfRange { value })?;
    let mut buf = [0u8; MAX_VARINT_BYTES];
    let len = put_varint(value, &mut buf);
    Ok(buf[..len].to_vec())
}

/// Decodes a varint from the start of `data`, returning the value and the
/// number of bytes consumed.
pub fn decode_varint(data: &[u8]) -> Result<(u32, usize), DecodeError> {
    let mut reader = Reader::new(data);
    let value = reader.read_varint("varint")?;
    Ok((value, reader.position()))
}

// =============================================================================
// DECODING
// =============================================================================

/// Source of bytes for the decoder.
pub trait ByteSource {
    /// Reads a single byte.
    fn read_byte(&mut self, context: &'static str) -> Result<u8, DecodeError>;

    /// Fills `buf` completely.
    fn read_into(&mut self, buf: &mut [u8], context: &'static str) -> Result<(), DecodeError>;

    /// Reads exactly `n` bytes into a new vector.
    fn read_vec(&mut self, n: usize, context: &'static str) -> Result<Vec<u8>, DecodeError> {
        let mut buf = vec![0u8; n];
        self.read_into(&mut buf, context)?;
        Ok(buf)
    }

    /// Reads a prefix varint in its shortest form.
    fn read_varint(&mut self, context: &'static str) -> Result<u32, DecodeError> {
        let lead = self.read_byte(context)?;
        let len = varint_len(lead).ok_or(DecodeError::InvalidVarintPrefix { byte: lead })?;
        let mut rest = [0u8; MAX_VARINT_BYTES - 1];
        self.read_into(&mut rest[..len - 1], context)?;
        assemble_varint(lead, &rest[..len - 1])
    }

    /// Reads a little-endian f64.
    fn read_f64(&mut self, context: &'static str) -> Result<f64, DecodeError> {
        let mut bytes = [0u8; 8];
        self.read_into(&mut bytes, context)?;
        Ok(f64::from_le_bytes(bytes))
    }
}

/// Reader for decoding binary data.
///
/// Wraps a byte slice and provides methods for reading primitives
/// with bounds checking and error handling.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current position in the data.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the remaining bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Returns the number of remaining bytes.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Reads exactly n bytes.
    #[inline]
    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining_len() {
            return Err(DecodeError::UnexpectedEof { context });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }
}

impl ByteSource for Reader<'_> {
    #[inline]
    fn read_byte(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(DecodeError::UnexpectedEof { context })?;
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn read_into(&mut self, buf: &mut [u8], context: &'static str) -> Result<(), DecodeError> {
        buf.copy_from_slice(self.read_bytes(buf.len(), context)?);
        Ok(())
    }

    fn read_vec(&mut self, n: usize, context: &'static str) -> Result<Vec<u8>, DecodeError> {
        self.read_bytes(n, context).map(<[u8]>::to_vec)
    }
}

/// Decoder input pulled from a stream, one structure at a time.
///
/// Nothing past the end of the decoded structure is consumed except what
/// the inner reader buffers itself.
#[derive(Debug)]
pub struct StreamReader<R> {
    inner: R,
}

impl<R: Read> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

fn stream_error(err: io::Error, context: &'static str) -> DecodeError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => DecodeError::UnexpectedEof { context },
        _ => DecodeError::Io(err.to_string()),
    }
}

impl<R: Read> ByteSource for StreamReader<R> {
    fn read_byte(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        let mut byte = [0u8; 1];
        self.read_into(&mut byte, context)?;
        Ok(byte[0])
    }

    fn read_into(&mut self, buf: &mut [u8], context: &'static str) -> Result<(), DecodeError> {
        self.inner
            .read_exact(buf)
            .map_err(|e| stream_error(e, context))
    }

    // Grows with the data actually received instead of trusting the length.
    fn read_vec(&mut self, n: usize, context: &'static str) -> Result<Vec<u8>, DecodeError> {
        let mut buf = Vec::new();
        (&mut self.inner)
            .take(n as u64)
            .read_to_end(&mut buf)
            .map_err(|e| stream_error(e, context))?;
        if buf.len() < n {
            return Err(DecodeError::UnexpectedEof { context });
        }
        Ok(buf)
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Writer for encoding binary data.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Creates a new writer with capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Returns a reference to the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if no bytes have been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a prefix varint.
    #[inline]
    pub fn write_varint(&mut self, value: u32) -> Result<(), EncodeError> {
        if value > MAX_VARINT {
            return Err(EncodeError::VarintOutOfRange {
                value: i64::from(value),
            });
        }
        let mut buf = [0u8; MAX_VARINT_BYTES];
        let len = put_varint(value, &mut buf);
        self.buf.extend_from_slice(&buf[..len]);
        Ok(())
    }

    /// Writes a little-endian f64.
    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }
}

// =============================================================================
// ZIGZAG ENCODING
// =============================================================================

/// Encodes a signed integer using zigzag encoding.
///
/// Maps negative numbers to odd positive numbers:
/// 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
#[inline]
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Decodes a zigzag-encoded unsigned integer back to signed.
#[inline]
pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}
