//! Graph encoding/decoding for the OGDL binary format.
//!
//! ```text
//! stream := version marker flags body
//! body   := node                         (flags = 0)
//!         | varint(size) zstd-frame      (flags = FLAG_ZSTD)
//! node   := varint((len << 3) | kind) payload node* 0x00
//! ```

use std::io::Read;

use crate::codec::primitives::{
    ByteSource, Reader, StreamReader, Writer, zigzag_decode, zigzag_encode,
};
use crate::error::{DecodeError, EncodeError};
use crate::limits::{
    FLAG_ZSTD, FORMAT_VERSION, HEADER_LEN, HEADER_MARKER, KIND_BITS, KNOWN_FLAGS, MAX_DEPTH,
    MAX_MESSAGE_SIZE, MAX_PAYLOAD_LEN,
};
use crate::model::{Graph, Scalar};

/// Closes a node's child list.
const END_MARKER: u8 = 0x00;

/// Scalar kind carried in the low descriptor bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Kind {
    Nil = 1,
    Str = 2,
    Int = 3,
    Float = 4,
    Bool = 5,
    Bytes = 6,
}

impl Kind {
    pub fn from_u8(v: u8) -> Option<Kind> {
        match v {
            1 => Some(Kind::Nil),
            2 => Some(Kind::Str),
            3 => Some(Kind::Int),
            4 => Some(Kind::Float),
            5 => Some(Kind::Bool),
            6 => Some(Kind::Bytes),
            _ => None,
        }
    }

    pub fn of(value: &Scalar) -> Kind {
        match value {
            Scalar::Nil => Kind::Nil,
            Scalar::Str(_) => Kind::Str,
            Scalar::Int(_) => Kind::Int,
            Scalar::Float(_) => Kind::Float,
            Scalar::Bool(_) => Kind::Bool,
            Scalar::Bytes(_) => Kind::Bytes,
        }
    }
}

// =============================================================================
// DECODING
// =============================================================================

fn read_header<S: ByteSource>(src: &mut S) -> Result<u8, DecodeError> {
    let version = src.read_byte("version")?;
    if version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion { version });
    }
    let marker = src.read_byte("marker")?;
    if marker != HEADER_MARKER {
        return Err(DecodeError::InvalidMarker { found: marker });
    }
    let flags = src.read_byte("flags")?;
    if flags & !KNOWN_FLAGS != 0 {
        return Err(DecodeError::UnknownFlags { flags });
    }
    Ok(flags)
}

/// Decodes a graph from a complete binary stream.
///
/// Both plain and zstd-compressed bodies are accepted. Bytes after the
/// root node are an error.
pub fn decode(input: &[u8]) -> Result<Graph, DecodeError> {
    let mut reader = Reader::new(input);
    let flags = read_header(&mut reader)?;
    if flags & FLAG_ZSTD != 0 {
        let body = decompress_zstd(reader.remaining())?;
        return decode_body(&body);
    }
    decode_body(reader.remaining())
}

fn decode_body(body: &[u8]) -> Result<Graph, DecodeError> {
    let mut reader = Reader::new(body);
    let graph = decode_root(&mut reader)?;
    if !reader.is_empty() {
        return Err(DecodeError::TrailingBytes {
            count: reader.remaining_len(),
        });
    }
    Ok(graph)
}

/// Decodes one graph from a stream, stopping right after its end marker.
///
/// Used where the stream itself carries no length, as in RPC protocol V1.
pub fn decode_from_reader<R: Read>(input: R) -> Result<Graph, DecodeError> {
    let mut src = StreamReader::new(input);
    let flags = read_header(&mut src)?;
    if flags & FLAG_ZSTD == 0 {
        return decode_root(&mut src);
    }

    let declared = declared_size(&mut src)?;
    let decoder = zstd::Decoder::new(src.into_inner())
        .map_err(|e| DecodeError::DecompressionFailed(e.to_string()))?
        .single_frame();
    let mut body = Vec::new();
    decoder
        .take(declared as u64 + 1)
        .read_to_end(&mut body)
        .map_err(|e| DecodeError::DecompressionFailed(e.to_string()))?;
    if body.len() != declared {
        return Err(DecodeError::UncompressedSizeMismatch {
            declared,
            actual: body.len(),
        });
    }
    decode_body(&body)
}

fn decode_root<S: ByteSource>(src: &mut S) -> Result<Graph, DecodeError> {
    let descriptor = src.read_varint("node descriptor")?;
    if descriptor == u32::from(END_MARKER) {
        return Err(DecodeError::MalformedEncoding {
            context: "end marker where the root node was expected",
        });
    }
    decode_node(src, descriptor, 0)
}

/// Decodes the node whose descriptor has just been read.
fn decode_node<S: ByteSource>(
    src: &mut S,
    descriptor: u32,
    depth: usize,
) -> Result<Graph, DecodeError> {
    if depth > MAX_DEPTH {
        return Err(DecodeError::DepthExceedsLimit { max: MAX_DEPTH });
    }
    let kind_bits = (descriptor & ((1 << KIND_BITS) - 1)) as u8;
    let kind = Kind::from_u8(kind_bits).ok_or(DecodeError::InvalidKind { kind: kind_bits })?;
    let len = (descriptor >> KIND_BITS) as usize;

    let mut node = Graph::new(decode_payload(src, kind, len)?);
    loop {
        let next = src.read_varint("node descriptor")?;
        if next == u32::from(END_MARKER) {
            return Ok(node);
        }
        node.add_node(decode_node(src, next, depth + 1)?);
    }
}

fn decode_payload<S: ByteSource>(src: &mut S, kind: Kind, len: usize) -> Result<Scalar, DecodeError> {
    match kind {
        Kind::Nil => {
            check_len("nil", len, 0)?;
            Ok(Scalar::Nil)
        }
        Kind::Str => {
            let bytes = src.read_vec(len, "string payload")?;
            String::from_utf8(bytes)
                .map(Scalar::Str)
                .map_err(|_| DecodeError::InvalidUtf8)
        }
        Kind::Int => {
            if len > 8 {
                return Err(DecodeError::InvalidPayloadLength { kind: "int", len });
            }
            let mut buf = [0u8; 8];
            src.read_into(&mut buf[8 - len..], "int payload")?;
            if len > 0 && buf[8 - len] == 0 {
                return Err(DecodeError::MalformedEncoding {
                    context: "int payload has a leading zero byte",
                });
            }
            Ok(Scalar::Int(zigzag_decode(u64::from_be_bytes(buf))))
        }
        Kind::Float => {
            check_len("float", len, 8)?;
            let value = src.read_f64("float payload")?;
            if value.is_nan() {
                return Err(DecodeError::MalformedEncoding {
                    context: "float payload is NaN",
                });
            }
            Ok(Scalar::Float(value))
        }
        Kind::Bool => {
            check_len("bool", len, 1)?;
            match src.read_byte("bool payload")? {
                0 => Ok(Scalar::Bool(false)),
                1 => Ok(Scalar::Bool(true)),
                value => Err(DecodeError::InvalidBool { value }),
            }
        }
        Kind::Bytes => src.read_vec(len, "bytes payload").map(Scalar::Bytes),
    }
}

fn check_len(kind: &'static str, len: usize, expected: usize) -> Result<(), DecodeError> {
    if len != expected {
        return Err(DecodeError::InvalidPayloadLength { kind, len });
    }
    Ok(())
}

fn declared_size<S: ByteSource>(src: &mut S) -> Result<usize, DecodeError> {
    let declared = src.read_varint("uncompressed_size")? as usize;
    if declared > MAX_MESSAGE_SIZE {
        return Err(DecodeError::LengthExceedsLimit {
            field: "uncompressed_size",
            len: declared,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(declared)
}

/// Decompresses a `FLAG_ZSTD` body: declared size, then one zstd frame.
fn decompress_zstd(compressed: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut reader = Reader::new(compressed);
    let declared_size = declared_size(&mut reader)?;

    let decoder = zstd::Decoder::new(reader.remaining())
        .map_err(|e| DecodeError::DecompressionFailed(e.to_string()))?;

    let mut decompressed = Vec::with_capacity(declared_size);
    decoder
        .take(declared_size as u64 + 1)
        .read_to_end(&mut decompressed)
        .map_err(|e| DecodeError::DecompressionFailed(e.to_string()))?;

    if decompressed.len() != declared_size {
        return Err(DecodeError::UncompressedSizeMismatch {
            declared: declared_size,
            actual: decompressed.len(),
        });
    }

    Ok(decompressed)
}

// =============================================================================
// ENCODING
// =============================================================================

/// Options for encoding graphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
    /// zstd level for a compressed body; `None` writes the body as is.
    pub compression: Option<i32>,
}

impl EncodeOptions {
    /// Creates default (uncompressed) encoding options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for a zstd body at `level`.
    pub fn compressed(level: i32) -> Self {
        Self {
            compression: Some(level),
        }
    }
}

/// Encodes a graph with an uncompressed body.
pub fn encode(graph: &Graph) -> Result<Vec<u8>, EncodeError> {
    encode_with_options(graph, EncodeOptions::default())
}

/// Encodes a graph with the given options.
pub fn encode_with_options(graph: &Graph, options: EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    if let Some(level) = options.compression {
        return encode_compressed(graph, level);
    }
    let mut writer = Writer::with_capacity(64);
    writer.write_bytes(&[FORMAT_VERSION, HEADER_MARKER, 0]);
    encode_node(&mut writer, graph, 0)?;
    Ok(writer.into_bytes())
}

/// Encodes a graph with a zstd-compressed body.
pub fn encode_compressed(graph: &Graph, level: i32) -> Result<Vec<u8>, EncodeError> {
    let mut body = Writer::with_capacity(64);
    encode_node(&mut body, graph, 0)?;
    let body = body.into_bytes();
    if body.len() > MAX_MESSAGE_SIZE {
        return Err(EncodeError::LengthExceedsLimit {
            field: "body",
            len: body.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    let compressed = zstd::encode_all(body.as_slice(), level)
        .map_err(|e| EncodeError::CompressionFailed(e.to_string()))?;

    let mut writer = Writer::with_capacity(HEADER_LEN + 4 + compressed.len());
    writer.write_bytes(&[FORMAT_VERSION, HEADER_MARKER, FLAG_ZSTD]);
    writer.write_varint(body.len() as u32)?;
    writer.write_bytes(&compressed);
    Ok(writer.into_bytes())
}

fn encode_node(writer: &mut Writer, node: &Graph, depth: usize) -> Result<(), EncodeError> {
    if depth > MAX_DEPTH {
        return Err(EncodeError::DepthExceedsLimit { max: MAX_DEPTH });
    }
    let value = node.this();
    let mut int_buf = [0u8; 8];
    let payload: &[u8] = match value {
        Scalar::Nil => &[],
        Scalar::Str(s) => s.as_bytes(),
        Scalar::Bytes(b) => b,
        Scalar::Int(i) => {
            int_buf = zigzag_encode(*i).to_be_bytes();
            let skip = int_buf.iter().take_while(|b| **b == 0).count();
            &int_buf[skip..]
        }
        Scalar::Float(f) => {
            if f.is_nan() {
                return Err(EncodeError::FloatIsNan);
            }
            int_buf = f.to_le_bytes();
            &int_buf
        }
        Scalar::Bool(b) => {
            int_buf[0] = u8::from(*b);
            &int_buf[..1]
        }
    };
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(EncodeError::LengthExceedsLimit {
            field: "value",
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    let descriptor = ((payload.len() as u32) << KIND_BITS) | Kind::of(value) as u32;
    writer.write_varint(descriptor)?;
    writer.write_bytes(payload);
    for child in node.children() {
        encode_node(writer, child, depth + 1)?;
    }
    writer.write_byte(END_MARKER);
    Ok(())
}

impl Graph {
    /// Binary form of this graph, uncompressed.
    pub fn binary(&self) -> Result<Vec<u8>, EncodeError> {
        encode(self)
    }

    /// Decodes a binary stream, failing closed: malformed input yields the
    /// nil sentinel, never a partial graph.
    pub fn from_binary(input: &[u8]) -> Graph {
        match decode(input) {
            Ok(graph) => graph,
            Err(err) => {
                tracing::debug!(code = err.code().code(), %err, "binary decode failed");
                Graph::nil()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Graph {
        let mut g = Graph::nil();
        let a = g.add("a");
        a.add("b").add(1);
        a.add("c").add(-2.5);
        a.add("b").add(true);
        g.add(b"\x00\xff".to_vec());
        g
    }

    #[test]
    fn test_roundtrip() {
        let g = sample();
        let bytes = encode(&g).unwrap();
        assert_eq!(&bytes[..3], &[1, b'G', 0]);
        assert_eq!(decode(&bytes).unwrap(), g);
        assert_eq!(Graph::from_binary(&g.binary().unwrap()), g);
    }

    #[test]
    fn test_compressed_roundtrip() {
        let g = sample();
        let bytes = encode_with_options(&g, EncodeOptions::compressed(3)).unwrap();
        assert_eq!(bytes[2], FLAG_ZSTD);
        assert_eq!(decode(&bytes).unwrap(), g);
        assert_eq!(decode_from_reader(bytes.as_slice()).unwrap(), g);
    }

    #[test]
    fn test_nil_sentinel_layout() {
        let bytes = encode(&Graph::nil()).unwrap();
        assert_eq!(bytes, vec![1, b'G', 0, Kind::Nil as u8, END_MARKER]);
        assert_eq!(decode(&bytes).unwrap(), Graph::nil());
    }

    #[test]
    fn test_int_payload_is_minimal() {
        let bytes = encode(&Graph::new(0)).unwrap();
        assert_eq!(&bytes[3..], &[Kind::Int as u8, END_MARKER]);

        let bytes = encode(&Graph::new(-1)).unwrap();
        assert_eq!(&bytes[3..], &[(1 << 3) | Kind::Int as u8, 0x01, END_MARKER]);

        for v in [i64::MIN, -300, 255, i64::MAX] {
            let g = Graph::new(v);
            assert_eq!(decode(&encode(&g).unwrap()).unwrap(), g);
        }
    }

    #[test]
    fn test_header_validation() {
        let body = [Kind::Nil as u8, END_MARKER];
        let with_header = |h: [u8; 3]| {
            let mut v = h.to_vec();
            v.extend_from_slice(&body);
            v
        };

        assert!(decode(&with_header([1, b'G', 0])).is_ok());
        assert!(matches!(
            decode(&with_header([0, b'G', 0])),
            Err(DecodeError::UnsupportedVersion { version: 0 })
        ));
        assert!(matches!(
            decode(&with_header([1, b'H', 0])),
            Err(DecodeError::InvalidMarker { found: b'H' })
        ));
        assert!(matches!(
            decode(&with_header([1, b'G', 1])),
            Err(DecodeError::UnknownFlags { flags: 1 })
        ));

        let mut g = Graph::nil();
        g.add("x");
        let mut bytes = encode(&g).unwrap();
        bytes[0] = 2;
        assert_eq!(Graph::from_binary(&bytes), Graph::nil());
    }

    #[test]
    fn test_malformed_bodies() {
        let header = [1, b'G', 0];
        let body_result = |body: &[u8]| {
            let mut v = header.to_vec();
            v.extend_from_slice(body);
            decode(&v)
        };

        assert!(matches!(
            body_result(&[]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            body_result(&[Kind::Nil as u8]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            body_result(&[END_MARKER]),
            Err(DecodeError::MalformedEncoding { .. })
        ));
        assert!(matches!(
            body_result(&[7, END_MARKER]),
            Err(DecodeError::InvalidKind { kind: 7 })
        ));
        assert!(matches!(
            body_result(&[(1 << 3) | Kind::Bool as u8, 2, END_MARKER]),
            Err(DecodeError::InvalidBool { value: 2 })
        ));
        assert!(matches!(
            body_result(&[(2 << 3) | Kind::Str as u8, 0xC3, 0x28, END_MARKER]),
            Err(DecodeError::InvalidUtf8)
        ));
        assert!(matches!(
            body_result(&[(2 << 3) | Kind::Int as u8, 0x00, 0x01, END_MARKER]),
            Err(DecodeError::MalformedEncoding { .. })
        ));
        assert!(matches!(
            body_result(&[Kind::Nil as u8, END_MARKER, 0x42]),
            Err(DecodeError::TrailingBytes { count: 1 })
        ));
    }

    #[test]
    fn test_depth_limit() {
        let mut g = Graph::new("leaf");
        for _ in 0..MAX_DEPTH + 1 {
            let mut parent = Graph::new("n");
            parent.add_node(g);
            g = parent;
        }
        assert_eq!(
            encode(&g),
            Err(EncodeError::DepthExceedsLimit { max: MAX_DEPTH })
        );

        let mut body = Vec::new();
        for _ in 0..MAX_DEPTH + 2 {
            body.push(Kind::Nil as u8);
        }
        let mut bytes = vec![1, b'G', 0];
        bytes.extend_from_slice(&body);
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::DepthExceedsLimit { .. })
        ));
    }

    #[test]
    fn test_nan_rejected() {
        assert_eq!(
            encode(&Graph::new(f64::NAN)),
            Err(EncodeError::FloatIsNan)
        );
    }
}
