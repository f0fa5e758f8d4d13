//! Format constants and security limits.
//!
//! The decoder treats every input as untrusted: nesting depth, payload
//! lengths and decompressed sizes are bounded by the values below.

/// Format version byte written at the start of every binary stream.
pub const FORMAT_VERSION: u8 = 1;

/// Fixed marker byte following the version.
pub const HEADER_MARKER: u8 = b'G';

/// Header length in bytes: version, marker, flags.
pub const HEADER_LEN: usize = 3;

/// Header flag: the body is a zstd frame preceded by its uncompressed size.
pub const FLAG_ZSTD: u8 = 0x02;

/// Every flag bit a decoder of this version understands.
pub const KNOWN_FLAGS: u8 = FLAG_ZSTD;

/// Largest value the variable-length integer can carry (28 bits).
pub const MAX_VARINT: u32 = 0x0FFF_FFFF;

/// Longest varint encoding in bytes.
pub const MAX_VARINT_BYTES: usize = 4;

/// Low descriptor bits holding the scalar kind.
pub const KIND_BITS: u32 = 3;

/// Largest value payload a node descriptor can frame.
pub const MAX_PAYLOAD_LEN: usize = (MAX_VARINT >> KIND_BITS) as usize;

/// Maximum nesting depth accepted by the encoder and decoder.
pub const MAX_DEPTH: usize = 512;

/// Maximum parenthesis nesting, and operator tree height, in expression text.
pub const MAX_EXPRESSION_DEPTH: usize = 256;

/// Maximum decompressed body size, and maximum RPC payload.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Child name that declares a node's function type tag.
pub const TYPE_TAG: &str = "!type";

/// Root value of a compiled expression graph.
pub const EXPRESSION_MARKER: &str = "!e";
