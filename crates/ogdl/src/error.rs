//! Error types for OGDL path parsing, binary coding, evaluation,
//! schema validation and transport.

use std::fmt;

use thiserror::Error;

/// Coarse error families for binary decoding failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E001: Invalid header (version, marker or flags)
    InvalidHeader,
    /// E002: Input ended before the structure was complete
    UnexpectedEof,
    /// E003: Invalid UTF-8 encoding
    InvalidUtf8,
    /// E004: Malformed varint/descriptor/payload
    MalformedEncoding,
    /// E005: A security limit was exceeded
    LimitExceeded,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "E001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::InvalidHeader => "E001",
            ErrorCode::UnexpectedEof => "E002",
            ErrorCode::InvalidUtf8 => "E003",
            ErrorCode::MalformedEncoding => "E004",
            ErrorCode::LimitExceeded => "E005",
        }
    }
}

/// What went wrong while compiling path or expression text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A `{` selector was never closed.
    UnterminatedBrace,
    /// A `(` argument list or group was never closed.
    UnterminatedParen,
    /// A `[` ordinal was never closed.
    UnterminatedBracket,
    /// A quoted literal was never closed.
    UnterminatedQuote,
    /// A character that cannot appear at this position.
    UnexpectedChar(char),
    /// A `.` with nothing on one of its sides.
    EmptySegment,
    /// Selector or ordinal content that is not a non-negative integer.
    InvalidIndex,
    /// An operator or argument slot with no operand.
    MissingOperand,
    /// Two operands with no operator between them.
    MissingOperator,
    /// Groups or operators nested past the expression depth limit.
    NestingTooDeep,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::UnterminatedBrace => f.write_str("unterminated '{'"),
            ParseErrorKind::UnterminatedParen => f.write_str("unterminated '('"),
            ParseErrorKind::UnterminatedBracket => f.write_str("unterminated '['"),
            ParseErrorKind::UnterminatedQuote => f.write_str("unterminated quote"),
            ParseErrorKind::UnexpectedChar(c) => write!(f, "unexpected character {c:?}"),
            ParseErrorKind::EmptySegment => f.write_str("empty path segment"),
            ParseErrorKind::InvalidIndex => f.write_str("index is not a non-negative integer"),
            ParseErrorKind::MissingOperand => f.write_str("missing operand"),
            ParseErrorKind::MissingOperator => f.write_str("missing operator"),
            ParseErrorKind::NestingTooDeep => f.write_str("expression nested too deeply"),
        }
    }
}

/// Malformed path or expression text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at position {position}: {kind}")]
pub struct ParseError {
    /// Byte offset into the input where the problem was detected.
    pub position: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(position: usize, kind: ParseErrorKind) -> Self {
        Self { position, kind }
    }

    /// Shifts the position by `offset`, used when parsing embedded text.
    pub(crate) fn offset(mut self, offset: usize) -> Self {
        self.position += offset;
        self
    }
}

/// Error during binary decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    // === E001: Invalid header ===
    #[error("[E001] unsupported format version: {version}")]
    UnsupportedVersion { version: u8 },

    #[error("[E001] invalid header marker: {found:#04x}")]
    InvalidMarker { found: u8 },

    #[error("[E001] unknown header flags: {flags:#04x}")]
    UnknownFlags { flags: u8 },

    // === E002: Truncated input ===
    #[error("[E002] unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    // === E003: Invalid UTF-8 ===
    #[error("[E003] invalid UTF-8 in string value")]
    InvalidUtf8,

    // === E004: Malformed encoding ===
    #[error("[E004] invalid varint lead byte: {byte:#04x}")]
    InvalidVarintPrefix { byte: u8 },

    #[error("[E004] varint is not in its shortest form")]
    VarintNotMinimal,

    #[error("[E004] invalid scalar kind: {kind}")]
    InvalidKind { kind: u8 },

    #[error("[E004] invalid bool value: {value} (expected 0x00 or 0x01)")]
    InvalidBool { value: u8 },

    #[error("[E004] {kind} payload has invalid length {len}")]
    InvalidPayloadLength { kind: &'static str, len: usize },

    #[error("[E004] malformed encoding: {context}")]
    MalformedEncoding { context: &'static str },

    #[error("[E004] {count} trailing bytes after the root node")]
    TrailingBytes { count: usize },

    #[error("[E004] read failed: {0}")]
    Io(String),

    // === E005: Limits ===
    #[error("[E005] nesting depth exceeds maximum {max}")]
    DepthExceedsLimit { max: usize },

    #[error("[E005] {field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    // === Compression errors ===
    #[error("[E004] zstd decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("[E004] decompressed size {actual} doesn't match declared {declared}")]
    UncompressedSizeMismatch { declared: usize, actual: usize },
}

impl DecodeError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::UnsupportedVersion { .. }
            | DecodeError::InvalidMarker { .. }
            | DecodeError::UnknownFlags { .. } => ErrorCode::InvalidHeader,
            DecodeError::UnexpectedEof { .. } => ErrorCode::UnexpectedEof,
            DecodeError::InvalidUtf8 => ErrorCode::InvalidUtf8,
            DecodeError::DepthExceedsLimit { .. } | DecodeError::LengthExceedsLimit { .. } => {
                ErrorCode::LimitExceeded
            }
            _ => ErrorCode::MalformedEncoding,
        }
    }
}

/// Error during binary encoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("varint value {value} outside [0, 2^28-1]")]
    VarintOutOfRange { value: i64 },

    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("graph depth exceeds maximum {max}")]
    DepthExceedsLimit { max: usize },

    #[error("float value is NaN")]
    FloatIsNan,

    #[error("zstd compression failed: {0}")]
    CompressionFailed(String),
}

/// Failure reported by a native function object.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    #[error("unknown method")]
    UnknownMethod,

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Error collected while evaluating one branch of an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unresolved function {method:?} (type tag {tag:?})")]
    UnresolvedFunction { tag: String, method: String },

    #[error("call to {tag}.{method} failed: {reason}")]
    Call {
        tag: String,
        method: String,
        reason: String,
    },
}

/// Schema validation failure, naming the first offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("field {field:?} is missing")]
    MissingField { field: String },

    #[error("field {field:?} is not a valid {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },

    #[error("field {field:?} declares unknown type {tag:?}")]
    UnknownType { field: String, tag: String },
}

/// Error at the RPC transport boundary.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("cannot establish a connection to {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("empty response")]
    EmptyResponse,

    #[error("message length {len} exceeds maximum {max}")]
    MessageTooLarge { len: usize, max: usize },

    #[error("malformed response: {0}")]
    Decode(#[from] DecodeError),

    #[error("cannot encode request: {0}")]
    Encode(#[from] EncodeError),
}

impl RpcError {
    /// Connection-level failures that warrant a fresh dial and another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, RpcError::Connect { .. } | RpcError::Io(_))
    }
}
