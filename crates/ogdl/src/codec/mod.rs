//! Binary encoding/decoding for graphs.

pub mod graph;
pub mod primitives;

pub use graph::{
    EncodeOptions, Kind, decode, decode_from_reader, encode, encode_compressed, encode_with_options,
};
pub use primitives::{
    ByteSource, Reader, StreamReader, Writer, decode_varint, encode_varint, zigzag_decode,
    zigzag_encode,
};
