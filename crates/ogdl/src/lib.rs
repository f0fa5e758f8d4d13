//! OGDL: ordered graph data with a compact binary form.
//!
//! This crate provides the graph model, a dotted path language for
//! addressing it, a binary codec and an expression evaluator with pluggable
//! native functions.
//!
//! # Overview
//!
//! A graph is an owned tree. Every node holds one scalar and an ordered list
//! of children, and sibling names may repeat:
//! - **Navigation never fails**: missing targets are the nil sentinel
//! - **Binary-first**: a self-delimiting wire form, optionally zstd-compressed
//! - **Computable**: expressions read values through paths and call native
//!   objects bound by type tag
//!
//! # Quick Start
//!
//! ```rust
//! use ogdl::{Graph, Scalar};
//!
//! let mut g = Graph::nil();
//! let a = g.add("a");
//! a.add("b").add(1);
//! a.add("c").add(2);
//! a.add("b").add(3);
//!
//! assert_eq!(g.get("a.b{1}").scalar(), Scalar::Int(3));
//! assert_eq!(g.eval("a.b + a.c").to_scalar(), Scalar::Int(3));
//!
//! let bytes = g.binary().unwrap();
//! assert_eq!(Graph::from_binary(&bytes), g);
//! ```
//!
//! # Modules
//!
//! - [`model`]: Scalars and graphs
//! - [`path`]: Path compilation
//! - [`codec`]: Binary encoding/decoding with compression support
//! - [`eval`]: Expressions, evaluation and the function registry
//! - [`validate`]: Type-tagged schema checks
//! - [`rpc`]: Blocking TCP client
//! - [`error`]: Error types
//! - [`limits`]: Format constants and security limits
//!
//! # Security
//!
//! The decoder is designed to safely handle untrusted input:
//! - Nesting depth and decompressed size are bounded
//! - Varints must be in their shortest form
//! - Invalid data is rejected with descriptive errors, or the nil sentinel
//!   from [`Graph::from_binary`]

pub mod codec;
pub mod error;
pub mod eval;
pub mod limits;
pub mod model;
pub mod path;
pub mod rpc;
pub mod validate;

// Re-export commonly used types at crate root
pub use codec::{EncodeOptions, decode, decode_from_reader, encode, encode_compressed};
pub use error::{
    CallError, DecodeError, EncodeError, ErrorCode, EvalError, ParseError, ParseErrorKind,
    RpcError, SchemaError,
};
pub use eval::{Evaluator, Function, FunctionRegistry, Operator, Value, calc, compare, parse_expression};
pub use model::{Graph, Scalar, is_integer, is_number};
pub use path::{Path, Segment, Selector};
pub use rpc::{Client, ClientConfig, Protocol};
pub use validate::{TypeTag, check, validate_graph};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
