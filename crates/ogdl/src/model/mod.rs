//! Data model types for OGDL:
//! - Scalars (the tagged value a node holds)
//! - Graphs (owned trees of scalar-valued nodes)

pub mod graph;
pub mod scalar;

pub use graph::Graph;
pub use scalar::{format_float, is_integer, is_number, parse_number, Scalar};
