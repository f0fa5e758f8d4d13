//! Schema validation for graphs.
//!
//! A schema is a graph whose top-level nodes are field names, each with one
//! child naming the expected type:
//!
//! ```text
//! a !int
//! b !string
//! c !float
//! d !bool
//! ```
//!
//! Validation looks each field up in the data graph and checks that its
//! value coerces to the declared type. The first offending field is
//! reported.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use crate::error::SchemaError;
use crate::model::{Graph, Scalar};

/// Value types a schema can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Int,
    String,
    Float,
    Bool,
}

lazy_static! {
    static ref TYPE_TAGS: FxHashMap<&'static str, TypeTag> = {
        let mut tags = FxHashMap::default();
        tags.insert("int", TypeTag::Int);
        tags.insert("integer", TypeTag::Int);
        tags.insert("string", TypeTag::String);
        tags.insert("str", TypeTag::String);
        tags.insert("float", TypeTag::Float);
        tags.insert("number", TypeTag::Float);
        tags.insert("bool", TypeTag::Bool);
        tags.insert("boolean", TypeTag::Bool);
        tags
    };
}

impl TypeTag {
    /// Parses a tag, with or without the leading `!`.
    pub fn parse(tag: &str) -> Option<TypeTag> {
        let tag = tag.trim();
        let tag = tag.strip_prefix('!').unwrap_or(tag);
        TYPE_TAGS.get(tag).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Int => "int",
            TypeTag::String => "string",
            TypeTag::Float => "float",
            TypeTag::Bool => "bool",
        }
    }

    /// True if `value` coerces to this type.
    pub fn accepts(self, value: &Scalar) -> bool {
        match self {
            TypeTag::Int => matches!(value.number(), Some(Scalar::Int(_))),
            TypeTag::Float => value.number().is_some(),
            TypeTag::Bool => value.to_bool().is_some(),
            TypeTag::String => !value.is_nil(),
        }
    }
}

/// Validates `data` against `schema`.
///
/// Fields are the children of both graphs, matched by name. The roots
/// themselves are only containers, so a record `R` with an `id` child
/// satisfies a schema with an `id` field.
pub fn validate_graph(schema: &Graph, data: &Graph) -> Result<(), SchemaError> {
    for field in schema.children() {
        let name = field.this().text();
        let tag_text = field.at(0).this().text();
        let tag = TypeTag::parse(&tag_text).ok_or_else(|| SchemaError::UnknownType {
            field: name.clone(),
            tag: tag_text.clone(),
        })?;

        let value = data.child(&name).at(0).value();
        if value.is_nil() {
            return Err(SchemaError::MissingField { field: name });
        }
        if !tag.accepts(value) {
            return Err(SchemaError::TypeMismatch {
                field: name,
                expected: tag.name(),
            });
        }
    }
    Ok(())
}

/// [`validate_graph`] as an `(ok, message)` pair; the message is empty on success.
pub fn check(schema: &Graph, data: &Graph) -> (bool, String) {
    match validate_graph(schema, data) {
        Ok(()) => (true, String::new()),
        Err(err) => (false, err.to_string()),
    }
}

impl Graph {
    /// Treats this graph as a schema and checks `data` against it.
    pub fn check(&self, data: &Graph) -> (bool, String) {
        check(self, data)
    }
}
