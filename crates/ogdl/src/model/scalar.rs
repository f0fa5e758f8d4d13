//! Scalar values held by graph nodes.
//!
//! A scalar is one of a closed set of kinds. Every coercion below is a
//! total function over that set.

use std::fmt;

/// The value held by a single node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scalar {
    /// Absent value.
    #[default]
    Nil,
    /// UTF-8 text.
    Str(String),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit IEEE 754 float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Opaque byte string.
    Bytes(Vec<u8>),
}

impl Scalar {
    /// Returns true for the absent value.
    pub fn is_nil(&self) -> bool {
        matches!(self, Scalar::Nil)
    }

    /// Returns true for integers and floats (not numeric strings).
    pub fn is_numeric(&self) -> bool {
        matches!(self, Scalar::Int(_) | Scalar::Float(_))
    }

    /// Borrows the text of a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of this scalar.
    ///
    /// Integers and floats pass through; strings and byte strings are
    /// parsed with [`parse_number`]. Everything else is `None`.
    pub fn number(&self) -> Option<Scalar> {
        match self {
            Scalar::Int(_) | Scalar::Float(_) => Some(self.clone()),
            Scalar::Str(s) => parse_number(s),
            Scalar::Bytes(b) => std::str::from_utf8(b).ok().and_then(parse_number),
            Scalar::Nil | Scalar::Bool(_) => None,
        }
    }

    /// Like [`number`](Self::number) but keeps non-numeric values as they are.
    pub fn coerced(&self) -> Scalar {
        self.number().unwrap_or_else(|| self.clone())
    }

    /// Integer view: exact integers, integral floats and integer text.
    pub fn to_i64(&self) -> Option<i64> {
        match self.number()? {
            Scalar::Int(i) => Some(i),
            Scalar::Float(f) if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 => {
                Some(f as i64)
            }
            _ => None,
        }
    }

    /// Float view of any numeric value.
    pub fn to_f64(&self) -> Option<f64> {
        match self.number()? {
            Scalar::Int(i) => Some(i as f64),
            Scalar::Float(f) => Some(f),
            _ => None,
        }
    }

    /// Boolean view: booleans and the words `true` / `false`.
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            Scalar::Str(s) => match s.trim() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Truth value used by boolean evaluation.
    ///
    /// A non-zero number, or a non-empty string other than `"false"`, is true.
    pub fn truthy(&self) -> bool {
        match self {
            Scalar::Nil => false,
            Scalar::Bool(b) => *b,
            Scalar::Int(i) => *i != 0,
            Scalar::Float(f) => *f != 0.0 && !f.is_nan(),
            Scalar::Str(s) => !s.is_empty() && s != "false",
            Scalar::Bytes(b) => !b.is_empty(),
        }
    }

    /// Text form. Integral floats render without a fractional part.
    pub fn text(&self) -> String {
        match self {
            Scalar::Nil => String::new(),
            Scalar::Str(s) => s.clone(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => format_float(*f),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }

    /// Compares this value against a child name.
    pub(crate) fn matches_name(&self, name: &str) -> bool {
        match self {
            Scalar::Nil => false,
            Scalar::Str(s) => s == name,
            Scalar::Bytes(b) => b == name.as_bytes(),
            other => other.text() == name,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

impl From<&String> for Scalar {
    fn from(value: &String) -> Self {
        Scalar::Str(value.clone())
    }
}

impl From<char> for Scalar {
    fn from(value: char) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Scalar::Float(f64::from(value))
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(value: Vec<u8>) -> Self {
        Scalar::Bytes(value)
    }
}

impl From<&[u8]> for Scalar {
    fn from(value: &[u8]) -> Self {
        Scalar::Bytes(value.to_vec())
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Scalar::Nil, Into::into)
    }
}

/// Parses text into an integer or float scalar.
///
/// Leading and trailing whitespace is tolerated; embedded whitespace,
/// trailing garbage and non-finite words (`inf`, `NaN`) are rejected.
pub fn parse_number(s: &str) -> Option<Scalar> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Scalar::Int(i));
    }
    let plain = s
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !plain || !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<f64>().ok().map(Scalar::Float)
}

/// Returns true if `s` is an integer, allowing surrounding whitespace.
pub fn is_integer(s: &str) -> bool {
    matches!(parse_number(s), Some(Scalar::Int(_)))
}

/// Returns true if `s` is an integer or a float.
pub fn is_number(s: &str) -> bool {
    parse_number(s).is_some()
}

/// Shortest decimal rendering; `2.0` renders as `"2"`.
pub fn format_float(f: f64) -> String {
    // Display for f64 is the shortest round-trip form and omits ".0".
    f.to_string()
}
