//! Value codec
//!
//! Values are stored as short strings `<tag>:<payload>`:
//!
//! | tag  | type    | payload                         |
//! |------|---------|---------------------------------|
//! | `b:` | boolean | `True` / `False`                |
//! | `i:` | integer | decimal                         |
//! | `f:` | real    | fixed notation, 10 decimals     |
//! | `s:` | string  | only when the raw string would be ambiguous |
//!
//! Untagged text is a plain string, so databases written by hand (or by
//! older writers) read back as strings.

use std::fmt;

use serde::Serialize;

use crate::error::{FlatKvError, Result};

/// Encoded values must be strictly shorter than this
pub const MAX_ENCODED_LEN: usize = 4096;

const TAG_BOOL: &str = "b:";
const TAG_INT: &str = "i:";
const TAG_REAL: &str = "f:";
const TAG_STR: &str = "s:";

const RESERVED_TAGS: [&str; 4] = [TAG_INT, TAG_REAL, TAG_BOOL, TAG_STR];

/// A scalar value kept in the store
///
/// "Absent" is not a variant: it is `None` in an `Option<Value>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
}

impl Value {
    /// Convert a dynamic JSON value
    ///
    /// `null` maps to absent; arrays, objects and integers outside `i64`
    /// cannot be stored.
    pub fn from_json(json: serde_json::Value) -> Result<Option<Value>> {
        match json {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Bool(b) => Ok(Some(Value::Bool(b))),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(Some(Value::Int(i))),
                (None, Some(f)) if n.is_f64() => Ok(Some(Value::Real(f))),
                _ => Err(FlatKvError::UnsupportedType(format!("number {} out of range", n))),
            },
            serde_json::Value::String(s) => Ok(Some(Value::Str(s))),
            serde_json::Value::Array(_) => Err(FlatKvError::UnsupportedType("array".to_string())),
            serde_json::Value::Object(_) => Err(FlatKvError::UnsupportedType("object".to_string())),
        }
    }

    /// Parse JSON text into a value
    ///
    /// Like [`Value::from_json`], but an integer literal too large for
    /// `i64` is rejected instead of being read as a rounded real.
    pub fn from_json_str(text: &str) -> Result<Option<Value>> {
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|e| FlatKvError::Serialization(e.to_string()))?;

        let literal = text.trim();
        let integer_literal = !literal.contains(|c| matches!(c, '.' | 'e' | 'E'));
        if json.is_f64() && integer_literal {
            return Err(FlatKvError::UnsupportedType(format!("number {} out of range", literal)));
        }

        Self::from_json(json)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// Encode a value into its stored string form
pub fn encode_value(value: &Value) -> Result<String> {
    let encoded = match value {
        Value::Bool(true) => format!("{}True", TAG_BOOL),
        Value::Bool(false) => format!("{}False", TAG_BOOL),
        Value::Int(i) => format!("{}{}", TAG_INT, i),
        Value::Real(f) => format!("{}{:.10}", TAG_REAL, f),
        Value::Str(s) => {
            if s.is_empty() || RESERVED_TAGS.iter().any(|tag| s.starts_with(tag)) {
                format!("{}{}", TAG_STR, s)
            } else {
                s.clone()
            }
        }
    };

    if encoded.len() >= MAX_ENCODED_LEN {
        return Err(FlatKvError::ValueTooLarge {
            len: encoded.len(),
            limit: MAX_ENCODED_LEN,
        });
    }

    Ok(encoded)
}

/// Decode a stored string back into a typed value
pub fn decode_value(stored: &str) -> Result<Value> {
    if let Some(payload) = stored.strip_prefix(TAG_INT) {
        return payload
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| FlatKvError::MalformedNumber(stored.to_string()));
    }
    if let Some(payload) = stored.strip_prefix(TAG_REAL) {
        return payload
            .parse::<f64>()
            .map(Value::Real)
            .map_err(|_| FlatKvError::MalformedNumber(stored.to_string()));
    }
    if let Some(payload) = stored.strip_prefix(TAG_BOOL) {
        return match payload {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            _ => Err(FlatKvError::MalformedBoolean(stored.to_string())),
        };
    }
    if let Some(payload) = stored.strip_prefix(TAG_STR) {
        return Ok(Value::Str(payload.to_string()));
    }
    Ok(Value::Str(stored.to_string()))
}
