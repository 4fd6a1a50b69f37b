//! # Dynamic Values
//!
//! The untyped side of the codec: a closed sum over the XML-RPC type
//! vocabulary, built by the decoder and consumed once by the binder.
//!
//! ## Invariants
//! - **Closed**: Every consumer matches exhaustively; a new wire type is a compile error.
//! - **Immutable**: Nothing in the codec mutates a tree after decoding it.

use std::fmt;

use chrono::NaiveDateTime;

/// The compact ISO-8601 basic format used by `dateTime.iso8601`.
pub const DATETIME_FORMAT: &str = "%Y%m%dT%H:%M:%S";

/// A decoded XML-RPC value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Integer(i64),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    List(Vec<Value>),
    /// Members in wire order. Names are not deduplicated.
    Struct(Vec<(String, Value)>),
}

/// The payload-free discriminant of a `Value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    String,
    Integer,
    Boolean,
    Timestamp,
    List,
    Struct,
}

impl Kind {
    /// The element name this kind is written as on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Integer => "int",
            Kind::Boolean => "boolean",
            Kind::Timestamp => "dateTime.iso8601",
            Kind::List => "array",
            Kind::Struct => "struct",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::String(_) => Kind::String,
            Value::Integer(_) => Kind::Integer,
            Value::Boolean(_) => Kind::Boolean,
            Value::Timestamp(_) => Kind::Timestamp,
            Value::List(_) => Kind::List,
            Value::Struct(_) => Kind::Struct,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Looks up the first struct member with the given name.
    pub fn member(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::String(v.to_string()) }
}

impl From<String> for Value {
    fn from(v: String) -> Self { Value::String(v) }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::Integer(v) }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Boolean(v) }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self { Value::Timestamp(v) }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self { Value::List(v) }
}

/// The result of decoding one `methodCall` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    /// Exactly as it appeared on the wire.
    pub method_name: String,
    pub params: Vec<Value>,
}
