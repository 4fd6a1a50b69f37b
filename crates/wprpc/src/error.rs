//! # Error Definitions
//!
//! The central ledger of codec failures. Every error is terminal for the
//! request that produced it; nothing in the codec retries.

use thiserror::Error;

use crate::value::Kind;
use crate::xml::ScopeError;

/// Fault code for a document that is not well-formed.
pub const FAULT_PARSE_ERROR: i64 = -32700;
/// Fault code for a method name with no registered handler.
pub const FAULT_METHOD_NOT_FOUND: i64 = -32601;
/// Fault code for parameters that do not fit the method's signature.
pub const FAULT_INVALID_PARAMS: i64 = -32602;
/// Fault code for failures inside the codec itself.
pub const FAULT_INTERNAL_ERROR: i64 = -32603;
/// Fault code for failures reported by a handler.
pub const FAULT_APPLICATION_ERROR: i64 = -32500;

/// Failures of the XML-RPC codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The input is not well-formed XML, or not a method call.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A `<value>` carried a type element outside the supported vocabulary.
    #[error("unknown value type '{0}'")]
    UnknownType(String),

    /// The number of wire parameters differs from the record's field count.
    #[error("wrong number of arguments (expected {expected}, got {actual})")]
    ArityMismatch { expected: usize, actual: usize },

    /// A wire value's variant does not fit the target field.
    #[error("value type mismatch (expected {expected}, found {actual})")]
    TypeMismatch { expected: Kind, actual: Kind },

    /// A primitive's text could not be parsed, or does not fit the target.
    #[error("cannot coerce '{text}' to {kind}")]
    TypeCoercion { kind: &'static str, text: String },

    /// The encoder met a field kind the wire format cannot carry.
    #[error("unsupported reply value kind '{0}'")]
    UnsupportedKind(&'static str),

    /// An encoder wrote an unbalanced or misplaced element.
    #[error("writer scope violation: {0}")]
    Scope(#[from] ScopeError),
}

impl Error {
    /// The XML-RPC interoperability fault code for this error.
    pub fn fault_code(&self) -> i64 {
        match self {
            Error::MalformedDocument(_) => FAULT_PARSE_ERROR,
            Error::UnknownType(_)
            | Error::ArityMismatch { .. }
            | Error::TypeMismatch { .. }
            | Error::TypeCoercion { .. } => FAULT_INVALID_PARAMS,
            Error::UnsupportedKind(_) | Error::Scope(_) => FAULT_INTERNAL_ERROR,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::MalformedDocument(e.to_string())
    }
}

/// A specialized Result type for codec operations.
pub type Result<T> = std::result::Result<T, Error>;
