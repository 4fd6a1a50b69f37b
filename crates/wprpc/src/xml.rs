//! # Response Writer
//!
//! A bounded, state-machine driven builder for `methodResponse` documents.
//!
//! The Writer keeps a stack of open scopes so that every element it emits is
//! balanced, and so that each value slot (`<param>`, array item, struct
//! member, fault) receives exactly one value.
//!
//! ## Structural Invariants
//!
//! 1.  **Root**: Holds exactly one response or fault envelope.
//! 2.  **Containers** (params, array, struct): Only accept their own child
//!     element (param, item, member respectively).
//! 3.  **Value Slots**: Exactly one value must be written before closing.
//! 4.  **Finish**: Bytes are only handed out once every scope is closed.

use chrono::NaiveDateTime;
use quick_xml::escape::partial_escape;
use thiserror::Error;

use crate::error::Result;
use crate::value::DATETIME_FORMAT;

/// An open element on the Writer stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The virtual root; allows a single envelope.
    Root,
    /// `<methodResponse><params>`; allows any number of params.
    Params,
    /// `<param><value>`; strict, exactly one value.
    Param,
    /// `<array><data>`; allows any number of items.
    Array,
    /// `<value>` inside an array; strict, exactly one value.
    Item,
    /// `<struct>`; allows any number of members.
    Struct,
    /// `<member>` after its name; strict, exactly one value.
    Member,
    /// `<methodResponse><fault><value>`; strict, exactly one value.
    Fault,
}

impl Scope {
    fn is_value_slot(self) -> bool {
        matches!(self, Scope::Param | Scope::Item | Scope::Member | Scope::Fault)
    }

    fn close_tag(self) -> &'static str {
        match self {
            Scope::Root => "",
            Scope::Params => "</params></methodResponse>",
            Scope::Param => "</value></param>",
            Scope::Array => "</data></array>",
            Scope::Item => "</value>",
            Scope::Struct => "</struct>",
            Scope::Member => "</value></member>",
            Scope::Fault => "</value></fault></methodResponse>",
        }
    }
}

/// Structural misuse of the Writer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("closing {actual:?} while {expected:?} was expected")]
    Mismatch { expected: Scope, actual: Scope },
    #[error("attempted to close the root scope")]
    Underflow,
    #[error("document finished with open scopes")]
    StillOpen,
    #[error("element not allowed directly inside {0:?}")]
    Misplaced(Scope),
    #[error("more than one value written into {0:?}")]
    TooManyValues(Scope),
    #[error("{0:?} closed without a value")]
    EmptyValue(Scope),
}

struct Frame {
    scope: Scope,
    count: usize,
}

/// Builds one XML-RPC response document.
pub struct Writer {
    buf: String,
    root: Frame,
    stack: Vec<Frame>,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(1024),
            root: Frame { scope: Scope::Root, count: 0 },
            stack: Vec::with_capacity(8),
        }
    }

    /// Consumes the writer and returns the finished document.
    ///
    /// # Errors
    /// Returns `ScopeError::StillOpen` if any element is still open.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        if !self.stack.is_empty() {
            return Err(ScopeError::StillOpen.into());
        }
        Ok(self.buf.into_bytes())
    }

    /// Returns a view of the finished document.
    pub fn as_str(&self) -> Result<&str> {
        if !self.stack.is_empty() {
            return Err(ScopeError::StillOpen.into());
        }
        Ok(&self.buf)
    }

    fn current(&mut self) -> &mut Frame {
        match self.stack.last_mut() {
            Some(frame) => frame,
            None => &mut self.root,
        }
    }

    fn check_value(&mut self) -> std::result::Result<(), ScopeError> {
        let frame = self.current();
        if !frame.scope.is_value_slot() {
            return Err(ScopeError::Misplaced(frame.scope));
        }
        if frame.count >= 1 {
            return Err(ScopeError::TooManyValues(frame.scope));
        }
        Ok(())
    }

    fn check_child(&mut self, parent: Scope) -> std::result::Result<(), ScopeError> {
        let frame = self.current();
        if frame.scope != parent {
            return Err(ScopeError::Misplaced(frame.scope));
        }
        if parent == Scope::Root && frame.count >= 1 {
            return Err(ScopeError::TooManyValues(Scope::Root));
        }
        Ok(())
    }

    fn on_value_written(&mut self) {
        self.current().count += 1;
    }

    fn begin_scope(&mut self, open: &str, scope: Scope) {
        self.buf.push_str(open);
        self.stack.push(Frame { scope, count: 0 });
    }

    fn end_scope(&mut self, expected: Scope) -> Result<()> {
        let Some(frame) = self.stack.last() else {
            return Err(ScopeError::Underflow.into());
        };
        if frame.scope != expected {
            return Err(ScopeError::Mismatch { expected, actual: frame.scope }.into());
        }
        if frame.scope.is_value_slot() && frame.count == 0 {
            return Err(ScopeError::EmptyValue(frame.scope).into());
        }

        self.stack.pop();
        self.buf.push_str(expected.close_tag());
        self.on_value_written();
        Ok(())
    }

    fn scalar(&mut self, open: &str, text: &str, close: &str) -> Result<()> {
        self.check_value()?;
        self.buf.push_str(open);
        self.buf.push_str(text);
        self.buf.push_str(close);
        self.on_value_written();
        Ok(())
    }

    /// Opens `<methodResponse><params>`.
    pub fn response_begin(&mut self) -> Result<()> {
        self.check_child(Scope::Root)?;
        self.begin_scope("<methodResponse><params>", Scope::Params);
        Ok(())
    }
    pub fn response_end(&mut self) -> Result<()> { self.end_scope(Scope::Params) }

    /// Opens `<param><value>`; exactly one value must follow.
    pub fn param_begin(&mut self) -> Result<()> {
        self.check_child(Scope::Params)?;
        self.begin_scope("<param><value>", Scope::Param);
        Ok(())
    }
    pub fn param_end(&mut self) -> Result<()> { self.end_scope(Scope::Param) }

    /// Opens `<methodResponse><fault><value>`; exactly one value must follow.
    pub fn fault_begin(&mut self) -> Result<()> {
        self.check_child(Scope::Root)?;
        self.begin_scope("<methodResponse><fault><value>", Scope::Fault);
        Ok(())
    }
    pub fn fault_end(&mut self) -> Result<()> { self.end_scope(Scope::Fault) }

    /// Writes a `<string>`, escaping `&`, `<` and `>`.
    pub fn string(&mut self, v: &str) -> Result<()> {
        self.scalar("<string>", &partial_escape(v), "</string>")
    }

    pub fn int(&mut self, v: i64) -> Result<()> {
        self.scalar("<int>", &v.to_string(), "</int>")
    }

    /// Unsigned values are written as-is, even above `i64::MAX`.
    pub fn uint(&mut self, v: u64) -> Result<()> {
        self.scalar("<int>", &v.to_string(), "</int>")
    }

    pub fn boolean(&mut self, v: bool) -> Result<()> {
        self.scalar("<boolean>", if v { "true" } else { "false" }, "</boolean>")
    }

    /// Writes the calendar fields as given; no zone suffix.
    pub fn datetime(&mut self, v: &NaiveDateTime) -> Result<()> {
        let text = v.format(DATETIME_FORMAT).to_string();
        self.scalar("<dateTime.iso8601>", &text, "</dateTime.iso8601>")
    }

    pub fn nil(&mut self) -> Result<()> {
        self.scalar("<nil/>", "", "")
    }

    /// Opens `<array><data>`.
    pub fn array_begin(&mut self) -> Result<()> {
        self.check_value()?;
        self.begin_scope("<array><data>", Scope::Array);
        Ok(())
    }
    pub fn array_end(&mut self) -> Result<()> { self.end_scope(Scope::Array) }

    /// Opens an array element's `<value>`; exactly one value must follow.
    pub fn item_begin(&mut self) -> Result<()> {
        self.check_child(Scope::Array)?;
        self.begin_scope("<value>", Scope::Item);
        Ok(())
    }
    pub fn item_end(&mut self) -> Result<()> { self.end_scope(Scope::Item) }

    /// Opens `<struct>`.
    pub fn struct_begin(&mut self) -> Result<()> {
        self.check_value()?;
        self.begin_scope("<struct>", Scope::Struct);
        Ok(())
    }
    pub fn struct_end(&mut self) -> Result<()> { self.end_scope(Scope::Struct) }

    /// Opens a named `<member>`; exactly one value must follow.
    pub fn member_begin(&mut self, name: &str) -> Result<()> {
        self.check_child(Scope::Struct)?;
        self.buf.push_str("<member><name>");
        self.buf.push_str(&partial_escape(name));
        self.buf.push_str("</name>");
        self.begin_scope("<value>", Scope::Member);
        Ok(())
    }
    pub fn member_end(&mut self) -> Result<()> { self.end_scope(Scope::Member) }
}
