//! # Reply Encoder
//!
//! Serializes typed reply records into `methodResponse` documents.
//!
//! ## Invariants
//! - **All or Nothing**: A failing field aborts the document; no partial output escapes.
//! - **Deterministic**: The same record always yields the same bytes.

use std::fmt;

use chrono::DateTime;
use chrono::NaiveDateTime;
use chrono::TimeZone;
use tracing::error;
use tracing::trace;

use crate::bind::Record;
use crate::error::Error;
use crate::error::Result;
use crate::value::Value;
use crate::xml::Writer;

/// A type that can be written as exactly one XML-RPC value.
pub trait Encode {
    fn encode(&self, w: &mut Writer) -> Result<()>;
}

/// Encodes a reply record, one `<param>` per top-level field.
pub fn encode_reply<T: Record>(reply: &T) -> Result<Vec<u8>> {
    let mut w = Writer::new();
    match write_reply(reply, &mut w) {
        Ok(()) => w.into_bytes(),
        Err(e) => {
            error!(error = %e, "xmlrpc: error marshalling reply");
            Err(e)
        }
    }
}

fn write_reply<T: Record>(reply: &T, w: &mut Writer) -> Result<()> {
    w.response_begin()?;
    for index in 0..T::FIELDS.len() {
        w.param_begin()?;
        reply.encode_field(index, w)?;
        w.param_end()?;
    }
    w.response_end()
}

/// Encodes a `<fault>` document carrying `faultCode` and `faultString`.
pub fn encode_fault(code: i64, message: &str) -> Result<Vec<u8>> {
    let mut w = Writer::new();
    w.fault_begin()?;
    w.struct_begin()?;
    w.member_begin("faultCode")?;
    w.int(code)?;
    w.member_end()?;
    w.member_begin("faultString")?;
    w.string(message)?;
    w.member_end()?;
    w.struct_end()?;
    w.fault_end()?;
    w.into_bytes()
}

/// Writes a record as a `<struct>`, members in declaration order.
///
/// Member names are the field tags, or the declared names when untagged.
pub fn encode_struct<T: Record>(record: &T, w: &mut Writer) -> Result<()> {
    w.struct_begin()?;
    for (index, field) in T::FIELDS.iter().enumerate() {
        trace!(field = field.name, member = field.wire_name(), "xmlrpc: marshalling struct member");
        w.member_begin(field.wire_name())?;
        record.encode_field(index, w)?;
        w.member_end()?;
    }
    w.struct_end()
}

impl Encode for str {
    fn encode(&self, w: &mut Writer) -> Result<()> { w.string(self) }
}

impl Encode for String {
    fn encode(&self, w: &mut Writer) -> Result<()> { w.string(self) }
}

impl Encode for bool {
    fn encode(&self, w: &mut Writer) -> Result<()> { w.boolean(*self) }
}

impl Encode for NaiveDateTime {
    fn encode(&self, w: &mut Writer) -> Result<()> { w.datetime(self) }
}

/// Calendar fields in the instant's own offset; the offset itself is dropped.
impl<Tz: TimeZone> Encode for DateTime<Tz>
where
    Tz::Offset: fmt::Display,
{
    fn encode(&self, w: &mut Writer) -> Result<()> { w.datetime(&self.naive_local()) }
}

macro_rules! encode_int {
    ($method:ident, $wide:ty; $($ty:ty),*) => {$(
        impl Encode for $ty {
            fn encode(&self, w: &mut Writer) -> Result<()> { w.$method(*self as $wide) }
        }
    )*};
}

encode_int!(int, i64; i8, i16, i32, i64, isize);
encode_int!(uint, u64; u8, u16, u32, u64, usize);

/// `double` is outside the supported wire vocabulary.
macro_rules! encode_unsupported {
    ($($ty:ty => $kind:literal),*) => {$(
        impl Encode for $ty {
            fn encode(&self, _w: &mut Writer) -> Result<()> { Err(Error::UnsupportedKind($kind)) }
        }
    )*};
}

encode_unsupported!(f32 => "f32", f64 => "f64");

impl<T: Encode> Encode for [T] {
    fn encode(&self, w: &mut Writer) -> Result<()> {
        w.array_begin()?;
        for item in self {
            w.item_begin()?;
            item.encode(w)?;
            w.item_end()?;
        }
        w.array_end()
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, w: &mut Writer) -> Result<()> { self.as_slice().encode(w) }
}

/// `None` is written as `<nil/>`.
impl<T: Encode> Encode for Option<T> {
    fn encode(&self, w: &mut Writer) -> Result<()> {
        match self {
            Some(v) => v.encode(w),
            None => w.nil(),
        }
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, w: &mut Writer) -> Result<()> { (**self).encode(w) }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self, w: &mut Writer) -> Result<()> { (**self).encode(w) }
}

impl Encode for Value {
    fn encode(&self, w: &mut Writer) -> Result<()> {
        match self {
            Value::String(s) => w.string(s),
            Value::Integer(i) => w.int(*i),
            Value::Boolean(b) => w.boolean(*b),
            Value::Timestamp(t) => w.datetime(t),
            Value::List(items) => items.encode(w),
            Value::Struct(members) => {
                w.struct_begin()?;
                for (name, value) in members {
                    w.member_begin(name)?;
                    value.encode(w)?;
                    w.member_end()?;
                }
                w.struct_end()
            }
        }
    }
}
