//! # Parameter Binder
//!
//! Walks a typed record and a list of dynamic values in lockstep, coercing
//! each value into the field at the same position.
//!
//! ## Matching
//!
//! Struct members are matched to fields through the static `Field` table a
//! record carries (see `#[derive(Record)]`):
//!
//! 1.  A field whose tag equals the member name exactly.
//! 2.  Otherwise, a field whose declared name equals the member name ignoring
//!     ASCII case (`Who` and `who` both reach a field named `who`).
//!
//! The first field in declaration order wins. Members that match nothing are
//! ignored; fields that no member reaches keep their current value.

use chrono::DateTime;
use chrono::FixedOffset;
use chrono::Local;
use chrono::NaiveDateTime;
use chrono::TimeZone;
use chrono::Utc;
use tracing::debug;
use tracing::error;
use tracing::trace;

use crate::error::Error;
use crate::error::Result;
use crate::value::Kind;
use crate::value::Value;
use crate::value::DATETIME_FORMAT;
use crate::xml::Writer;

/// Declaration-time metadata for one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// The field's declared identifier.
    pub name: &'static str,
    /// The explicit wire name, if the field was tagged.
    pub tag: Option<&'static str>,
}

impl Field {
    /// The member name used on the wire.
    pub fn wire_name(&self) -> &'static str {
        self.tag.unwrap_or(self.name)
    }
}

/// Finds the field a wire member binds to.
pub fn find_field(fields: &[Field], member: &str) -> Option<usize> {
    fields
        .iter()
        .position(|f| f.tag == Some(member))
        .or_else(|| fields.iter().position(|f| f.name.eq_ignore_ascii_case(member)))
}

/// A statically declared record with an ordered field table.
///
/// Implemented by `#[derive(Record)]`; the derive also provides the `Bind`
/// and `Encode` impls that route through `bind_struct` and `encode_struct`.
pub trait Record {
    /// Fields in declaration order.
    const FIELDS: &'static [Field];

    /// Binds the field at `index` from `value`.
    fn bind_field(&mut self, index: usize, value: &Value) -> Result<()>;

    /// Writes the field at `index` as one value.
    fn encode_field(&self, index: usize, w: &mut Writer) -> Result<()>;
}

/// A target a dynamic value can be coerced into.
pub trait Bind {
    /// Overwrites `self` from `value`. Sequences append instead.
    fn bind(&mut self, value: &Value) -> Result<()>;
}

fn mismatch(expected: Kind, value: &Value) -> Error {
    Error::TypeMismatch { expected, actual: value.kind() }
}

/// Binds a full parameter list onto `target`, one value per field.
///
/// # Errors
/// Returns `ArityMismatch` before touching `target` if the counts differ.
/// A failure on a later field leaves earlier fields bound.
pub fn bind_params<T: Record>(params: &[Value], target: &mut T) -> Result<()> {
    let expected = T::FIELDS.len();
    if expected != params.len() {
        error!(expected, actual = params.len(), "xmlrpc: wrong number of arguments");
        return Err(Error::ArityMismatch { expected, actual: params.len() });
    }

    for (index, param) in params.iter().enumerate() {
        if let Err(e) = target.bind_field(index, param) {
            error!(field = T::FIELDS[index].name, error = %e, "xmlrpc: error mapping incoming param to field");
            return Err(e);
        }
    }
    Ok(())
}

/// Binds a `Struct` value onto a record by member name.
pub fn bind_struct<T: Record>(target: &mut T, value: &Value) -> Result<()> {
    let Value::Struct(members) = value else {
        return Err(mismatch(Kind::Struct, value));
    };

    for (name, member) in members {
        match find_field(T::FIELDS, name) {
            Some(index) => {
                debug!(member = %name, field = T::FIELDS[index].name, "xmlrpc: struct field match");
                target.bind_field(index, member)?;
            }
            None => trace!(member = %name, "xmlrpc: ignoring unmatched struct member"),
        }
    }
    Ok(())
}

impl Bind for String {
    fn bind(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::String(s) => {
                self.clone_from(s);
                Ok(())
            }
            other => Err(mismatch(Kind::String, other)),
        }
    }
}

impl Bind for bool {
    fn bind(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Boolean(b) => {
                *self = *b;
                Ok(())
            }
            other => Err(mismatch(Kind::Boolean, other)),
        }
    }
}

impl Bind for NaiveDateTime {
    fn bind(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Timestamp(t) => {
                *self = *t;
                Ok(())
            }
            other => Err(mismatch(Kind::Timestamp, other)),
        }
    }
}

/// The wire carries no zone, so a timestamp is read as local wall time.
///
/// A time the local zone skips or repeats is a `TypeCoercion`.
fn resolve_local(value: &Value, kind: &'static str) -> Result<DateTime<Local>> {
    let Value::Timestamp(t) = value else {
        return Err(mismatch(Kind::Timestamp, value));
    };
    Local.from_local_datetime(t).single().ok_or_else(|| Error::TypeCoercion {
        kind,
        text: t.format(DATETIME_FORMAT).to_string(),
    })
}

impl Bind for DateTime<Local> {
    fn bind(&mut self, value: &Value) -> Result<()> {
        *self = resolve_local(value, "DateTime<Local>")?;
        Ok(())
    }
}

impl Bind for DateTime<FixedOffset> {
    fn bind(&mut self, value: &Value) -> Result<()> {
        *self = resolve_local(value, "DateTime<FixedOffset>")?.fixed_offset();
        Ok(())
    }
}

impl Bind for DateTime<Utc> {
    fn bind(&mut self, value: &Value) -> Result<()> {
        *self = resolve_local(value, "DateTime<Utc>")?.with_timezone(&Utc);
        Ok(())
    }
}

/// Integers narrower than `i64` are range-checked.
macro_rules! bind_int {
    ($($ty:ty),* $(,)?) => {$(
        impl Bind for $ty {
            fn bind(&mut self, value: &Value) -> Result<()> {
                match value {
                    Value::Integer(i) => {
                        *self = <$ty>::try_from(*i).map_err(|_| Error::TypeCoercion {
                            kind: stringify!($ty),
                            text: i.to_string(),
                        })?;
                        Ok(())
                    }
                    other => Err(mismatch(Kind::Integer, other)),
                }
            }
        }
    )*};
}

bind_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// No wire type decodes to a float.
macro_rules! bind_unsupported {
    ($($ty:ty => $kind:literal),*) => {$(
        impl Bind for $ty {
            fn bind(&mut self, _value: &Value) -> Result<()> { Err(Error::UnsupportedKind($kind)) }
        }
    )*};
}

bind_unsupported!(f32 => "f32", f64 => "f64");

/// Elements are coerced into fresh defaults, then appended as a whole.
impl<T: Bind + Default> Bind for Vec<T> {
    fn bind(&mut self, value: &Value) -> Result<()> {
        let Value::List(items) = value else {
            return Err(mismatch(Kind::List, value));
        };

        let mut bound = Vec::with_capacity(items.len());
        for item in items {
            let mut target = T::default();
            if let Err(e) = target.bind(item) {
                error!(error = %e, "xmlrpc: error mapping element of slice");
                return Err(e);
            }
            bound.push(target);
        }
        self.extend(bound);
        Ok(())
    }
}

impl<T: Bind + Default> Bind for Option<T> {
    fn bind(&mut self, value: &Value) -> Result<()> {
        let mut target = T::default();
        target.bind(value)?;
        *self = Some(target);
        Ok(())
    }
}
