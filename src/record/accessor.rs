//! Typed attribute access over a record.
//!
//! Values are matched against the requested Rust type; alias wrappers from joined queries are
//! unwrapped unless the caller asks for [`AliasedValue`] itself.

use super::Record;
use crate::error::ContextError;
use crate::types::{AliasedValue, EntityReference, Value};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a lenient read treats a stored value equal to the type's zero value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroPolicy {
    /// Zero, false, empty text, and nil ids read as "missing" and yield the default.
    #[default]
    ZeroIsMissing,
    /// Only an absent or null attribute yields the default.
    Strict,
}

/// Conversion from a stored [`Value`] into a concrete Rust type.
pub trait FromValue: Sized {
    /// Name used in `TypeMismatch` errors.
    const KIND: &'static str;

    /// Set for the wrapper type itself so the accessor does not unwrap it.
    const ACCEPTS_ALIASED: bool = false;

    /// `None` when the value's kind cannot represent `Self`.
    fn from_value(value: &Value) -> Option<Self>;

    fn is_zero(&self) -> bool;
}

impl FromValue for String {
    const KIND: &'static str = "text";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl FromValue for i64 {
    const KIND: &'static str = "integer";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl FromValue for i32 {
    const KIND: &'static str = "integer";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => i32::try_from(*i).ok(),
            Value::OptionSet(o) => Some(*o),
            _ => None,
        }
    }

    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl FromValue for f64 {
    const KIND: &'static str = "float";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

impl FromValue for Decimal {
    const KIND: &'static str = "decimal";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Decimal(d) => Some(*d),
            Value::Integer(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }

    fn is_zero(&self) -> bool {
        Decimal::is_zero(self)
    }
}

impl FromValue for bool {
    const KIND: &'static str = "boolean";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    fn is_zero(&self) -> bool {
        !*self
    }
}

impl FromValue for Uuid {
    const KIND: &'static str = "guid";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Guid(g) => Some(*g),
            _ => None,
        }
    }

    fn is_zero(&self) -> bool {
        self.is_nil()
    }
}

impl FromValue for DateTime<Utc> {
    const KIND: &'static str = "datetime";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    fn is_zero(&self) -> bool {
        self.timestamp() == 0 && self.timestamp_subsec_nanos() == 0
    }
}

impl FromValue for EntityReference {
    const KIND: &'static str = "entity reference";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Reference(r) => Some(r.clone()),
            _ => None,
        }
    }

    fn is_zero(&self) -> bool {
        false
    }
}

impl FromValue for AliasedValue {
    const KIND: &'static str = "aliased value";
    const ACCEPTS_ALIASED: bool = true;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Aliased(a) => Some((**a).clone()),
            _ => None,
        }
    }

    fn is_zero(&self) -> bool {
        false
    }
}

impl FromValue for Value {
    const KIND: &'static str = "value";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }

    fn is_zero(&self) -> bool {
        self.is_null()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const KIND: &'static str = T::KIND;
    const ACCEPTS_ALIASED: bool = T::ACCEPTS_ALIASED;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

/// Value to hand to `T`, with the alias wrapper removed when `T` does not want it.
fn target_value<T: FromValue>(value: &Value) -> &Value {
    match value {
        Value::Aliased(aliased) if !T::ACCEPTS_ALIASED => aliased.value.unaliased(),
        other => other,
    }
}

/// Convert one stored value, reporting a mismatch against `name`.
pub fn decode<T: FromValue>(name: &str, value: &Value) -> Result<T, ContextError> {
    let target = target_value::<T>(value);
    T::from_value(target).ok_or_else(|| ContextError::TypeMismatch {
        attribute: name.to_string(),
        expected: T::KIND,
        actual: target.kind().as_str(),
    })
}

/// Lenient typed read under an explicit zero policy.
///
/// Absent record, absent attribute, or a null value yield `default`. Under
/// [`ZeroPolicy::ZeroIsMissing`] a stored zero value yields `default` as well.
pub fn get_with<T: FromValue>(
    record: Option<&Record>,
    name: &str,
    default: T,
    policy: ZeroPolicy,
) -> Result<T, ContextError> {
    let Some(value) = record.and_then(|r| r.raw(name)) else {
        return Ok(default);
    };
    if target_value::<T>(value).is_null() && T::from_value(&Value::Null).is_none() {
        return Ok(default);
    }
    let decoded: T = decode(name, value)?;
    if policy == ZeroPolicy::ZeroIsMissing && decoded.is_zero() {
        return Ok(default);
    }
    Ok(decoded)
}

/// Lenient typed read with the legacy zero-equals-missing behavior.
pub fn get_or_default<T: FromValue>(
    record: Option<&Record>,
    name: &str,
    default: T,
) -> Result<T, ContextError> {
    get_with(record, name, default, ZeroPolicy::ZeroIsMissing)
}

/// Presence-exact typed read: no default and no zero coalescing.
///
/// `None` means the attribute is absent, or holds null and `T` cannot represent null. To tell
/// a stored null from a missing key, ask for `Option<T>` (or [`Value`]): a stored null then
/// reads as `Some(None)` (or `Some(Value::Null)`) while a missing key stays `None`.
pub fn try_get<T: FromValue>(record: Option<&Record>, name: &str) -> Result<Option<T>, ContextError> {
    let Some(value) = record.and_then(|r| r.raw(name)) else {
        return Ok(None);
    };
    let target = target_value::<T>(value);
    if target.is_null() {
        return Ok(T::from_value(target));
    }
    decode(name, value).map(Some)
}

/// Insert or overwrite one attribute.
pub fn set(record: &mut Record, name: impl Into<String>, value: impl Into<Value>) {
    record.attributes.insert(name.into(), value.into());
}
