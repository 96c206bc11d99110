//! Attribute value types shared by records, queries, and parameters.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a record. `Uuid::nil()` means "no identity yet".
pub type RecordId = Uuid;

/// Handle to a record without its attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityReference {
    pub type_name: String,
    pub id: RecordId,
}

impl EntityReference {
    pub fn new(type_name: impl Into<String>, id: RecordId) -> Self {
        Self {
            type_name: type_name.into(),
            id,
        }
    }
}

impl fmt::Display for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name, self.id)
    }
}

/// A value produced by a joined query, tagged with the join alias it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasedValue {
    pub alias: String,
    pub source_attribute: String,
    pub value: Value,
}

/// Closed set of attribute value kinds understood by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Boolean(bool),
    Guid(Uuid),
    DateTime(DateTime<Utc>),
    OptionSet(i32),
    Reference(EntityReference),
    Aliased(Box<AliasedValue>),
}

/// Discriminant of [`Value`], used in error messages and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Text,
    Integer,
    Float,
    Decimal,
    Boolean,
    Guid,
    DateTime,
    OptionSet,
    Reference,
    Aliased,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Text => "text",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Decimal => "decimal",
            ValueKind::Boolean => "boolean",
            ValueKind::Guid => "guid",
            ValueKind::DateTime => "datetime",
            ValueKind::OptionSet => "option set",
            ValueKind::Reference => "entity reference",
            ValueKind::Aliased => "aliased value",
        }
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Text(_) => ValueKind::Text,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Guid(_) => ValueKind::Guid,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::OptionSet(_) => ValueKind::OptionSet,
            Value::Reference(_) => ValueKind::Reference,
            Value::Aliased(_) => ValueKind::Aliased,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The value with any alias wrapper removed.
    pub fn unaliased(&self) -> &Value {
        match self {
            Value::Aliased(aliased) => aliased.value.unaliased(),
            other => other,
        }
    }

    /// Text form used when a value is written into query markup or compared loosely.
    pub fn to_query_text(&self) -> String {
        match self.unaliased() {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Decimal(d) => d.normalize().to_string(),
            Value::Boolean(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Guid(g) => g.to_string(),
            Value::DateTime(dt) => dt.to_rfc3339(),
            Value::OptionSet(o) => o.to_string(),
            Value::Reference(r) => r.id.to_string(),
            Value::Aliased(_) => String::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Reference(r) => write!(f, "{}", r),
            Value::Aliased(a) => write!(f, "{}.{}={}", a.alias, a.source_attribute, a.value),
            other => write!(f, "{}", other.to_query_text()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Guid(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl From<EntityReference> for Value {
    fn from(value: EntityReference) -> Self {
        Value::Reference(value)
    }
}

impl From<AliasedValue> for Value {
    fn from(value: AliasedValue) -> Self {
        Value::Aliased(Box::new(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
