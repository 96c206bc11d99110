//! Current-over-previous attribute resolution.
//!
//! On update events the current record holds only the attributes that changed; the
//! pre-operation image holds the rest. A [`DualSource`] reads the current value when the
//! attribute is present there and falls back to the image otherwise.

use crate::error::ContextError;
use crate::record::accessor::{decode, try_get};
use crate::record::{FromValue, Record};
use crate::types::Value;

#[derive(Debug, Clone, Copy)]
pub struct DualSource<'a> {
    current: Option<&'a Record>,
    previous: Option<&'a Record>,
}

impl<'a> DualSource<'a> {
    pub fn new(current: Option<&'a Record>, previous: Option<&'a Record>) -> Self {
        Self { current, previous }
    }

    /// Record that supplies `name`: current if it carries the attribute (even as null), else previous.
    fn source_of(&self, name: &str) -> Option<&'a Record> {
        self.current
            .filter(|r| r.contains(name))
            .or_else(|| self.previous.filter(|r| r.contains(name)))
    }

    pub fn has(&self, name: &str) -> bool {
        self.source_of(name).is_some()
    }

    pub fn raw(&self, name: &str) -> Option<&'a Value> {
        self.source_of(name).and_then(|r| r.raw(name))
    }

    /// Typed value; `NotFound` when neither record carries it.
    pub fn resolve<T: FromValue>(&self, name: &str) -> Result<T, ContextError> {
        let value = self
            .raw(name)
            .ok_or_else(|| ContextError::not_found(format!("attribute '{}' in current or previous record", name)))?;
        decode(name, value)
    }

    /// Typed value, or `default` when neither record carries it or it is null.
    pub fn resolve_or_default<T: FromValue>(&self, name: &str, default: T) -> Result<T, ContextError> {
        match self.raw(name) {
            None => Ok(default),
            Some(value) if value.unaliased().is_null() => Ok(T::from_value(&Value::Null).unwrap_or(default)),
            Some(value) => decode(name, value),
        }
    }

    /// Typed value, `None` when absent or null.
    pub fn try_resolve<T: FromValue>(&self, name: &str) -> Result<Option<T>, ContextError> {
        try_get(self.source_of(name), name)
    }
}
