//! Records
//!
//! A record is a sparse, type-tagged attribute bag with an identity. Records are plain owned
//! values: whoever receives one from a query or the store owns it.

pub mod accessor;

pub use accessor::{FromValue, ZeroPolicy};

use crate::error::ContextError;
use crate::types::{EntityReference, RecordId, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One business-data instance (order line, account, product, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub type_name: String,
    #[serde(default)]
    pub id: RecordId,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl Record {
    /// New record of the given type with no identity yet.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: Uuid::nil(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_id(type_name: impl Into<String>, id: RecordId) -> Self {
        Self {
            id,
            ..Self::new(type_name)
        }
    }

    /// The "no record" sentinel returned by lookups that found nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Record carrying only the identity of `reference`, used as an update target.
    pub fn identity_only(reference: &EntityReference) -> Self {
        Self::with_id(reference.type_name.clone(), reference.id)
    }

    /// Builder-style attribute insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// A record is valid when it names a type and carries an identity.
    pub fn is_valid(&self) -> bool {
        !self.type_name.is_empty() && !self.id.is_nil()
    }

    pub fn is_empty(&self) -> bool {
        self.type_name.is_empty() && self.id.is_nil() && self.attributes.is_empty()
    }

    pub fn to_reference(&self) -> EntityReference {
        EntityReference::new(self.type_name.clone(), self.id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Stored value exactly as held, alias wrappers included.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    /// Attribute names in sorted order.
    pub fn attribute_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.attributes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Upsert one attribute.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        accessor::set(self, name, value);
    }

    /// Lenient typed read using the legacy zero-equals-missing policy.
    pub fn get_or_default<T: FromValue>(&self, name: &str, default: T) -> Result<T, ContextError> {
        accessor::get_or_default(Some(self), name, default)
    }

    /// Presence-exact typed read.
    pub fn try_get<T: FromValue>(&self, name: &str) -> Result<Option<T>, ContextError> {
        accessor::try_get(Some(self), name)
    }

    /// Typed read that fails with `NotFound` when the attribute is absent.
    pub fn require<T: FromValue>(&self, name: &str) -> Result<T, ContextError> {
        self.try_get(name)?.ok_or_else(|| {
            ContextError::not_found(format!(
                "attribute '{}' on {}",
                name,
                self.type_name_or_placeholder()
            ))
        })
    }

    /// Copy of this record without identity and without the excluded attributes.
    ///
    /// Exclusion matches attribute names case-insensitively.
    pub fn clone_without(&self, excluded: &[&str]) -> Record {
        let mut clone = Record::new(self.type_name.clone());
        for (name, value) in &self.attributes {
            let lowered = name.to_lowercase();
            if !excluded.iter().any(|e| e.to_lowercase() == lowered) {
                clone.attributes.insert(name.clone(), value.clone());
            }
        }
        clone
    }

    fn type_name_or_placeholder(&self) -> &str {
        if self.type_name.is_empty() {
            "<empty record>"
        } else {
            &self.type_name
        }
    }
}
