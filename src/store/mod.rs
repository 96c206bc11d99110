//! Record store
//!
//! The platform's data service, seen from a handler: single-record CRUD, paged multi-record
//! queries, relationship links, and named requests. Implementations are shared between
//! threads; each execution context opens its own caller-scoped handle through a
//! [`StoreProvider`].

pub mod memory;
pub mod persistence;
pub mod requests;

pub use memory::InMemoryRecordStore;
pub use persistence::SledRecordStore;
pub use requests::{RetrieveRecordCount, StoreMessage, WhoAmI};

use crate::error::StoreError;
use crate::event::ParameterBag;
use crate::query::{ColumnSet, QuerySpec, RecordPage};
use crate::record::Record;
use crate::types::{EntityReference, RecordId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A named request outside plain CRUD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRequest {
    pub name: String,
    #[serde(default)]
    pub parameters: ParameterBag,
}

impl StoreRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: ParameterBag::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreResponse {
    pub name: String,
    #[serde(default)]
    pub results: ParameterBag,
}

/// Data-access operations a handler can perform.
pub trait RecordStore: Send + Sync {
    /// Single record by identity; `NotFound` when absent.
    fn retrieve(&self, type_name: &str, id: RecordId, columns: &ColumnSet) -> Result<Record, StoreError>;

    /// One page of results for `query`.
    fn retrieve_multiple(&self, query: &QuerySpec) -> Result<RecordPage, StoreError>;

    /// Persist a new record and return its identity. A nil id is replaced with a fresh one.
    fn create(&self, record: &Record) -> Result<RecordId, StoreError>;

    /// Overwrite the attributes present on `record`; others are left as stored.
    fn update(&self, record: &Record) -> Result<(), StoreError>;

    fn delete(&self, type_name: &str, id: RecordId) -> Result<(), StoreError>;

    fn associate(
        &self,
        record: &EntityReference,
        relationship: &str,
        related: &[EntityReference],
    ) -> Result<(), StoreError>;

    fn disassociate(
        &self,
        record: &EntityReference,
        relationship: &str,
        related: &[EntityReference],
    ) -> Result<(), StoreError>;

    fn execute(&self, request: &StoreRequest) -> Result<StoreResponse, StoreError>;
}

/// Hands out store handles scoped to a calling user.
pub trait StoreProvider: Send + Sync {
    fn open(&self, caller_id: Uuid) -> Result<Arc<dyn RecordStore>, StoreError>;
}

impl<S: RecordStore + 'static> StoreProvider for Arc<S> {
    fn open(&self, caller_id: Uuid) -> Result<Arc<dyn RecordStore>, StoreError> {
        Ok(Arc::new(CallerScopedStore {
            inner: Arc::clone(self),
            caller_id,
        }))
    }
}

/// A shared store seen through one caller's identity. Answers `WhoAmI` itself.
pub struct CallerScopedStore<S> {
    inner: Arc<S>,
    caller_id: Uuid,
}

impl<S: RecordStore> RecordStore for CallerScopedStore<S> {
    fn retrieve(&self, type_name: &str, id: RecordId, columns: &ColumnSet) -> Result<Record, StoreError> {
        self.inner.retrieve(type_name, id, columns)
    }

    fn retrieve_multiple(&self, query: &QuerySpec) -> Result<RecordPage, StoreError> {
        self.inner.retrieve_multiple(query)
    }

    fn create(&self, record: &Record) -> Result<RecordId, StoreError> {
        self.inner.create(record)
    }

    fn update(&self, record: &Record) -> Result<(), StoreError> {
        self.inner.update(record)
    }

    fn delete(&self, type_name: &str, id: RecordId) -> Result<(), StoreError> {
        self.inner.delete(type_name, id)
    }

    fn associate(
        &self,
        record: &EntityReference,
        relationship: &str,
        related: &[EntityReference],
    ) -> Result<(), StoreError> {
        self.inner.associate(record, relationship, related)
    }

    fn disassociate(
        &self,
        record: &EntityReference,
        relationship: &str,
        related: &[EntityReference],
    ) -> Result<(), StoreError> {
        self.inner.disassociate(record, relationship, related)
    }

    fn execute(&self, request: &StoreRequest) -> Result<StoreResponse, StoreError> {
        if request.name == WhoAmI::NAME {
            return Ok(requests::who_am_i_response(self.caller_id));
        }
        self.inner.execute(request)
    }
}

/// Identity-assigned copy of a record about to be created.
pub(crate) fn prepare_create(record: &Record) -> Result<Record, StoreError> {
    check_type_name(&record.type_name)?;
    let mut stored = record.clone();
    if stored.id.is_nil() {
        stored.id = Uuid::new_v4();
    }
    Ok(stored)
}

/// Apply the attributes present on `changes` to `existing`.
pub(crate) fn merge_update(existing: &mut Record, changes: &Record) {
    for (name, value) in &changes.attributes {
        existing.attributes.insert(name.clone(), value.clone());
    }
}

pub(crate) fn check_type_name(type_name: &str) -> Result<(), StoreError> {
    if type_name.is_empty() {
        return Err(StoreError::Rejected("record has no type name".to_string()));
    }
    if type_name.contains(|c: char| c == ':' || c == '|' || c.is_whitespace()) {
        return Err(StoreError::Rejected(format!(
            "invalid type name '{}'",
            type_name
        )));
    }
    Ok(())
}

pub(crate) fn check_identity(record: &Record) -> Result<(), StoreError> {
    check_type_name(&record.type_name)?;
    if record.id.is_nil() {
        return Err(StoreError::Rejected(format!(
            "{} record has no identity",
            record.type_name
        )));
    }
    Ok(())
}
