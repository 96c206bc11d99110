//! Shared test doubles.

use parking_lot::Mutex;
use record_hooks::query::{ColumnSet, QuerySpec, RecordPage};
use record_hooks::store::{InMemoryRecordStore, RecordStore, StoreRequest, StoreResponse};
use record_hooks::types::{EntityReference, RecordId};
use record_hooks::{Record, StoreError};
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory store that counts page requests and can fail a chosen one.
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryRecordStore,
    calls: AtomicUsize,
    fail_on_call: Mutex<Option<usize>>,
    pub queries: Mutex<Vec<QuerySpec>>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `call`-th page request (1-based) fail with an I/O error.
    pub fn fail_on(&self, call: usize) {
        *self.fail_on_call.lock() = Some(call);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RecordStore for CountingStore {
    fn retrieve(&self, type_name: &str, id: RecordId, columns: &ColumnSet) -> Result<Record, StoreError> {
        self.inner.retrieve(type_name, id, columns)
    }

    fn retrieve_multiple(&self, query: &QuerySpec) -> Result<RecordPage, StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.queries.lock().push(query.clone());
        if *self.fail_on_call.lock() == Some(call) {
            return Err(StoreError::Io("connection reset".to_string()));
        }
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
        self.inner.execute(request)
    }
}
