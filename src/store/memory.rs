//! In-memory record store for tests, dry runs, and the CLI's scratch mode.

use super::{check_identity, check_type_name, merge_update, prepare_create, requests, RecordStore, StoreRequest, StoreResponse};
use crate::error::StoreError;
use crate::query::{eval, ColumnSet, QuerySpec, RecordPage};
use crate::record::Record;
use crate::types::{EntityReference, RecordId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

type RecordKey = (String, RecordId);
type LinkKey = (String, String, RecordId, String, RecordId);

#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<BTreeMap<RecordKey, Record>>,
    links: RwLock<BTreeSet<LinkKey>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Store `records` as-is, assigning identities where missing.
    pub fn seed(&self, records: impl IntoIterator<Item = Record>) -> Result<Vec<RecordId>, StoreError> {
        records.into_iter().map(|r| self.create(&r)).collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Every record of one type, in identity order.
    pub fn records_of_type(&self, type_name: &str) -> Vec<Record> {
        self.records
            .read()
            .iter()
            .filter(|((t, _), _)| t == type_name)
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Targets linked from `record` through `relationship`.
    pub fn related(&self, record: &EntityReference, relationship: &str) -> Vec<EntityReference> {
        self.links
            .read()
            .iter()
            .filter(|(rel, from_type, from_id, _, _)| {
                rel == relationship && *from_type == record.type_name && *from_id == record.id
            })
            .map(|(_, _, _, to_type, to_id)| EntityReference::new(to_type.clone(), *to_id))
            .collect()
    }
}

fn link_key(record: &EntityReference, relationship: &str, related: &EntityReference) -> LinkKey {
    (
        relationship.to_string(),
        record.type_name.clone(),
        record.id,
        related.type_name.clone(),
        related.id,
    )
}

impl RecordStore for InMemoryRecordStore {
    fn retrieve(&self, type_name: &str, id: RecordId, columns: &ColumnSet) -> Result<Record, StoreError> {
        let records = self.records.read();
        let record = records
            .get(&(type_name.to_string(), id))
            .ok_or_else(|| StoreError::NotFound {
                type_name: type_name.to_string(),
                id,
            })?;
        Ok(eval::project(record, columns))
    }

    fn retrieve_multiple(&self, query: &QuerySpec) -> Result<RecordPage, StoreError> {
        eval::execute(query, |type_name| Ok(self.records_of_type(type_name)))
    }

    fn create(&self, record: &Record) -> Result<RecordId, StoreError> {
        let stored = prepare_create(record)?;
        let key = (stored.type_name.clone(), stored.id);
        let mut records = self.records.write();
        if records.contains_key(&key) {
            return Err(StoreError::Rejected(format!(
                "{} {} already exists",
                stored.type_name, stored.id
            )));
        }
        let id = stored.id;
        records.insert(key, stored);
        Ok(id)
    }

    fn update(&self, record: &Record) -> Result<(), StoreError> {
        check_identity(record)?;
        let mut records = self.records.write();
        let existing = records
            .get_mut(&(record.type_name.clone(), record.id))
            .ok_or_else(|| StoreError::NotFound {
                type_name: record.type_name.clone(),
                id: record.id,
            })?;
        merge_update(existing, record);
        Ok(())
    }

    fn delete(&self, type_name: &str, id: RecordId) -> Result<(), StoreError> {
        check_type_name(type_name)?;
        self.records
            .write()
            .remove(&(type_name.to_string(), id))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                type_name: type_name.to_string(),
                id,
            })
    }

    fn associate(
        &self,
        record: &EntityReference,
        relationship: &str,
        related: &[EntityReference],
    ) -> Result<(), StoreError> {
        let mut links = self.links.write();
        for target in related {
            links.insert(link_key(record, relationship, target));
        }
        Ok(())
    }

    fn disassociate(
        &self,
        record: &EntityReference,
        relationship: &str,
        related: &[EntityReference],
    ) -> Result<(), StoreError> {
        let mut links = self.links.write();
        for target in related {
            links.remove(&link_key(record, relationship, target));
        }
        Ok(())
    }

    fn execute(&self, request: &StoreRequest) -> Result<StoreResponse, StoreError> {
        requests::execute_builtin(request, |type_name| Ok(self.records_of_type(type_name).len()))
    }
}
