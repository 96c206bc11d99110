//! Durable sled-backed record store.

use super::{check_identity, check_type_name, merge_update, prepare_create, requests, RecordStore, StoreRequest, StoreResponse};
use crate::error::StoreError;
use crate::query::{eval, ColumnSet, QuerySpec, RecordPage};
use crate::record::Record;
use crate::types::{EntityReference, RecordId};
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

const TREE_RECORDS: &str = "records";
const TREE_LINKS: &str = "links";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LinkRecord {
    relationship: String,
    from: EntityReference,
    to: EntityReference,
}

/// Records keyed `type:id`; relationship links keyed `relationship|type:id|type:id`.
///
/// Values are JSON so decimal and tagged attribute values survive unchanged.
#[derive(Clone)]
pub struct SledRecordStore {
    db: Db,
    records: Tree,
    links: Tree,
}

impl SledRecordStore {
    /// Open or create a store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::Io(format!("Failed to open sled database: {}", e)))?;
        Self::from_db(db)
    }

    pub fn from_db(db: Db) -> Result<Self, StoreError> {
        let records = db.open_tree(TREE_RECORDS).map_err(to_store_io)?;
        let links = db.open_tree(TREE_LINKS).map_err(to_store_io)?;
        Ok(Self { db, records, links })
    }

    pub fn shared<P: AsRef<Path>>(path: P) -> Result<Arc<Self>, StoreError> {
        Ok(Arc::new(Self::open(path)?))
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush().map_err(to_store_io)?;
        Ok(())
    }

    pub fn records_of_type(&self, type_name: &str) -> Result<Vec<Record>, StoreError> {
        let prefix = format!("{}:", type_name);
        let mut out = Vec::new();
        for item in self.records.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item.map_err(to_store_io)?;
            let record: Record = serde_json::from_slice(&value).map_err(to_store_data)?;
            out.push(record);
        }
        Ok(out)
    }

    pub fn related(&self, record: &EntityReference, relationship: &str) -> Result<Vec<EntityReference>, StoreError> {
        check_relationship(relationship)?;
        let prefix = format!("{}|{}|", relationship, reference_key(record));
        let mut out = Vec::new();
        for item in self.links.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item.map_err(to_store_io)?;
            let link: LinkRecord = serde_json::from_slice(&value).map_err(to_store_data)?;
            out.push(link.to);
        }
        Ok(out)
    }

    fn load(&self, type_name: &str, id: RecordId) -> Result<Record, StoreError> {
        let key = record_key(type_name, id);
        let Some(raw) = self.records.get(key.as_bytes()).map_err(to_store_io)? else {
            return Err(StoreError::NotFound {
                type_name: type_name.to_string(),
                id,
            });
        };
        serde_json::from_slice(&raw).map_err(to_store_data)
    }
}

fn record_key(type_name: &str, id: RecordId) -> String {
    format!("{}:{}", type_name, id)
}

fn reference_key(reference: &EntityReference) -> String {
    record_key(&reference.type_name, reference.id)
}

fn link_key(record: &EntityReference, relationship: &str, related: &EntityReference) -> String {
    format!(
        "{}|{}|{}",
        relationship,
        reference_key(record),
        reference_key(related)
    )
}

/// `|` separates link key parts, so it cannot appear in a relationship name.
fn check_relationship(relationship: &str) -> Result<(), StoreError> {
    if relationship.is_empty() || relationship.contains('|') {
        return Err(StoreError::Rejected(format!(
            "invalid relationship name '{}'",
            relationship
        )));
    }
    Ok(())
}

fn to_store_io(err: sled::Error) -> StoreError {
    StoreError::Io(err.to_string())
}

fn to_store_data(err: serde_json::Error) -> StoreError {
    StoreError::Data(err.to_string())
}

impl RecordStore for SledRecordStore {
    fn retrieve(&self, type_name: &str, id: RecordId, columns: &ColumnSet) -> Result<Record, StoreError> {
        let record = self.load(type_name, id)?;
        Ok(eval::project(&record, columns))
    }

    fn retrieve_multiple(&self, query: &QuerySpec) -> Result<RecordPage, StoreError> {
        eval::execute(query, |type_name| self.records_of_type(type_name))
    }

    fn create(&self, record: &Record) -> Result<RecordId, StoreError> {
        let stored = prepare_create(record)?;
        let key = record_key(&stored.type_name, stored.id);
        let value = serde_json::to_vec(&stored).map_err(to_store_data)?;
        self.records
            .compare_and_swap(key.as_bytes(), None as Option<&[u8]>, Some(value))
            .map_err(to_store_io)?
            .map_err(|_| StoreError::Rejected(format!("{} {} already exists", stored.type_name, stored.id)))?;
        Ok(stored.id)
    }

    /// Merge `record` into the stored copy with a compare-and-swap loop, so concurrent updates
    /// of different attributes on one record all land.
    fn update(&self, record: &Record) -> Result<(), StoreError> {
        check_identity(record)?;
        let key = record_key(&record.type_name, record.id);
        loop {
            let Some(current) = self.records.get(key.as_bytes()).map_err(to_store_io)? else {
                return Err(StoreError::NotFound {
                    type_name: record.type_name.clone(),
                    id: record.id,
                });
            };
            let mut merged: Record = serde_json::from_slice(&current).map_err(to_store_data)?;
            merge_update(&mut merged, record);
            let value = serde_json::to_vec(&merged).map_err(to_store_data)?;
            let swapped = self
                .records
                .compare_and_swap(key.as_bytes(), Some(&current), Some(value))
                .map_err(to_store_io)?;
            if swapped.is_ok() {
                return Ok(());
            }
            trace!(key = %key, "Concurrent write, retrying update");
        }
    }

    fn delete(&self, type_name: &str, id: RecordId) -> Result<(), StoreError> {
        check_type_name(type_name)?;
        let removed = self
            .records
            .remove(record_key(type_name, id).as_bytes())
            .map_err(to_store_io)?;
        match removed {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                type_name: type_name.to_string(),
                id,
            }),
        }
    }

    fn associate(
        &self,
        record: &EntityReference,
        relationship: &str,
        related: &[EntityReference],
    ) -> Result<(), StoreError> {
        check_relationship(relationship)?;
        let mut batch = sled::Batch::default();
        for target in related {
            let link = LinkRecord {
                relationship: relationship.to_string(),
                from: record.clone(),
                to: target.clone(),
            };
            let value = serde_json::to_vec(&link).map_err(to_store_data)?;
            batch.insert(link_key(record, relationship, target).as_bytes(), value);
        }
        self.links.apply_batch(batch).map_err(to_store_io)?;
        Ok(())
    }

    fn disassociate(
        &self,
        record: &EntityReference,
        relationship: &str,
        related: &[EntityReference],
    ) -> Result<(), StoreError> {
        check_relationship(relationship)?;
        let mut batch = sled::Batch::default();
        for target in related {
            batch.remove(link_key(record, relationship, target).as_bytes());
        }
        self.links.apply_batch(batch).map_err(to_store_io)?;
        Ok(())
    }

    fn execute(&self, request: &StoreRequest) -> Result<StoreResponse, StoreError> {
        requests::execute_builtin(request, |type_name| {
            let prefix = format!("{}:", type_name);
            let mut count = 0;
            for item in self.records.scan_prefix(prefix.as_bytes()) {
                item.map_err(to_store_io)?;
                count += 1;
            }
            Ok(count)
        })
    }
}
