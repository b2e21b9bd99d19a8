use super::{DocumentStore, authorize, sort_newest_first};
use crate::types::{DocumentId, DocumentRecord, OwnerId};
use crate::{DocvaultError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    records: Arc<DashMap<DocumentId, DocumentRecord>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records across all owners.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, mut record: DocumentRecord) -> Result<()> {
        match self.records.entry(record.id) {
            Entry::Occupied(mut existing) => {
                record.raw_content = std::mem::take(&mut existing.get_mut().raw_content);
                existing.insert(record);
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
        Ok(())
    }

    async fn get(&self, id: &DocumentId, owner: &OwnerId) -> Result<DocumentRecord> {
        let record = self
            .records
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DocvaultError::not_found(id))?;
        authorize(&record, owner)?;
        Ok(record)
    }

    async fn list_all(&self, owner: &OwnerId) -> Result<Vec<DocumentRecord>> {
        let mut records: Vec<DocumentRecord> = self
            .records
            .iter()
            .filter(|entry| entry.value().owner_id == *owner)
            .map(|entry| entry.value().without_content())
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn delete(&self, id: &DocumentId, owner: &OwnerId) -> Result<()> {
        match self.records.entry(*id) {
            Entry::Occupied(existing) => {
                authorize(existing.get(), owner)?;
                existing.remove();
                Ok(())
            }
            Entry::Vacant(_) => Err(DocvaultError::not_found(id)),
        }
    }
}
