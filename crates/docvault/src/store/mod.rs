//! Owner-scoped document persistence.
//!
//! [`DocumentStore`] is the only durable state of the vault. Every read and
//! delete is checked against the caller's identity through
//! [`access::authorize`]; `put` is unchecked because only the pipeline writes.
//!
//! Two implementations ship with the crate:
//!
//! - [`FsDocumentStore`]: one MessagePack record and one blob file per document.
//! - [`MemoryDocumentStore`]: a concurrent map, for tests and embedders that
//!   do not need durability.

pub mod access;
pub mod fs;
pub mod memory;

pub use access::authorize;
pub use fs::FsDocumentStore;
pub use memory::MemoryDocumentStore;

use crate::Result;
use crate::types::{DeleteOutcome, DocumentExport, DocumentId, DocumentRecord, OwnerId, StorageStats};
use async_trait::async_trait;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn name(&self) -> &str;

    /// Insert or overwrite a record by id.
    ///
    /// The raw bytes of an existing document are never replaced.
    async fn put(&self, record: DocumentRecord) -> Result<()>;

    /// Fetch one record, raw bytes included.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `AccessDenied` for another owner's record.
    async fn get(&self, id: &DocumentId, owner: &OwnerId) -> Result<DocumentRecord>;

    /// All records belonging to `owner`, newest first.
    ///
    /// Listings carry metadata and text only: `raw_content` is empty. Use
    /// [`DocumentStore::get`] for the bytes.
    async fn list_all(&self, owner: &OwnerId) -> Result<Vec<DocumentRecord>>;

    /// Remove one record and its bytes.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `AccessDenied` for another owner's record.
    async fn delete(&self, id: &DocumentId, owner: &OwnerId) -> Result<()>;

    /// Delete each id independently. One outcome per id, in input order.
    async fn delete_many(&self, ids: &[DocumentId], owner: &OwnerId) -> Vec<DeleteOutcome> {
        let mut outcomes = Vec::with_capacity(ids.len());
        for id in ids {
            let outcome = match self.delete(id, owner).await {
                Ok(()) => DeleteOutcome {
                    id: id.to_string(),
                    success: true,
                    error: None,
                },
                Err(err) => {
                    tracing::debug!(%id, error = %err, "Batch delete entry failed");
                    DeleteOutcome {
                        id: id.to_string(),
                        success: false,
                        error: Some(err.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Portable snapshot of one document.
    async fn export(&self, id: &DocumentId, owner: &OwnerId) -> Result<DocumentExport> {
        let record = self.get(id, owner).await?;
        Ok(DocumentExport::from_record(&record))
    }

    /// Aggregate numbers over `owner`'s documents.
    async fn stats(&self, owner: &OwnerId) -> Result<StorageStats> {
        let records = self.list_all(owner).await?;
        Ok(StorageStats::from_records(&records))
    }
}

pub(crate) fn sort_newest_first(records: &mut [DocumentRecord]) {
    records.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then_with(|| a.id.cmp(&b.id)));
}
