//! Filesystem-backed store.
//!
//! Layout under the root directory:
//!
//! ```text
//! records/<id>.msgpack   record metadata and text (MessagePack)
//! blobs/<id>.bin         original bytes, written once
//! ```
//!
//! Every file is written to a temporary sibling and renamed into place, so a
//! reader never observes a partially written record.

use super::{DocumentStore, authorize, sort_newest_first};
use crate::types::{DocumentId, DocumentRecord, OwnerId};
use crate::{DocvaultError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

const RECORD_EXTENSION: &str = "msgpack";

#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for dir in [root.join("records"), root.join("blobs")] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                DocvaultError::storage_write_with_source(format!("Failed to create store directory {}", dir.display()), e)
            })?;
        }
        tracing::debug!(root = %root.display(), "Opened filesystem document store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: &DocumentId) -> PathBuf {
        self.root.join("records").join(format!("{}.{}", id, RECORD_EXTENSION))
    }

    fn blob_path(&self, id: &DocumentId) -> PathBuf {
        self.root.join("blobs").join(format!("{}.bin", id))
    }

    async fn read_record(&self, id: &DocumentId) -> Result<DocumentRecord> {
        let bytes = match fs::read(self.record_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(DocvaultError::not_found(id)),
            Err(e) => return Err(DocvaultError::Io(e)),
        };
        Ok(rmp_serde::from_slice(&bytes)?)
    }

    async fn read_blob(&self, id: &DocumentId) -> Result<Vec<u8>> {
        fs::read(self.blob_path(id)).await.map_err(|e| {
            tracing::warn!(document = %id, "Record present but its bytes are unreadable: {}", e);
            DocvaultError::Io(e)
        })
    }
}

/// Write `data` to a temporary sibling of `path`, then rename it over `path`.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| DocvaultError::storage_write(format!("Invalid store path {}", path.display())))?;
    let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

    if let Err(e) = fs::write(&tmp_path, data).await {
        return Err(DocvaultError::storage_write_with_source(
            format!("Failed to write {}", tmp_path.display()),
            e,
        ));
    }

    if let Err(e) = fs::rename(&tmp_path, path).await {
        if let Err(cleanup) = fs::remove_file(&tmp_path).await {
            tracing::debug!("Failed to remove temporary file {}: {}", tmp_path.display(), cleanup);
        }
        return Err(DocvaultError::storage_write_with_source(
            format!("Failed to move {} into place", path.display()),
            e,
        ));
    }

    Ok(())
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn put(&self, record: DocumentRecord) -> Result<()> {
        let encoded = rmp_serde::to_vec_named(&record)?;
        let blob_path = self.blob_path(&record.id);
        let first_insert = !fs::try_exists(&blob_path).await.map_err(|e| {
            DocvaultError::storage_write_with_source(format!("Failed to inspect {}", blob_path.display()), e)
        })?;
        if first_insert {
            write_atomic(&blob_path, &record.raw_content).await?;
        }

        if let Err(err) = write_atomic(&self.record_path(&record.id), &encoded).await {
            if first_insert && let Err(cleanup) = fs::remove_file(&blob_path).await {
                tracing::warn!(document = %record.id, "Failed to remove orphaned blob: {}", cleanup);
            }
            return Err(err);
        }

        tracing::debug!(document = %record.id, "Record written");
        Ok(())
    }

    async fn get(&self, id: &DocumentId, owner: &OwnerId) -> Result<DocumentRecord> {
        let mut record = self.read_record(id).await?;
        authorize(&record, owner)?;
        record.raw_content = self.read_blob(id).await?;
        Ok(record)
    }

    async fn list_all(&self, owner: &OwnerId) -> Result<Vec<DocumentRecord>> {
        let mut entries = fs::read_dir(self.root.join("records")).await?;
        let mut records = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }

            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!("Error reading record {}: {}", path.display(), e);
                    continue;
                }
            };
            let record: DocumentRecord = match rmp_serde::from_slice(&bytes) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping unreadable record {}: {}", path.display(), e);
                    continue;
                }
            };

            if record.owner_id == *owner {
                records.push(record);
            }
        }

        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn delete(&self, id: &DocumentId, owner: &OwnerId) -> Result<()> {
        let record = self.read_record(id).await?;
        authorize(&record, owner)?;

        fs::remove_file(self.record_path(id)).await?;
        if let Err(e) = fs::remove_file(self.blob_path(id)).await
            && e.kind() != ErrorKind::NotFound
        {
            tracing::warn!(document = %id, "Record deleted but blob removal failed: {}", e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExtractionMethod, FormatCategory};
    use chrono::Utc;
    use tempfile::tempdir;

    fn record(owner: &str, bytes: &[u8]) -> DocumentRecord {
        DocumentRecord {
            id: DocumentId::new(),
            owner_id: OwnerId::from(owner),
            name: "scan.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            declared_charset: None,
            size_bytes: bytes.len() as u64,
            raw_content: bytes.to_vec(),
            category: FormatCategory::StructuredDocument,
            extracted_text: "--- Page 1 ---\nhello".to_string(),
            extraction_method: ExtractionMethod::StructuredParse,
            extraction_error: None,
            page_count: Some(1),
            uploaded_at: Utc::now(),
            processing_duration_ms: 12,
            last_extraction_at: None,
        }
    }

    #[tokio::test]
    async fn test_round_trip_survives_reopen() {
        let dir = tempdir().unwrap();
        let rec = record("alice", b"%PDF-1.4 bytes");

        {
            let store = FsDocumentStore::open(dir.path()).unwrap();
            store.put(rec.clone()).await.unwrap();
        }

        let reopened = FsDocumentStore::open(dir.path()).unwrap();
        let loaded = reopened.get(&rec.id, &OwnerId::from("alice")).await.unwrap();
        assert_eq!(loaded.raw_content, rec.raw_content);
        assert_eq!(loaded.extracted_text, rec.extracted_text);
        assert_eq!(loaded.extraction_method, ExtractionMethod::StructuredParse);
        assert_eq!(loaded.page_count, Some(1));
    }

    #[tokio::test]
    async fn test_blob_is_written_once() {
        let dir = tempdir().unwrap();
        let store = FsDocumentStore::open(dir.path()).unwrap();
        let rec = record("alice", b"original");
        store.put(rec.clone()).await.unwrap();

        let mut overwrite = rec.clone();
        overwrite.raw_content = b"changed".to_vec();
        overwrite.extracted_text = "re-extracted".to_string();
        store.put(overwrite).await.unwrap();

        let loaded = store.get(&rec.id, &OwnerId::from("alice")).await.unwrap();
        assert_eq!(loaded.raw_content, b"original");
        assert_eq!(loaded.extracted_text, "re-extracted");
    }

    #[tokio::test]
    async fn test_delete_removes_both_files() {
        let dir = tempdir().unwrap();
        let store = FsDocumentStore::open(dir.path()).unwrap();
        let rec = record("alice", b"bytes");
        store.put(rec.clone()).await.unwrap();

        store.delete(&rec.id, &OwnerId::from("alice")).await.unwrap();
        assert!(!store.record_path(&rec.id).exists());
        assert!(!store.blob_path(&rec.id).exists());

        let err = store.get(&rec.id, &OwnerId::from("alice")).await.unwrap_err();
        assert!(matches!(err, DocvaultError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_foreign_delete_is_denied_and_keeps_files() {
        let dir = tempdir().unwrap();
        let store = FsDocumentStore::open(dir.path()).unwrap();
        let rec = record("alice", b"bytes");
        store.put(rec.clone()).await.unwrap();

        let err = store.delete(&rec.id, &OwnerId::from("mallory")).await.unwrap_err();
        assert!(matches!(err, DocvaultError::AccessDenied { .. }));
        assert!(store.record_path(&rec.id).exists());
    }

    #[tokio::test]
    async fn test_list_all_skips_corrupt_records_and_other_owners() {
        let dir = tempdir().unwrap();
        let store = FsDocumentStore::open(dir.path()).unwrap();
        store.put(record("alice", b"a")).await.unwrap();
        store.put(record("bob", b"b")).await.unwrap();
        std::fs::write(dir.path().join("records").join("garbage.msgpack"), b"\xff\xff").unwrap();

        let records = store.list_all(&OwnerId::from("alice")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size_bytes, 1);
        assert!(records[0].raw_content.is_empty());
    }

    #[tokio::test]
    async fn test_list_all_does_not_read_blobs() {
        let dir = tempdir().unwrap();
        let store = FsDocumentStore::open(dir.path()).unwrap();
        let rec = record("alice", b"payload");
        store.put(rec.clone()).await.unwrap();
        std::fs::remove_file(store.blob_path(&rec.id)).unwrap();

        let records = store.list_all(&OwnerId::from("alice")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size_bytes, 7);

        let err = store.get(&rec.id, &OwnerId::from("alice")).await.unwrap_err();
        assert!(matches!(err, DocvaultError::Io(_)));
    }

    #[tokio::test]
    async fn test_failed_first_put_leaves_no_blob() {
        let dir = tempdir().unwrap();
        let store = FsDocumentStore::open(dir.path()).unwrap();
        let rec = record("alice", b"payload");
        std::fs::create_dir(store.record_path(&rec.id)).unwrap();

        let err = store.put(rec.clone()).await.unwrap_err();
        assert!(matches!(err, DocvaultError::StorageWrite { .. }));
        assert!(!store.blob_path(&rec.id).exists());
    }

    #[tokio::test]
    async fn test_failed_update_keeps_existing_blob() {
        let dir = tempdir().unwrap();
        let store = FsDocumentStore::open(dir.path()).unwrap();
        let rec = record("alice", b"payload");
        store.put(rec.clone()).await.unwrap();

        std::fs::remove_file(store.record_path(&rec.id)).unwrap();
        std::fs::create_dir(store.record_path(&rec.id)).unwrap();
        assert!(store.put(rec.clone()).await.is_err());
        assert_eq!(std::fs::read(store.blob_path(&rec.id)).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_no_temporary_files_left_behind() {
        let dir = tempdir().unwrap();
        let store = FsDocumentStore::open(dir.path()).unwrap();
        store.put(record("alice", b"a")).await.unwrap();

        let leftovers = std::fs::read_dir(dir.path().join("records"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
