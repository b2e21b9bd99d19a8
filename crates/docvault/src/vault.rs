//! The public entry point: [`DocumentVault`].
//!
//! A vault pairs an [`IngestionPipeline`] with the [`DocumentStore`] it writes
//! to. Every read, delete and export goes through the store's ownership check.

use crate::core::cancel::CancellationToken;
use crate::core::config::VaultConfig;
use crate::core::pipeline::{IngestRequest, IngestionPipeline};
use crate::core::progress::ProgressReporter;
use crate::ocr::EngineHandle;
use crate::pdf::PageRasterizer;
use crate::store::{DocumentStore, FsDocumentStore, MemoryDocumentStore};
use crate::types::{
    DeleteOutcome, DocumentExport, DocumentId, DocumentRecord, DocumentSummary, DocumentText, OwnerId, RawFile,
    StorageStats,
};
use crate::{DocvaultError, Result};
use std::sync::Arc;

/// Ingests, stores and serves documents for many owners.
///
/// Cloning is cheap; clones share the store and the recognition engine.
///
/// # Example
///
/// ```rust
/// use docvault::{DocumentVault, OwnerId, ProgressReporter, VaultConfig};
///
/// # tokio_test::block_on(async {
/// let vault = DocumentVault::in_memory(VaultConfig::default());
/// let owner = OwnerId::from("alice");
/// let record = vault
///     .ingest(b"Hello".to_vec(), "text/plain", "hello.txt", &owner, &ProgressReporter::silent())
///     .await?;
/// assert_eq!(vault.get_text(&record.id, &owner).await?.text, "Hello");
/// # Ok::<(), docvault::DocvaultError>(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct DocumentVault {
    pipeline: Arc<IngestionPipeline>,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for DocumentVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentVault")
            .field("store", &self.store.name())
            .field("engine", self.pipeline.engine())
            .finish()
    }
}

impl DocumentVault {
    pub fn new(config: VaultConfig, store: Arc<dyn DocumentStore>, engine: EngineHandle) -> Self {
        let pipeline = IngestionPipeline::new(Arc::new(config), Arc::clone(&store), engine);
        Self {
            pipeline: Arc::new(pipeline),
            store,
        }
    }

    /// Vault over a filesystem store at `config.storage`, with the recognition
    /// engine enabled by crate features.
    ///
    /// # Errors
    ///
    /// Invalid configuration, or a store root that cannot be created.
    pub fn open(config: VaultConfig) -> Result<Self> {
        config.validate()?;
        let root = config.storage.resolve_root()?;
        let store = FsDocumentStore::open(&root)?;
        let engine = EngineHandle::from_features(&config.ocr);
        tracing::info!(root = %root.display(), recognition = engine.is_configured(), "Opened document vault");
        Ok(Self::new(config, Arc::new(store), engine))
    }

    /// Vault over a fresh in-memory store.
    pub fn in_memory(config: VaultConfig) -> Self {
        let engine = EngineHandle::from_features(&config.ocr);
        Self::new(config, Arc::new(MemoryDocumentStore::new()), engine)
    }

    /// Like [`new`](Self::new), with a specific rasterizer for the recognition fallback.
    pub fn with_rasterizer(
        config: VaultConfig,
        store: Arc<dyn DocumentStore>,
        engine: EngineHandle,
        rasterizer: Arc<dyn PageRasterizer>,
    ) -> Self {
        let pipeline = IngestionPipeline::new(Arc::new(config), Arc::clone(&store), engine).with_rasterizer(rasterizer);
        Self {
            pipeline: Arc::new(pipeline),
            store,
        }
    }

    pub fn config(&self) -> &VaultConfig {
        self.pipeline.config()
    }

    pub fn engine(&self) -> &EngineHandle {
        self.pipeline.engine()
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Classify, extract and store one file.
    ///
    /// # Errors
    ///
    /// Only store failures. A file whose text cannot be extracted is still
    /// stored, with method `failed` and the reason in `extraction_error`.
    pub async fn ingest(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        name: &str,
        owner: &OwnerId,
        progress: &ProgressReporter,
    ) -> Result<DocumentRecord> {
        self.ingest_with_cancellation(bytes, mime_type, name, owner, progress, &CancellationToken::new())
            .await
    }

    /// [`ingest`](Self::ingest) with a caller-controlled cancellation token.
    ///
    /// Cancelling stops extraction at the next unit boundary. Text extracted so
    /// far is kept and the record is still stored.
    pub async fn ingest_with_cancellation(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        name: &str,
        owner: &OwnerId,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<DocumentRecord> {
        let request = IngestRequest {
            bytes,
            mime_type: mime_type.to_string(),
            name: name.to_string(),
            owner: owner.clone(),
        };
        self.pipeline.run(request, progress, cancel).await
    }

    pub async fn get_text(&self, id: &DocumentId, owner: &OwnerId) -> Result<DocumentText> {
        let record = self.store.get(id, owner).await?;
        Ok(DocumentText {
            id: record.id,
            has_text: record.has_text(),
            method: record.extraction_method,
            uploaded_at: record.uploaded_at,
            name: record.name,
            text: record.extracted_text,
        })
    }

    /// Metadata for `owner`'s documents, newest first.
    pub async fn list_documents(&self, owner: &OwnerId) -> Result<Vec<DocumentSummary>> {
        let records = self.store.list_all(owner).await?;
        Ok(records.iter().map(DocumentRecord::summary).collect())
    }

    pub async fn delete_document(&self, id: &DocumentId, owner: &OwnerId) -> Result<()> {
        self.store.delete(id, owner).await?;
        tracing::info!(document = %id, "Document deleted");
        Ok(())
    }

    /// Delete each id independently; one outcome per input, in order.
    ///
    /// Ids that do not parse produce a failed outcome rather than an error.
    pub async fn delete_documents<S: AsRef<str>>(&self, ids: &[S], owner: &OwnerId) -> Vec<DeleteOutcome> {
        let parsed: Vec<Result<DocumentId>> = ids.iter().map(|raw| raw.as_ref().parse()).collect();
        let valid: Vec<DocumentId> = parsed.iter().filter_map(|p| p.as_ref().ok().copied()).collect();
        let mut deleted = self.store.delete_many(&valid, owner).await.into_iter();

        let outcomes: Vec<DeleteOutcome> = ids
            .iter()
            .zip(parsed)
            .map(|(raw, parsed)| {
                let result = match parsed {
                    Ok(_) => deleted.next(),
                    Err(err) => Some(DeleteOutcome {
                        id: String::new(),
                        success: false,
                        error: Some(err.to_string()),
                    }),
                };
                let mut outcome = result.unwrap_or_else(|| DeleteOutcome {
                    id: String::new(),
                    success: false,
                    error: Some("Store returned no result for this id".to_string()),
                });
                outcome.id = raw.as_ref().to_string();
                outcome
            })
            .collect();

        let deleted = outcomes.iter().filter(|o| o.success).count();
        tracing::info!(requested = ids.len(), deleted, "Batch delete finished");
        outcomes
    }

    pub async fn export_document(&self, id: &DocumentId, owner: &OwnerId) -> Result<DocumentExport> {
        self.store.export(id, owner).await
    }

    pub async fn fetch_raw_file(&self, id: &DocumentId, owner: &OwnerId) -> Result<RawFile> {
        let record = self.store.get(id, owner).await?;
        Ok(RawFile {
            bytes: record.raw_content,
            mime_type: record.mime_type,
            name: record.name,
        })
    }

    /// Run extraction again over the stored bytes of a document.
    ///
    /// Text, method and error are replaced; the original bytes are not.
    pub async fn reextract_document(
        &self,
        id: &DocumentId,
        owner: &OwnerId,
        progress: &ProgressReporter,
    ) -> Result<DocumentRecord> {
        let record = self.store.get(id, owner).await?;
        if record.raw_content.is_empty() && record.size_bytes > 0 {
            return Err(DocvaultError::extraction(format!(
                "Stored bytes for document {} are missing",
                id
            )));
        }
        self.pipeline.reextract(record, progress, &CancellationToken::new()).await
    }

    pub async fn storage_stats(&self, owner: &OwnerId) -> Result<StorageStats> {
        self.store.stats(owner).await
    }

    /// Release the recognition engine. It is recreated on next use.
    pub async fn shutdown(&self) -> Result<()> {
        self.engine().shutdown().await
    }
}
