//! The vault over the filesystem store: documents survive a restart and
//! every operation behaves as it does in memory.

use docvault::core::config::{StorageConfig, VaultConfig};
use docvault::ocr::EngineHandle;
use docvault::pdf::EmbeddedImageRasterizer;
use docvault::{DocumentVault, DocvaultError, ExtractionMethod, FsDocumentStore, ProgressReporter};
use std::sync::Arc;
use tempfile::TempDir;

mod helpers;

use helpers::*;

fn open_vault(dir: &TempDir, engine: EngineHandle) -> DocumentVault {
    let store = FsDocumentStore::open(dir.path()).unwrap();
    DocumentVault::with_rasterizer(
        VaultConfig::default(),
        Arc::new(store),
        engine,
        Arc::new(EmbeddedImageRasterizer::new()),
    )
}

#[tokio::test]
async fn test_documents_survive_reopen() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let (pdf, text) = text_pdf_with_chars(650);

    let id = {
        let vault = open_vault(&dir, EngineHandle::unavailable());
        let record = vault
            .ingest(pdf.clone(), "application/pdf", "report.pdf", &alice(), &ProgressReporter::silent())
            .await?;
        record.id
    };

    let vault = open_vault(&dir, EngineHandle::unavailable());
    let fetched = vault.get_text(&id, &alice()).await?;
    assert_eq!(fetched.method, ExtractionMethod::StructuredParse);
    assert!(fetched.text.contains(&text[..80]));

    let raw = vault.fetch_raw_file(&id, &alice()).await?;
    assert_eq!(raw.bytes, pdf);
    assert_eq!(raw.mime_type, "application/pdf");

    let listed = vault.list_documents(&alice()).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].size_bytes, pdf.len() as u64);
    Ok(())
}

#[tokio::test]
async fn test_owner_checks_apply_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let vault = open_vault(&dir, EngineHandle::unavailable());
    let record = vault
        .ingest(b"ledger".to_vec(), "text/plain", "ledger.txt", &alice(), &ProgressReporter::silent())
        .await
        .unwrap();

    assert!(matches!(
        vault.get_text(&record.id, &bob()).await,
        Err(DocvaultError::AccessDenied { .. })
    ));

    let outcomes = vault.delete_documents(&[record.id.to_string()], &bob()).await;
    assert!(!outcomes[0].success);
    assert_eq!(vault.get_text(&record.id, &alice()).await.unwrap().text, "ledger");

    vault.delete_document(&record.id, &alice()).await.unwrap();
    assert!(matches!(
        vault.get_text(&record.id, &alice()).await,
        Err(DocvaultError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_reextract_on_disk_keeps_original_bytes() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let pdf = scanned_pdf(1);

    let id = {
        let vault = open_vault(&dir, EngineHandle::unavailable());
        let record = vault
            .ingest(pdf.clone(), "application/pdf", "scan.pdf", &alice(), &ProgressReporter::silent())
            .await
            .unwrap();
        assert_eq!(record.extraction_method, ExtractionMethod::Failed);
        record.id
    };

    let (engine, _calls) = ScriptedFactory::new("now readable").handle();
    let vault = open_vault(&dir, engine);
    let updated = vault
        .reextract_document(&id, &alice(), &ProgressReporter::silent())
        .await
        .unwrap();

    assert_eq!(updated.extraction_method, ExtractionMethod::Recognition);
    assert_eq!(updated.extracted_text, "now readable 1");
    assert!(updated.extraction_error.is_none());

    let reopened = open_vault(&dir, EngineHandle::unavailable());
    assert_eq!(reopened.get_text(&id, &alice()).await.unwrap().text, "now readable 1");
    assert_eq!(reopened.fetch_raw_file(&id, &alice()).await.unwrap().bytes, pdf);
}

#[tokio::test]
async fn test_open_uses_configured_storage_root() {
    let dir = tempfile::tempdir().unwrap();
    let config = VaultConfig {
        storage: StorageConfig {
            root: Some(dir.path().join("vault")),
        },
        ..VaultConfig::default()
    };

    let vault = DocumentVault::open(config).unwrap();
    vault
        .ingest(b"persisted".to_vec(), "text/plain", "p.txt", &alice(), &ProgressReporter::silent())
        .await
        .unwrap();

    assert!(dir.path().join("vault").join("records").is_dir());
    let stats = vault.storage_stats(&alice()).await.unwrap();
    assert_eq!(stats.total_documents, 1);
    assert_eq!(stats.total_text_length, "persisted".len());
}

#[test]
fn test_open_rejects_invalid_config() {
    let mut config = VaultConfig::default();
    config.timeouts.structured_secs = 0;
    assert!(matches!(
        DocumentVault::open(config),
        Err(DocvaultError::Validation { .. })
    ));
}
