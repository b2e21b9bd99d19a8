//! Progress reporting, stage timeouts and caller cancellation.

use docvault::core::config::{StageTimeouts, VaultConfig};
use docvault::{CancellationToken, ExtractionMethod, ProgressEvent, ProgressReporter, ProgressStage};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

mod helpers;

use helpers::*;

fn collect_events(mut rx: tokio::sync::mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn assert_monotonic(events: &[ProgressEvent]) {
    for pair in events.windows(2) {
        assert!(
            pair[0].percent <= pair[1].percent,
            "progress went backwards: {:?} -> {:?}",
            pair[0],
            pair[1]
        );
    }
}

#[tokio::test]
async fn test_progress_is_monotonic_through_fallback() {
    let (engine, _calls) = ScriptedFactory::new("text").handle();
    let vault = vault_with_engine(engine);
    let (reporter, rx) = ProgressReporter::channel();

    vault
        .ingest(scanned_pdf(3), "application/pdf", "scan.pdf", &alice(), &reporter)
        .await
        .unwrap();

    let events = collect_events(rx);
    assert_monotonic(&events);

    let first = events.first().unwrap();
    assert_eq!(first.stage, ProgressStage::Classification);
    assert_eq!(first.percent, 0);

    let last = events.last().unwrap();
    assert_eq!(last.stage, ProgressStage::Complete);
    assert_eq!(last.percent, 100);

    let stages: Vec<ProgressStage> = events.iter().map(|e| e.stage).collect();
    for stage in [
        ProgressStage::StructuredParse,
        ProgressStage::Rasterization,
        ProgressStage::Recognition,
        ProgressStage::Persistence,
    ] {
        assert!(stages.contains(&stage), "missing {stage:?} in {stages:?}");
    }
    assert!(events.iter().all(|e| e.error.is_none()));
}

#[tokio::test]
async fn test_callback_sink_sees_completion() {
    let vault = vault_without_engine();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let reporter = ProgressReporter::from_fn(move |event: &ProgressEvent| sink.lock().push(event.percent));

    vault
        .ingest(b"hello".to_vec(), "text/plain", "a.txt", &alice(), &reporter)
        .await
        .unwrap();

    let seen = seen.lock();
    assert_eq!(seen.first(), Some(&0));
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_extraction_failure_emits_error_event() {
    let vault = vault_without_engine();
    let (reporter, rx) = ProgressReporter::channel();

    let record = vault
        .ingest(scanned_pdf(1), "application/pdf", "scan.pdf", &alice(), &reporter)
        .await
        .unwrap();
    assert_eq!(record.extraction_method, ExtractionMethod::Failed);

    let events = collect_events(rx);
    assert_monotonic(&events);
    let failures: Vec<ProgressStage> = events.iter().filter(|e| e.error.is_some()).map(|e| e.stage).collect();
    assert_eq!(failures, vec![ProgressStage::Recognition]);
    assert_eq!(events.last().unwrap().percent, 100);
}

#[tokio::test]
async fn test_error_event_names_the_failing_stage() {
    let vault = vault_without_engine();

    let (reporter, rx) = ProgressReporter::channel();
    vault
        .ingest(vec![b'o', b'k', 0xff], "text/plain; charset=utf-8", "bad.txt", &alice(), &reporter)
        .await
        .unwrap();
    let failures: Vec<ProgressStage> = collect_events(rx)
        .iter()
        .filter(|e| e.error.is_some())
        .map(|e| e.stage)
        .collect();
    assert_eq!(failures, vec![ProgressStage::PlainText]);

    let token = CancellationToken::new();
    token.cancel();
    let (reporter, rx) = ProgressReporter::channel();
    let (pdf, _) = text_pdf_with_chars(600);
    let record = vault
        .ingest_with_cancellation(pdf, "application/pdf", "report.pdf", &alice(), &reporter, &token)
        .await
        .unwrap();
    assert_eq!(record.extraction_method, ExtractionMethod::Failed);
    let failures: Vec<ProgressStage> = collect_events(rx)
        .iter()
        .filter(|e| e.error.is_some())
        .map(|e| e.stage)
        .collect();
    assert_eq!(failures, vec![ProgressStage::StructuredParse]);
}

#[tokio::test]
async fn test_recognition_timeout_keeps_partial_text() {
    let (engine, calls_seen) = ScriptedFactory::new("page")
        .with_delay(Duration::from_millis(700))
        .handle();
    let config = VaultConfig {
        timeouts: StageTimeouts {
            recognition_secs: 1,
            ..StageTimeouts::default()
        },
        ..VaultConfig::default()
    };
    let vault = vault_with(config, engine);

    let record = vault
        .ingest(scanned_pdf(4), "application/pdf", "slow.pdf", &alice(), &ProgressReporter::silent())
        .await
        .unwrap();

    assert_eq!(record.extraction_method, ExtractionMethod::Recognition);
    assert!(record.extracted_text.starts_with("page 1"));
    assert!(!record.extracted_text.contains("page 4"));
    let note = record.extraction_error.unwrap();
    assert!(note.contains("timed out"), "unexpected note: {note}");
    assert!(calls_seen.calls() < 4);

    let stored = vault.get_text(&record.id, &alice()).await.unwrap();
    assert_eq!(stored.text, record.extracted_text);
}

#[tokio::test]
async fn test_cancellation_mid_recognition_keeps_partial_text() {
    let (engine, _calls) = ScriptedFactory::new("page")
        .with_delay(Duration::from_millis(400))
        .handle();
    let vault = vault_with_engine(engine);
    let token = CancellationToken::new();

    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(600)).await;
            token.cancel();
        })
    };

    let record = vault
        .ingest_with_cancellation(
            scanned_pdf(5),
            "application/pdf",
            "cancel.pdf",
            &alice(),
            &ProgressReporter::silent(),
            &token,
        )
        .await
        .unwrap();
    canceller.await.unwrap();

    assert_eq!(record.extraction_method, ExtractionMethod::Recognition);
    assert!(record.extracted_text.starts_with("page 1"));
    assert!(!record.extracted_text.contains("page 5"));
    assert!(record.extraction_error.unwrap().contains("cancelled"));
    assert!(vault.get_text(&record.id, &alice()).await.is_ok());
}

#[tokio::test]
async fn test_cancelled_before_start_still_stores_upload() {
    let (engine, calls_seen) = ScriptedFactory::new("never").handle();
    let vault = vault_with_engine(engine);
    let token = CancellationToken::new();
    token.cancel();

    let record = vault
        .ingest_with_cancellation(
            png_bytes(24, 24),
            "image/png",
            "photo.png",
            &alice(),
            &ProgressReporter::silent(),
            &token,
        )
        .await
        .unwrap();

    assert_eq!(record.extraction_method, ExtractionMethod::Failed);
    assert_eq!(record.extraction_error.as_deref(), Some("Operation cancelled"));
    assert_eq!(calls_seen.calls(), 0);
    assert_eq!(vault.fetch_raw_file(&record.id, &alice()).await.unwrap().bytes.len(), record.size_bytes as usize);
}
