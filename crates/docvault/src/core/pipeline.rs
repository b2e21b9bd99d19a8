//! Ingestion pipeline orchestration.
//!
//! One run takes a submitted file through classification, extraction and
//! persistence:
//!
//! 1. Classify the media type. Unsupported files skip extraction.
//! 2. Extract: plain text is decoded, images go to recognition, structured
//!    documents are parsed and fall back to rasterization plus recognition
//!    when their text layer holds fewer than `meaningful_text_threshold`
//!    characters.
//! 3. Persist the record. An extraction failure downgrades the record to
//!    `failed` but the bytes are still stored; a store failure is returned.
//!
//! Progress is reported as: classification 0-10 %, extraction 10-85 %
//! (structured 10-40, rasterization 40-50, recognition 50-85 on the fallback
//! path), persistence 85-100 %.

use crate::core::cancel::{CancellationToken, StageGuard};
use crate::core::config::VaultConfig;
use crate::core::mime::{classify, declared_charset, effective_mime_type, with_charset};
use crate::core::progress::{ProgressReporter, ProgressStage};
use crate::core::state::IngestionState;
use crate::extraction::text::PlainTextReader;
use crate::ocr::{EngineHandle, RecognitionExtractor};
use crate::pdf::{PageRasterizer, RasterizedPages, StructuredExtraction, StructuredTextExtractor};
use crate::store::DocumentStore;
use crate::types::{DocumentId, DocumentRecord, ExtractionMethod, FormatCategory, OwnerId};
use crate::{DocvaultError, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Extra time granted to a blocking stage after its own deadline checks.
const BLOCKING_STAGE_GRACE: Duration = Duration::from_secs(1);

/// A file submitted for ingestion.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub name: String,
    pub owner: OwnerId,
}

/// Text produced by the extraction stage.
#[derive(Debug, Clone, PartialEq)]
struct ExtractionOutcome {
    text: String,
    method: ExtractionMethod,
    page_count: Option<usize>,
    note: Option<String>,
}

impl ExtractionOutcome {
    fn skipped() -> Self {
        Self {
            text: String::new(),
            method: ExtractionMethod::None,
            page_count: None,
            note: None,
        }
    }

    fn failed(err: &DocvaultError) -> Self {
        Self {
            text: String::new(),
            method: ExtractionMethod::Failed,
            page_count: None,
            note: Some(err.to_string()),
        }
    }

    fn partial_note(interrupted: Option<&DocvaultError>) -> Option<String> {
        interrupted.map(|err| format!("Partial text: {}", err))
    }
}

/// An extraction error and the stage it came from.
#[derive(Debug)]
struct StageFailure {
    stage: ProgressStage,
    error: DocvaultError,
}

impl StageFailure {
    fn at(stage: ProgressStage) -> impl FnOnce(DocvaultError) -> Self {
        move |error| Self { stage, error }
    }
}

type StageResult<T> = std::result::Result<T, StageFailure>;

pub struct IngestionPipeline {
    config: Arc<VaultConfig>,
    store: Arc<dyn DocumentStore>,
    structured: StructuredTextExtractor,
    rasterizer: Arc<dyn PageRasterizer>,
    recognition: RecognitionExtractor,
    plain_text: PlainTextReader,
}

impl IngestionPipeline {
    pub fn new(config: Arc<VaultConfig>, store: Arc<dyn DocumentStore>, engine: EngineHandle) -> Self {
        Self {
            structured: StructuredTextExtractor::new(config.meaningful_text_threshold),
            rasterizer: default_rasterizer(&config),
            recognition: RecognitionExtractor::new(engine),
            plain_text: PlainTextReader::new(),
            config,
            store,
        }
    }

    /// Replace the page rasterizer used on the recognition fallback path.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn engine(&self) -> &EngineHandle {
        self.recognition.engine()
    }

    /// Ingest one file and return the stored record.
    ///
    /// # Errors
    ///
    /// Only persistence errors are returned. Extraction problems are recorded
    /// on the stored record.
    pub async fn run(
        &self,
        request: IngestRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<DocumentRecord> {
        let started = Instant::now();
        let mut state = IngestionState::Received;

        progress.report(ProgressStage::Classification, 0);
        let mime_type = effective_mime_type(&request.mime_type, &request.name);
        let category = classify(&request.mime_type, Some(&request.name));
        state.transition(IngestionState::Classified)?;
        progress.report(ProgressStage::Classification, 10);

        debug!(name = %request.name, %mime_type, ?category, size = request.bytes.len(), "Document classified");

        let declared_charset = declared_charset(&request.mime_type, &mime_type);
        let decode_hint = with_charset(&mime_type, declared_charset.as_deref());

        let bytes = Arc::new(request.bytes);
        let outcome = self
            .extract_with_state(&mut state, category, &bytes, &decode_hint, progress, cancel)
            .await?;

        let raw_content = Arc::try_unwrap(bytes).unwrap_or_else(|shared| (*shared).clone());
        let record = DocumentRecord {
            id: DocumentId::new(),
            owner_id: request.owner,
            name: request.name,
            mime_type,
            declared_charset,
            size_bytes: raw_content.len() as u64,
            raw_content,
            category,
            extracted_text: outcome.text,
            extraction_method: outcome.method,
            extraction_error: outcome.note,
            page_count: outcome.page_count,
            uploaded_at: Utc::now(),
            processing_duration_ms: started.elapsed().as_millis() as u64,
            last_extraction_at: None,
        };

        self.persist(record, &mut state, progress).await
    }

    /// Re-run extraction over a stored record's bytes and store the new text.
    ///
    /// The caller is responsible for the ownership check.
    pub async fn reextract(
        &self,
        mut record: DocumentRecord,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<DocumentRecord> {
        let started = Instant::now();
        let mut state = IngestionState::Stored;

        progress.report(ProgressStage::Classification, 0);
        let category = classify(&record.mime_type, Some(&record.name));
        progress.report(ProgressStage::Classification, 10);

        let bytes = Arc::new(std::mem::take(&mut record.raw_content));
        let outcome = if category == FormatCategory::Unsupported {
            ExtractionOutcome::skipped()
        } else {
            state.transition(IngestionState::Extracting)?;
            let outcome = self
                .extract_or_downgrade(category, &bytes, &record.decode_hint(), progress, cancel)
                .await;
            let next = if outcome.method == ExtractionMethod::Failed {
                IngestionState::ExtractionFailed
            } else {
                IngestionState::Extracted
            };
            state.transition(next)?;
            outcome
        };

        record.raw_content = Arc::try_unwrap(bytes).unwrap_or_else(|shared| (*shared).clone());
        record.category = category;
        record.extracted_text = outcome.text;
        record.extraction_method = outcome.method;
        record.extraction_error = outcome.note;
        record.page_count = outcome.page_count;
        record.processing_duration_ms = started.elapsed().as_millis() as u64;
        record.last_extraction_at = Some(Utc::now());

        if state == IngestionState::Stored {
            progress.report(ProgressStage::Persistence, 85);
            self.store.put(record.clone()).await.inspect_err(|err| {
                progress.report_error(ProgressStage::Persistence, err.to_string());
            })?;
            progress.report(ProgressStage::Complete, 100);
            return Ok(record);
        }

        self.persist(record, &mut state, progress).await
    }

    async fn extract_with_state(
        &self,
        state: &mut IngestionState,
        category: FormatCategory,
        bytes: &Arc<Vec<u8>>,
        mime_type: &str,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<ExtractionOutcome> {
        if category == FormatCategory::Unsupported {
            state.transition(IngestionState::Rejected)?;
            debug!(%mime_type, "Unsupported format; storing without extraction");
            return Ok(ExtractionOutcome::skipped());
        }

        state.transition(IngestionState::Extracting)?;
        let outcome = self
            .extract_or_downgrade(category, bytes, mime_type, progress, cancel)
            .await;
        let next = if outcome.method == ExtractionMethod::Failed {
            IngestionState::ExtractionFailed
        } else {
            IngestionState::Extracted
        };
        state.transition(next)?;
        Ok(outcome)
    }

    async fn extract_or_downgrade(
        &self,
        category: FormatCategory,
        bytes: &Arc<Vec<u8>>,
        mime_type: &str,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> ExtractionOutcome {
        match self.extract(category, bytes, mime_type, progress, cancel).await {
            Ok(outcome) => outcome,
            Err(StageFailure { stage, error }) => {
                warn!(%mime_type, ?stage, error = %error, "Extraction failed; storing document without text");
                progress.report_error(stage, error.to_string());
                ExtractionOutcome::failed(&error)
            }
        }
    }

    async fn persist(
        &self,
        record: DocumentRecord,
        state: &mut IngestionState,
        progress: &ProgressReporter,
    ) -> Result<DocumentRecord> {
        progress.report(ProgressStage::Persistence, 85);

        if let Err(err) = self.store.put(record.clone()).await {
            progress.report_error(ProgressStage::Persistence, err.to_string());
            return Err(err);
        }
        state.transition(IngestionState::Stored)?;

        info!(
            document = %record.id,
            method = %record.extraction_method,
            chars = record.extracted_text.chars().count(),
            duration_ms = record.processing_duration_ms,
            "Document stored"
        );
        progress.report(ProgressStage::Complete, 100);
        Ok(record)
    }

    async fn extract(
        &self,
        category: FormatCategory,
        bytes: &Arc<Vec<u8>>,
        mime_type: &str,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> StageResult<ExtractionOutcome> {
        match category {
            FormatCategory::PlainText => {
                let scope = progress.scope(ProgressStage::PlainText, 10, 85);
                scope.begin();
                if cancel.is_cancelled() {
                    return Err(StageFailure::at(ProgressStage::PlainText)(DocvaultError::Cancelled));
                }
                let text = self
                    .plain_text
                    .read(bytes, mime_type)
                    .map_err(StageFailure::at(ProgressStage::PlainText))?;
                scope.finish();
                Ok(ExtractionOutcome {
                    text,
                    method: ExtractionMethod::DirectText,
                    page_count: None,
                    note: None,
                })
            }
            FormatCategory::Image => {
                let scope = progress.scope(ProgressStage::Recognition, 10, 85);
                let guard = StageGuard::new("recognition", self.config.timeouts.recognition(), cancel);
                let output = self
                    .recognition
                    .recognize_image(bytes, &scope, &guard)
                    .await
                    .map_err(StageFailure::at(ProgressStage::Recognition))?;

                if output.text.is_empty()
                    && let Some(err) = output.interrupted
                {
                    return Err(StageFailure::at(ProgressStage::Recognition)(err));
                }
                Ok(ExtractionOutcome {
                    note: ExtractionOutcome::partial_note(output.interrupted.as_ref()),
                    text: output.text,
                    method: ExtractionMethod::Recognition,
                    page_count: Some(output.unit_count),
                })
            }
            FormatCategory::StructuredDocument => self.extract_structured(bytes, progress, cancel).await,
            FormatCategory::Unsupported => Ok(ExtractionOutcome::skipped()),
        }
    }

    async fn extract_structured(
        &self,
        bytes: &Arc<Vec<u8>>,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> StageResult<ExtractionOutcome> {
        let structured = match self.run_structured(bytes, progress, cancel).await {
            Ok(structured) => Some(structured),
            Err(err) if err.is_interruption() => return Err(StageFailure::at(ProgressStage::StructuredParse)(err)),
            Err(err) => {
                debug!(error = %err, "Structured parse failed; treating as no text layer");
                None
            }
        };

        let (layer_text, page_count) = match &structured {
            Some(s) => (s.text.clone(), Some(s.page_count)),
            None => (String::new(), None),
        };

        if let Some(s) = structured {
            if let Some(err) = s.interrupted {
                if s.text.is_empty() {
                    return Err(StageFailure::at(ProgressStage::StructuredParse)(err));
                }
                return Ok(ExtractionOutcome {
                    note: ExtractionOutcome::partial_note(Some(&err)),
                    text: s.text,
                    method: ExtractionMethod::StructuredParse,
                    page_count: Some(s.page_count),
                });
            }
            if s.has_meaningful_text {
                progress.report(ProgressStage::StructuredParse, 85);
                return Ok(ExtractionOutcome {
                    text: s.text,
                    method: ExtractionMethod::StructuredParse,
                    page_count: Some(s.page_count),
                    note: None,
                });
            }
        }

        let keep_layer = |stage: ProgressStage, reason: &DocvaultError| -> StageResult<ExtractionOutcome> {
            if layer_text.is_empty() {
                return Err(StageFailure::at(stage)(DocvaultError::extraction(format!(
                    "No text layer and recognition fallback failed: {}",
                    reason
                ))));
            }
            debug!(error = %reason, "Recognition fallback failed; keeping text layer");
            Ok(ExtractionOutcome {
                text: layer_text.clone(),
                method: ExtractionMethod::StructuredParse,
                page_count,
                note: Some(format!("Recognition fallback failed: {}", reason)),
            })
        };

        debug!(
            chars = layer_text.chars().count(),
            threshold = self.config.meaningful_text_threshold,
            "Text layer below threshold; falling back to recognition"
        );

        if !self.engine().is_configured() {
            let missing = DocvaultError::MissingDependency("No recognition engine configured".to_string());
            return keep_layer(ProgressStage::Recognition, &missing);
        }

        let rasterized = match self.run_rasterizer(bytes, progress, cancel).await {
            Ok(pages) => pages,
            Err(err) if err.is_interruption() && layer_text.is_empty() => {
                return Err(StageFailure::at(ProgressStage::Rasterization)(err));
            }
            Err(err) => return keep_layer(ProgressStage::Rasterization, &err),
        };

        let scope = progress.scope(ProgressStage::Recognition, 50, 85);
        let guard = StageGuard::new("recognition", self.config.timeouts.recognition(), cancel);
        let images = rasterized.pages.into_iter().map(|page| page.image).collect();
        let output = match self.recognition.recognize_pages(images, &scope, &guard).await {
            Ok(output) => output,
            Err(err) => return keep_layer(ProgressStage::Recognition, &err),
        };

        let interrupted = match (output.interrupted, rasterized.interrupted) {
            (Some(err), _) => Some((ProgressStage::Recognition, err)),
            (None, Some(err)) => Some((ProgressStage::Rasterization, err)),
            (None, None) => None,
        };
        let interrupted_error = interrupted.as_ref().map(|(_, err)| err);
        if !output.text.is_empty() {
            return Ok(ExtractionOutcome {
                note: ExtractionOutcome::partial_note(interrupted_error),
                text: output.text,
                method: ExtractionMethod::Recognition,
                page_count: Some(rasterized.page_count),
            });
        }

        if !layer_text.is_empty() {
            return Ok(ExtractionOutcome {
                text: layer_text,
                method: ExtractionMethod::StructuredParse,
                page_count,
                note: ExtractionOutcome::partial_note(interrupted_error),
            });
        }

        if let Some((stage, err)) = interrupted {
            return Err(StageFailure::at(stage)(err));
        }

        Ok(ExtractionOutcome {
            text: String::new(),
            method: ExtractionMethod::Recognition,
            page_count: Some(rasterized.page_count),
            note: None,
        })
    }

    async fn run_structured(
        &self,
        bytes: &Arc<Vec<u8>>,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<StructuredExtraction> {
        let scope = progress.scope(ProgressStage::StructuredParse, 10, 40);
        let guard = StageGuard::new("structured", self.config.timeouts.structured(), cancel);
        let budget = guard.remaining().saturating_add(BLOCKING_STAGE_GRACE);
        let extractor = self.structured.clone();
        let bytes = Arc::clone(bytes);
        let task_guard = guard.clone();

        let task = tokio::task::spawn_blocking(move || extractor.extract(&bytes, &scope, &task_guard));

        match tokio::time::timeout(budget, task).await {
            Ok(joined) => joined.map_err(|e| DocvaultError::parsing(format!("Structured extraction task failed: {}", e)))?,
            Err(_) => Err(guard.timeout_error()),
        }
    }

    async fn run_rasterizer(
        &self,
        bytes: &Arc<Vec<u8>>,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<RasterizedPages> {
        progress.report(ProgressStage::Rasterization, 40);
        let guard = StageGuard::new("rasterize", self.config.timeouts.rasterize(), cancel);
        let budget = guard.remaining().saturating_add(BLOCKING_STAGE_GRACE);
        let rasterizer = Arc::clone(&self.rasterizer);
        let max_pages = self.config.max_recognition_pages;
        let bytes = Arc::clone(bytes);
        let task_guard = guard.clone();

        let task = tokio::task::spawn_blocking(move || rasterizer.rasterize(&bytes, max_pages, &task_guard));

        let pages = match tokio::time::timeout(budget, task).await {
            Ok(joined) => joined.map_err(|e| DocvaultError::parsing(format!("Rasterization task failed: {}", e)))??,
            Err(_) => return Err(guard.timeout_error()),
        };

        debug!(
            rasterizer = self.rasterizer.name(),
            pages = pages.pages.len(),
            "Pages rasterized for recognition"
        );
        progress.report(ProgressStage::Rasterization, 50);
        Ok(pages)
    }
}

#[cfg(feature = "pdfium")]
fn default_rasterizer(config: &VaultConfig) -> Arc<dyn PageRasterizer> {
    Arc::new(crate::pdf::PdfiumRasterizer::new(config.rendering.clone()))
}

#[cfg(not(feature = "pdfium"))]
fn default_rasterizer(_config: &VaultConfig) -> Arc<dyn PageRasterizer> {
    Arc::new(crate::pdf::EmbeddedImageRasterizer::new())
}
