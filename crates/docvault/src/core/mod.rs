//! Ingestion orchestration.
//!
//! - [`mime`]: media type normalization and format classification
//! - [`pipeline`]: classification, extraction fallback and persistence for one file
//! - [`progress`] and [`cancel`]: per-run reporting and interruption
//! - [`state`]: the ingestion state machine
//! - [`config`]: [`VaultConfig`] and its file loaders

pub mod cancel;
pub mod config;
pub mod mime;
pub mod pipeline;
pub mod progress;
pub mod state;

pub use cancel::{CancellationToken, StageGuard};
pub use config::{OcrConfig, PageRenderOptions, StageTimeouts, StorageConfig, VaultConfig};
pub use mime::{can_extract_text, classify};
pub use pipeline::{IngestRequest, IngestionPipeline};
pub use progress::{ProgressEvent, ProgressReporter, ProgressScope, ProgressStage};
pub use state::IngestionState;
