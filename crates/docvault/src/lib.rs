//! Docvault - owner-scoped document storage with text extraction.
//!
//! Files are classified by media type, their text is extracted (directly,
//! by parsing a PDF text layer, or by optical recognition of rendered pages
//! and images) and the result is stored next to the original bytes.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use docvault::{DocumentVault, OwnerId, ProgressReporter, VaultConfig};
//!
//! # async fn example() -> docvault::Result<()> {
//! let vault = DocumentVault::open(VaultConfig::discover()?.unwrap_or_default())?;
//! let owner = OwnerId::from("alice");
//! let bytes = std::fs::read("report.pdf")?;
//! let record = vault
//!     .ingest(bytes, "application/pdf", "report.pdf", &owner, &ProgressReporter::silent())
//!     .await?;
//! println!("{} via {}", record.extracted_text, record.extraction_method);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core** (`core`): classification, the ingestion pipeline, progress, cancellation, config
//! - **PDF** (`pdf`): text layer extraction and page rasterization
//! - **OCR** (`ocr`): the shared, lazily created recognition engine
//! - **Store** (`store`): owner-checked persistence, in memory or on disk
//! - **Vault** (`vault`): the public operations
//!
//! # Features
//!
//! - `pdfium`: render pages with Pdfium instead of reading embedded page images
//! - `tesseract`: Tesseract recognition engine
//! - `simd-utf8` (default): SIMD UTF-8 validation

#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod extraction;
pub mod ocr;
pub mod pdf;
pub mod store;
pub mod text;
pub mod types;
pub mod vault;

pub use error::{DocvaultError, Result};
pub use types::*;

pub use core::cancel::CancellationToken;
pub use core::config::VaultConfig;
pub use core::mime::classify;
pub use core::progress::{ProgressEvent, ProgressReporter, ProgressStage};
pub use store::{DocumentStore, FsDocumentStore, MemoryDocumentStore};
pub use vault::DocumentVault;
