//! PDF processing: the embedded text layer and page rasterization.
//!
//! - **Text extraction** ([`StructuredTextExtractor`]): reads each page's text
//!   with `lopdf` and joins pages with `--- Page N ---` markers.
//! - **Rasterization** ([`PageRasterizer`]): turns pages into images for
//!   recognition. [`EmbeddedImageRasterizer`] is pure Rust and decodes the
//!   image each scanned page carries; `PdfiumRasterizer` (feature `pdfium`)
//!   renders arbitrary page content.
//!
//! # Example
//!
//! ```rust,no_run
//! use docvault::core::cancel::{CancellationToken, StageGuard};
//! use docvault::core::progress::{ProgressReporter, ProgressStage};
//! use docvault::pdf::StructuredTextExtractor;
//! use std::time::Duration;
//!
//! # fn example() -> docvault::Result<()> {
//! let bytes = std::fs::read("document.pdf")?;
//! let scope = ProgressReporter::silent().scope(ProgressStage::StructuredParse, 0, 100);
//! let guard = StageGuard::new("structured", Duration::from_secs(30), &CancellationToken::new());
//!
//! let extraction = StructuredTextExtractor::new(500).extract(&bytes, &scope, &guard)?;
//! println!("{} pages, meaningful: {}", extraction.page_count, extraction.has_meaningful_text);
//! # Ok(())
//! # }
//! ```
#[cfg(feature = "pdfium")]
mod bindings;
pub mod error;
pub mod images;
pub mod raster;
#[cfg(feature = "pdfium")]
pub mod rendering;
pub mod text;

pub use error::PdfError;
pub use images::EmbeddedImageRasterizer;
pub use raster::{PageImage, PageRasterizer, RasterizedPages};
#[cfg(feature = "pdfium")]
pub use rendering::PdfiumRasterizer;
pub use text::{StructuredExtraction, StructuredTextExtractor};
