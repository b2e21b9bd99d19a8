//! Embedded text layer extraction.

use super::error::{PdfError, Result as PdfResult};
use crate::DocvaultError;
use crate::core::cancel::StageGuard;
use crate::core::progress::ProgressScope;
use lopdf::Document;

/// Outcome of reading a document's text layer.
#[derive(Debug)]
pub struct StructuredExtraction {
    /// Page texts separated by `--- Page N ---` markers, trimmed.
    pub text: String,
    pub page_count: usize,
    pub pages_processed: usize,
    /// Characters of page text, markers excluded.
    pub content_chars: usize,
    pub has_meaningful_text: bool,
    /// Set when the stage stopped early; `text` holds the pages read so far.
    pub interrupted: Option<DocvaultError>,
}

/// Reads the text layer of PDF documents page by page.
#[derive(Debug, Clone)]
pub struct StructuredTextExtractor {
    threshold: usize,
}

impl StructuredTextExtractor {
    /// `threshold` is the minimum character count considered meaningful text.
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Extract the text of every page.
    ///
    /// Cancellation and the stage deadline are checked between pages. A page
    /// whose content stream cannot be decoded contributes no text.
    pub fn extract(&self, bytes: &[u8], scope: &ProgressScope, guard: &StageGuard) -> crate::Result<StructuredExtraction> {
        let document = load_document(bytes)?;
        let pages = document.get_pages();
        let page_count = pages.len();

        scope.units(0, page_count);

        let mut text = String::new();
        let mut content_chars = 0;
        let mut pages_processed = 0;
        let mut interrupted = None;

        for (index, page_number) in pages.keys().copied().enumerate() {
            if let Err(err) = guard.check() {
                tracing::debug!(page = page_number, error = %err, "Structured extraction interrupted");
                interrupted = Some(err);
                break;
            }

            let page_text = match document.extract_text(&[page_number]) {
                Ok(raw) => raw.trim().to_string(),
                Err(err) => {
                    tracing::debug!(page = page_number, error = %err, "Page text extraction failed");
                    String::new()
                }
            };

            if !page_text.is_empty() {
                content_chars += page_text.chars().count();
                text.push_str(&format!("\n--- Page {} ---\n{}\n", page_number, page_text));
            }

            pages_processed += 1;
            scope.units(index + 1, page_count);
        }

        let text = text.trim().to_string();
        tracing::debug!(
            page_count,
            pages_processed,
            content_chars,
            threshold = self.threshold,
            "Structured extraction finished"
        );

        Ok(StructuredExtraction {
            text,
            page_count,
            pages_processed,
            content_chars,
            has_meaningful_text: content_chars >= self.threshold,
            interrupted,
        })
    }
}

/// Parse a PDF, decrypting it with the empty password when needed.
pub(crate) fn load_document(bytes: &[u8]) -> PdfResult<Document> {
    let mut document = Document::load_mem(bytes)?;

    if document.is_encrypted() && document.decrypt("").is_err() {
        return Err(PdfError::PasswordRequired);
    }

    Ok(document)
}
