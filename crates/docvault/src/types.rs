//! Core data types for stored documents and the values returned by the vault.

use crate::Result;
use crate::error::DocvaultError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, globally unique document identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DocumentId {
    type Err = DocvaultError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| DocvaultError::validation_with_source(format!("Invalid document id '{}'", s), e))
    }
}

/// Identity of the principal that owns a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for OwnerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Which extractor produced `extracted_text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    /// No extractor ran (unsupported format).
    #[default]
    None,
    /// Plain text decoded directly from the bytes.
    DirectText,
    /// Embedded text layer of a structured document.
    StructuredParse,
    /// Optical character recognition.
    Recognition,
    /// An extractor ran and failed.
    Failed,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::DirectText => "direct-text",
            Self::StructuredParse => "structured-parse",
            Self::Recognition => "recognition",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse extraction strategy chosen for a media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatCategory {
    StructuredDocument,
    Image,
    PlainText,
    #[default]
    Unsupported,
}

impl FormatCategory {
    pub fn can_extract_text(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// A stored document.
///
/// `raw_content` is persisted apart from the metadata by the filesystem store,
/// so it is skipped by serde and reattached on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub owner_id: OwnerId,
    pub name: String,
    pub mime_type: String,
    /// `charset` declared at upload, reused whenever the text is decoded again.
    #[serde(default)]
    pub declared_charset: Option<String>,
    pub size_bytes: u64,
    #[serde(skip)]
    pub raw_content: Vec<u8>,
    #[serde(default)]
    pub category: FormatCategory,
    #[serde(default)]
    pub extracted_text: String,
    #[serde(default)]
    pub extraction_method: ExtractionMethod,
    /// Why extraction failed, or a note that the text is partial.
    #[serde(default)]
    pub extraction_error: Option<String>,
    #[serde(default)]
    pub page_count: Option<usize>,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub processing_duration_ms: u64,
    #[serde(default)]
    pub last_extraction_at: Option<DateTime<Utc>>,
}

impl DocumentRecord {
    pub fn has_text(&self) -> bool {
        !self.extracted_text.is_empty()
    }

    pub fn can_extract_text(&self) -> bool {
        self.category.can_extract_text()
    }

    /// A copy of the metadata and text, with `raw_content` left empty.
    pub fn without_content(&self) -> DocumentRecord {
        DocumentRecord {
            id: self.id,
            owner_id: self.owner_id.clone(),
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            declared_charset: self.declared_charset.clone(),
            size_bytes: self.size_bytes,
            raw_content: Vec::new(),
            category: self.category,
            extracted_text: self.extracted_text.clone(),
            extraction_method: self.extraction_method,
            extraction_error: self.extraction_error.clone(),
            page_count: self.page_count,
            uploaded_at: self.uploaded_at,
            processing_duration_ms: self.processing_duration_ms,
            last_extraction_at: self.last_extraction_at,
        }
    }

    /// Media type plus declared charset, as given to the text decoder.
    pub fn decode_hint(&self) -> String {
        crate::core::mime::with_charset(&self.mime_type, self.declared_charset.as_deref())
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id,
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size_bytes,
            uploaded_at: self.uploaded_at,
            processing_duration_ms: self.processing_duration_ms,
            extraction_method: self.extraction_method,
            has_text: self.has_text(),
            can_extract_text: self.can_extract_text(),
            text_length: self.extracted_text.chars().count(),
        }
    }
}

/// Result of `get_text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentText {
    pub id: DocumentId,
    pub name: String,
    pub text: String,
    pub method: ExtractionMethod,
    pub has_text: bool,
    pub uploaded_at: DateTime<Utc>,
}

/// Listing entry, without raw bytes or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
    pub processing_duration_ms: u64,
    pub extraction_method: ExtractionMethod,
    pub has_text: bool,
    pub can_extract_text: bool,
    pub text_length: usize,
}

/// Original bytes of a stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub name: String,
}

/// Portable snapshot of a document: metadata, text and base64 encoded bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentExport {
    pub document_id: DocumentId,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
    pub base64_file: String,
    pub text_content: String,
    pub has_text: bool,
    pub extraction_method: ExtractionMethod,
    pub can_extract_text: bool,
}

impl DocumentExport {
    pub fn from_record(record: &DocumentRecord) -> Self {
        Self {
            document_id: record.id,
            name: record.name.clone(),
            mime_type: record.mime_type.clone(),
            size_bytes: record.size_bytes,
            uploaded_at: record.uploaded_at,
            base64_file: BASE64.encode(&record.raw_content),
            text_content: record.extracted_text.clone(),
            has_text: record.has_text(),
            extraction_method: record.extraction_method,
            can_extract_text: record.can_extract_text(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn decode_file(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.base64_file.as_bytes())
            .map_err(|e| DocvaultError::serialization_with_source("Invalid base64 file content", e))
    }
}

/// Per-id result of a batch delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate numbers over one owner's documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageStats {
    pub total_documents: usize,
    pub total_size_bytes: u64,
    pub total_text_length: usize,
    pub documents_with_text: usize,
    /// Document count per media type.
    pub file_types: BTreeMap<String, usize>,
    /// Newest first, at most [`StorageStats::RECENT_LIMIT`].
    pub recent_documents: Vec<DocumentSummary>,
}

impl StorageStats {
    pub const RECENT_LIMIT: usize = 10;

    pub fn from_records(records: &[DocumentRecord]) -> Self {
        let mut stats = StorageStats {
            total_documents: records.len(),
            ..Default::default()
        };

        for record in records {
            stats.total_size_bytes += record.size_bytes;
            stats.total_text_length += record.extracted_text.chars().count();
            if record.has_text() {
                stats.documents_with_text += 1;
            }
            let key = if record.mime_type.is_empty() {
                "unknown".to_string()
            } else {
                record.mime_type.clone()
            };
            *stats.file_types.entry(key).or_insert(0) += 1;
        }

        let mut summaries: Vec<DocumentSummary> = records.iter().map(DocumentRecord::summary).collect();
        summaries.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        summaries.truncate(Self::RECENT_LIMIT);
        stats.recent_documents = summaries;

        stats
    }
}
