//! Error types for docvault.
//!
//! Every fallible operation in the library returns [`DocvaultError`].
//!
//! # Error Handling Philosophy
//!
//! **System errors MUST always bubble up unchanged:**
//! - `DocvaultError::Io` (from `std::io::Error`) - File system errors, permission errors
//! - `DocvaultError::StorageWrite` - the store could not persist a record
//!
//! **Extraction errors never abort an ingestion.** The pipeline downgrades a
//! record to `failed` when an extractor returns `Parsing`, `Ocr`,
//! `ImageProcessing` or `Extraction`, and still stores the raw bytes.
//!
//! **Access errors are explicit:** a record owned by somebody else is
//! `AccessDenied`, an unknown id is `NotFound`. Neither is ever reported as
//! success.
//!
//! # Example
//!
//! ```rust
//! use docvault::{DocvaultError, Result};
//!
//! fn read_note(path: &str) -> Result<String> {
//!     let content = std::fs::read_to_string(path)?;
//!
//!     if content.is_empty() {
//!         return Err(DocvaultError::validation(format!("File is empty: {}", path)));
//!     }
//!
//!     Ok(content)
//! }
//! ```
use thiserror::Error;

/// Result type alias using `DocvaultError`.
pub type Result<T> = std::result::Result<T, DocvaultError>;

/// Main error type for all docvault operations.
#[derive(Debug, Error)]
pub enum DocvaultError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsing error: {message}")]
    Parsing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("OCR error: {message}")]
    Ocr {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Image processing error: {message}")]
    ImageProcessing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An extractor ran but could not produce text (undecodable bytes, engine failure).
    #[error("Extraction failed: {message}")]
    Extraction {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Storage write failed: {message}")]
    StorageWrite {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Access denied to document {id}")]
    AccessDenied { id: String },

    #[error("Document not found: {id}")]
    NotFound { id: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Stage '{stage}' timed out after {elapsed_ms}ms")]
    Timeout { stage: String, elapsed_ms: u64 },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for DocvaultError {
    fn from(err: serde_json::Error) -> Self {
        DocvaultError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<rmp_serde::encode::Error> for DocvaultError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        DocvaultError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<rmp_serde::decode::Error> for DocvaultError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        DocvaultError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<crate::pdf::error::PdfError> for DocvaultError {
    fn from(err: crate::pdf::error::PdfError) -> Self {
        DocvaultError::Parsing {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<crate::ocr::error::OcrError> for DocvaultError {
    fn from(err: crate::ocr::error::OcrError) -> Self {
        DocvaultError::Ocr {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<image::ImageError> for DocvaultError {
    fn from(err: image::ImageError) -> Self {
        DocvaultError::ImageProcessing {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl DocvaultError {
    error_constructor!(parsing, Parsing);
    error_constructor!(ocr, Ocr);
    error_constructor!(validation, Validation);
    error_constructor!(image_processing, ImageProcessing);
    error_constructor!(serialization, Serialization);
    error_constructor!(extraction, Extraction);
    error_constructor!(storage_write, StorageWrite);

    pub fn access_denied(id: impl std::fmt::Display) -> Self {
        Self::AccessDenied { id: id.to_string() }
    }

    pub fn not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    /// True for `Cancelled` and `Timeout`.
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Timeout { .. })
    }
}
