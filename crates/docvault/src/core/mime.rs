//! Media type classification.
//!
//! [`classify`] maps a declared media type (and optionally the file name) to the
//! [`FormatCategory`] that decides which extractor runs. It is a pure function:
//! the same inputs always give the same category and it never fails.

use crate::types::FormatCategory;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";
pub const MARKDOWN_MIME_TYPE: &str = "text/markdown";
pub const HTML_MIME_TYPE: &str = "text/html";
pub const DOCX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const LEGACY_WORD_MIME_TYPE: &str = "application/msword";
pub const JSON_MIME_TYPE: &str = "application/json";
pub const YAML_MIME_TYPE: &str = "application/x-yaml";
pub const TOML_MIME_TYPE: &str = "application/toml";
pub const XML_MIME_TYPE: &str = "application/xml";
pub const SVG_MIME_TYPE: &str = "image/svg+xml";
pub const OCTET_STREAM_MIME_TYPE: &str = "application/octet-stream";

static EXT_TO_MIME: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert("pdf", PDF_MIME_TYPE);

    m.insert("txt", PLAIN_TEXT_MIME_TYPE);
    m.insert("text", PLAIN_TEXT_MIME_TYPE);
    m.insert("log", PLAIN_TEXT_MIME_TYPE);
    m.insert("md", MARKDOWN_MIME_TYPE);
    m.insert("markdown", MARKDOWN_MIME_TYPE);
    m.insert("html", HTML_MIME_TYPE);
    m.insert("htm", HTML_MIME_TYPE);
    m.insert("csv", "text/csv");
    m.insert("tsv", "text/tab-separated-values");
    m.insert("rst", "text/x-rst");
    m.insert("org", "text/x-org");
    m.insert("json", JSON_MIME_TYPE);
    m.insert("yaml", YAML_MIME_TYPE);
    m.insert("yml", YAML_MIME_TYPE);
    m.insert("toml", TOML_MIME_TYPE);
    m.insert("xml", XML_MIME_TYPE);
    m.insert("svg", SVG_MIME_TYPE);

    m.insert("docx", DOCX_MIME_TYPE);
    m.insert("doc", LEGACY_WORD_MIME_TYPE);

    m.insert("bmp", "image/bmp");
    m.insert("gif", "image/gif");
    m.insert("jpg", "image/jpeg");
    m.insert("jpeg", "image/jpeg");
    m.insert("png", "image/png");
    m.insert("tiff", "image/tiff");
    m.insert("tif", "image/tiff");
    m.insert("webp", "image/webp");
    m.insert("pnm", "image/x-portable-anymap");
    m.insert("pbm", "image/x-portable-bitmap");
    m.insert("pgm", "image/x-portable-graymap");
    m.insert("ppm", "image/x-portable-pixmap");

    m
});

/// Non-`text/*` types that are read as plain text.
static TEXTUAL_APPLICATION_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    let mut set = HashSet::new();
    set.insert(JSON_MIME_TYPE);
    set.insert(YAML_MIME_TYPE);
    set.insert("application/yaml");
    set.insert("text/yaml");
    set.insert(TOML_MIME_TYPE);
    set.insert(XML_MIME_TYPE);
    set.insert("application/javascript");
    set.insert("application/x-sh");
    set.insert(SVG_MIME_TYPE);
    set
});

/// Word-processor containers accepted as text. They are decoded permissively.
static WORD_PROCESSOR_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    let mut set = HashSet::new();
    set.insert(LEGACY_WORD_MIME_TYPE);
    set.insert(DOCX_MIME_TYPE);
    set
});

/// Lowercase, trim and drop any `; charset=...` parameters.
pub fn normalize_mime_type(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Classify a declared media type.
///
/// The declared type wins when it is recognised. An empty, generic
/// (`application/octet-stream`) or unknown declared type falls back to the
/// file name extension.
///
/// # Example
///
/// ```rust
/// use docvault::core::mime::classify;
/// use docvault::FormatCategory;
///
/// assert_eq!(classify("application/pdf", None), FormatCategory::StructuredDocument);
/// assert_eq!(classify("", Some("scan.PNG")), FormatCategory::Image);
/// assert_eq!(classify("application/zip", Some("a.zip")), FormatCategory::Unsupported);
/// ```
pub fn classify(mime_type: &str, file_name: Option<&str>) -> FormatCategory {
    let normalized = normalize_mime_type(mime_type);
    let declared = category_for(&normalized);
    if declared != FormatCategory::Unsupported {
        return declared;
    }

    match file_name.and_then(mime_from_file_name) {
        Some(guessed) if guessed != normalized => category_for(&guessed),
        _ => FormatCategory::Unsupported,
    }
}

/// Whether any extractor can produce text for this input.
pub fn can_extract_text(mime_type: &str, file_name: Option<&str>) -> bool {
    classify(mime_type, file_name).can_extract_text()
}

/// True for `application/msword` and DOCX.
pub fn is_word_processor_type(mime_type: &str) -> bool {
    WORD_PROCESSOR_TYPES.contains(normalize_mime_type(mime_type).as_str())
}

/// Guess a media type from a file name, using the local table before `mime_guess`.
pub fn mime_from_file_name(file_name: &str) -> Option<String> {
    let extension = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();

    if let Some(mime) = EXT_TO_MIME.get(extension.as_str()) {
        return Some((*mime).to_string());
    }

    mime_guess::from_ext(&extension).first().map(|m| m.essence_str().to_string())
}

/// Pick the media type to record: the declared one, or a guess from the name
/// when nothing useful was declared.
pub fn effective_mime_type(mime_type: &str, file_name: &str) -> String {
    let normalized = normalize_mime_type(mime_type);
    if !normalized.is_empty() && normalized != OCTET_STREAM_MIME_TYPE {
        return normalized;
    }
    mime_from_file_name(file_name).unwrap_or_else(|| {
        if normalized.is_empty() {
            OCTET_STREAM_MIME_TYPE.to_string()
        } else {
            normalized
        }
    })
}

/// The media type handed to the text decoder: `mime_type` with the declared
/// `charset` parameter put back, if there was one.
pub fn with_charset(mime_type: &str, charset: Option<&str>) -> String {
    match charset {
        Some(charset) => format!("{}; charset={}", mime_type, charset),
        None => mime_type.to_string(),
    }
}

/// The `charset` label declared on `mime_type`, when it still applies to the
/// recorded `effective` type.
pub fn declared_charset(mime_type: &str, effective: &str) -> Option<String> {
    if normalize_mime_type(mime_type) != effective {
        return None;
    }
    crate::text::charset_from_mime(mime_type).map(|encoding| encoding.name().to_string())
}

fn category_for(normalized: &str) -> FormatCategory {
    if normalized == PDF_MIME_TYPE || normalized == "application/x-pdf" {
        return FormatCategory::StructuredDocument;
    }
    if TEXTUAL_APPLICATION_TYPES.contains(normalized) || WORD_PROCESSOR_TYPES.contains(normalized) {
        return FormatCategory::PlainText;
    }
    if normalized.starts_with("text/") {
        return FormatCategory::PlainText;
    }
    if normalized.starts_with("image/") && normalized.len() > "image/".len() {
        return FormatCategory::Image;
    }
    FormatCategory::Unsupported
}
