//! Plain text decoding.
//!
//! Textual formats are decoded strictly: a byte order mark, a declared
//! `charset` parameter, valid UTF-8 or a detected legacy encoding, in that
//! order. Bytes the chosen encoding cannot decode are an error, not a source
//! of replacement characters.
//!
//! Word-processor containers are accepted as text too, and decoded
//! permissively: the bytes are read as lossy UTF-8 and control characters are
//! dropped.
//!
//! # Example
//!
//! ```rust
//! use docvault::extraction::text::PlainTextReader;
//!
//! # fn example() -> docvault::Result<()> {
//! let text = PlainTextReader::new().read(b"  Hello world\n", "text/plain")?;
//! assert_eq!(text, "Hello world");
//! # Ok(())
//! # }
//! ```
use crate::core::mime::is_word_processor_type;
use crate::error::{DocvaultError, Result};
use crate::text::{charset_from_mime, decode_lossy, decode_strict, strip_control_characters};

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextReader;

impl PlainTextReader {
    pub fn new() -> Self {
        Self
    }

    /// Decode `bytes` declared as `mime_type` and trim surrounding whitespace.
    pub fn read(&self, bytes: &[u8], mime_type: &str) -> Result<String> {
        if bytes.is_empty() {
            return Ok(String::new());
        }

        if is_word_processor_type(mime_type) {
            let text = strip_control_characters(&decode_lossy(bytes));
            return Ok(text.trim().to_string());
        }

        let (text, encoding) = decode_strict(bytes, charset_from_mime(mime_type)).ok_or_else(|| {
            DocvaultError::extraction(format!(
                "Could not decode {} bytes of {} as text",
                bytes.len(),
                mime_type
            ))
        })?;

        tracing::debug!(encoding = encoding.name(), bytes = bytes.len(), "Decoded plain text");
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_utf8_and_trims() {
        let text = PlainTextReader::new().read(b"\n  Hello world  \r\n", "text/plain").unwrap();
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn test_empty_input_is_empty_text() {
        assert_eq!(PlainTextReader::new().read(b"", "text/plain").unwrap(), "");
    }

    #[test]
    fn test_invalid_bytes_for_declared_charset_fail() {
        let err = PlainTextReader::new()
            .read(b"abc\xff\xfe", "text/plain; charset=utf-8")
            .unwrap_err();
        assert!(matches!(err, DocvaultError::Extraction { .. }));
    }

    #[test]
    fn test_word_documents_are_read_permissively() {
        let bytes = b"\xd0\xcf\x11\xe0Report\x00 body\x07 text";
        let text = PlainTextReader::new().read(bytes, "application/msword").unwrap();
        assert!(text.contains("Report body text"));
        assert!(!text.contains('\u{0}'));
    }

    #[test]
    fn test_json_is_text() {
        let text = PlainTextReader::new()
            .read(br#"{"key": "value"}"#, "application/json")
            .unwrap();
        assert_eq!(text, r#"{"key": "value"}"#);
    }
}
