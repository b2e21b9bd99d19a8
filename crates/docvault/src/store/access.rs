use crate::types::{DocumentRecord, OwnerId};
use crate::{DocvaultError, Result};

/// The single ownership check used by every store operation.
pub fn authorize(record: &DocumentRecord, owner: &OwnerId) -> Result<()> {
    if record.owner_id == *owner {
        Ok(())
    } else {
        tracing::warn!(document = %record.id, "Access denied to document owned by another principal");
        Err(DocvaultError::access_denied(record.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentId, ExtractionMethod, FormatCategory};
    use chrono::Utc;

    fn record_for(owner: &str) -> DocumentRecord {
        DocumentRecord {
            id: DocumentId::new(),
            owner_id: OwnerId::from(owner),
            name: "a.txt".to_string(),
            mime_type: "text/plain".to_string(),
            declared_charset: None,
            size_bytes: 0,
            raw_content: Vec::new(),
            category: FormatCategory::PlainText,
            extracted_text: String::new(),
            extraction_method: ExtractionMethod::None,
            extraction_error: None,
            page_count: None,
            uploaded_at: Utc::now(),
            processing_duration_ms: 0,
            last_extraction_at: None,
        }
    }

    #[test]
    fn test_owner_is_authorized() {
        assert!(authorize(&record_for("alice"), &OwnerId::from("alice")).is_ok());
    }

    #[test]
    fn test_other_owner_is_denied() {
        let record = record_for("alice");
        let err = authorize(&record, &OwnerId::from("bob")).unwrap_err();
        assert!(matches!(err, DocvaultError::AccessDenied { ref id } if *id == record.id.to_string()));
    }

    #[test]
    fn test_owner_comparison_is_exact() {
        assert!(authorize(&record_for("alice"), &OwnerId::from("Alice")).is_err());
    }
}
