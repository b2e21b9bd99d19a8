//! Lifecycle of a document through one ingestion.

use crate::{DocvaultError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionState {
    Received,
    Classified,
    /// Unsupported format; stored without extraction.
    Rejected,
    Extracting,
    Extracted,
    ExtractionFailed,
    Stored,
    Deleted,
}

impl IngestionState {
    pub fn can_transition_to(self, next: IngestionState) -> bool {
        use IngestionState::*;
        matches!(
            (self, next),
            (Received, Classified)
                | (Classified, Rejected)
                | (Classified, Extracting)
                | (Extracting, Extracted)
                | (Extracting, ExtractionFailed)
                | (Rejected, Stored)
                | (Extracted, Stored)
                | (ExtractionFailed, Stored)
                | (Stored, Extracting)
                | (Stored, Deleted)
        )
    }

    /// Move to `next`, or fail with a validation error on an illegal edge.
    pub fn transition(&mut self, next: IngestionState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(DocvaultError::validation(format!(
                "Illegal ingestion transition {} -> {}",
                self, next
            )));
        }
        tracing::trace!(from = %self, to = %next, "ingestion state transition");
        *self = next;
        Ok(())
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl fmt::Display for IngestionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Classified => "classified",
            Self::Rejected => "rejected",
            Self::Extracting => "extracting",
            Self::Extracted => "extracted",
            Self::ExtractionFailed => "extraction_failed",
            Self::Stored => "stored",
            Self::Deleted => "deleted",
        };
        f.write_str(name)
    }
}
