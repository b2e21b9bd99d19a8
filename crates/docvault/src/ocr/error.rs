use std::fmt;

/// Recognition-specific errors.
#[derive(Debug, Clone)]
pub enum OcrError {
    EngineInitializationFailed(String),
    /// The engine was shut down and no factory is available to recreate it.
    EngineUnavailable,
    InvalidConfiguration(String),
    InvalidLanguageCode(String),
    ImageProcessingFailed(String),
    ProcessingFailed(String),
}

impl fmt::Display for OcrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EngineInitializationFailed(msg) => {
                write!(f, "Recognition engine initialization failed: {}", msg)
            }
            Self::EngineUnavailable => write!(f, "Recognition engine unavailable"),
            Self::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Self::InvalidLanguageCode(msg) => write!(f, "Invalid language code: {}", msg),
            Self::ImageProcessingFailed(msg) => write!(f, "Image processing failed: {}", msg),
            Self::ProcessingFailed(msg) => write!(f, "OCR processing failed: {}", msg),
        }
    }
}

impl std::error::Error for OcrError {}

// NOTE: No From<std::io::Error> impl - IO errors must bubble up unchanged

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialization_failed_error() {
        let err = OcrError::EngineInitializationFailed("missing eng.traineddata".to_string());
        assert_eq!(
            err.to_string(),
            "Recognition engine initialization failed: missing eng.traineddata"
        );
    }

    #[test]
    fn test_converts_into_ocr_error() {
        let err: crate::DocvaultError = OcrError::ProcessingFailed("boom".to_string()).into();
        assert!(matches!(err, crate::DocvaultError::Ocr { .. }));
        assert_eq!(err.to_string(), "OCR error: OCR processing failed: boom");
    }
}
