//! Tesseract-backed recognition engine.

use super::engine::{EngineFactory, RecognitionEngine};
use super::error::OcrError;
use crate::Result;
use crate::core::config::OcrConfig;
use image::DynamicImage;
use kreuzberg_tesseract::{TessPageSegMode, TesseractAPI};
use std::env;
use std::path::{Path, PathBuf};

const FALLBACK_TESSDATA_PATHS: &[&str] = &[
    "/opt/homebrew/share/tessdata",
    "/opt/homebrew/opt/tesseract/share/tessdata",
    "/usr/local/opt/tesseract/share/tessdata",
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    r#"C:\Program Files\Tesseract-OCR\tessdata"#,
    r#"C:\ProgramData\Tesseract-OCR\tessdata"#,
];

/// Configured path, then `TESSDATA_PREFIX`, then the usual install locations.
fn resolve_tessdata_path(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return Some(path.to_path_buf());
    }
    if let Ok(prefix) = env::var("TESSDATA_PREFIX")
        && !prefix.is_empty()
    {
        return Some(PathBuf::from(prefix));
    }
    FALLBACK_TESSDATA_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

/// Language codes joined with `+`, each of which needs a traineddata file.
fn validate_languages(language: &str, tessdata: Option<&Path>) -> std::result::Result<(), OcrError> {
    if language.trim().is_empty() {
        return Err(OcrError::InvalidLanguageCode(
            "Language cannot be empty. Please specify a valid language code (e.g., 'eng')".to_string(),
        ));
    }

    // Tesseract can crash on a missing language file instead of returning an error.
    if let Some(dir) = tessdata {
        for lang in language.split('+').map(str::trim).filter(|lang| !lang.is_empty()) {
            let traineddata = dir.join(format!("{}.traineddata", lang));
            if !traineddata.exists() {
                return Err(OcrError::InvalidLanguageCode(format!(
                    "Language '{}' not found. Traineddata file does not exist: {}",
                    lang,
                    traineddata.display()
                )));
            }
        }
    }

    Ok(())
}

pub struct TesseractEngine {
    api: TesseractAPI,
}

impl RecognitionEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&mut self, image: &DynamicImage) -> Result<String> {
        let rgb_image = image.to_rgb8();
        let (width, height) = rgb_image.dimensions();
        let bytes_per_pixel = 3;
        let bytes_per_line = width * bytes_per_pixel;

        self.api
            .set_image(
                rgb_image.as_raw(),
                width as i32,
                height as i32,
                bytes_per_pixel as i32,
                bytes_per_line as i32,
            )
            .map_err(|e| OcrError::ProcessingFailed(format!("Failed to set image: {}", e)))?;

        self.api
            .recognize()
            .map_err(|e| OcrError::ProcessingFailed(format!("Failed to recognize text: {}", e)))?;

        let text = self
            .api
            .get_utf8_text()
            .map_err(|e| OcrError::ProcessingFailed(format!("Failed to extract text: {}", e)))?;

        Ok(text)
    }
}

/// Builds [`TesseractEngine`]s from an [`OcrConfig`].
#[derive(Debug, Clone)]
pub struct TesseractEngineFactory {
    config: OcrConfig,
}

impl TesseractEngineFactory {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }
}

impl EngineFactory for TesseractEngineFactory {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn create(&self) -> Result<Box<dyn RecognitionEngine>> {
        let tessdata = resolve_tessdata_path(self.config.tessdata_path.as_deref());
        validate_languages(&self.config.language, tessdata.as_deref())?;

        let tessdata_str = tessdata
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_default();

        let api = TesseractAPI::new();
        api.init(&tessdata_str, &self.config.language).map_err(|e| {
            OcrError::EngineInitializationFailed(format!(
                "Failed to initialize language '{}': {}",
                self.config.language, e
            ))
        })?;

        api.set_page_seg_mode(TessPageSegMode::from_int(self.config.psm))
            .map_err(|e| OcrError::InvalidConfiguration(format!("Failed to set PSM mode: {}", e)))?;

        tracing::info!(
            language = %self.config.language,
            tessdata = %tessdata_str,
            "Tesseract engine initialized"
        );

        Ok(Box::new(TesseractEngine { api }))
    }
}
