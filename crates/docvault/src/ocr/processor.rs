use super::engine::EngineHandle;
use super::error::OcrError;
use crate::core::cancel::StageGuard;
use crate::core::progress::ProgressScope;
use crate::text::strip_control_characters;
use crate::{DocvaultError, Result};
use image::DynamicImage;

/// Text recognized from one or more images.
#[derive(Debug)]
pub struct RecognitionOutput {
    /// Non-empty unit texts joined by a blank line, trimmed.
    pub text: String,
    pub units_processed: usize,
    pub unit_count: usize,
    /// Set when the stage stopped early; `text` holds the units finished so far.
    pub interrupted: Option<DocvaultError>,
}

/// Runs recognition over images through the shared engine.
#[derive(Debug, Clone)]
pub struct RecognitionExtractor {
    engine: EngineHandle,
}

impl RecognitionExtractor {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Decode an encoded image (PNG, JPEG, ...) and recognize it.
    ///
    /// Decoding is raced against the stage deadline and cancellation like
    /// recognition itself.
    pub async fn recognize_image(&self, bytes: &[u8], scope: &ProgressScope, guard: &StageGuard) -> Result<RecognitionOutput> {
        guard.check()?;

        let owned = bytes.to_vec();
        let task = tokio::task::spawn_blocking(move || image::load_from_memory(&owned));
        let token = guard.token().clone();

        let decoded = tokio::select! {
            joined = task => joined
                .map_err(|e| DocvaultError::image_processing(format!("Image decode task failed: {}", e)))?,
            _ = token.cancelled() => return Err(DocvaultError::Cancelled),
            _ = tokio::time::sleep(guard.remaining()) => return Err(guard.timeout_error()),
        };
        let image = decoded.map_err(|e| OcrError::ImageProcessingFailed(format!("Failed to decode image: {}", e)))?;

        self.recognize_pages(vec![image], scope, guard).await
    }

    /// Recognize each image in order, one engine lease per image.
    ///
    /// Before each unit the stage deadline and cancellation are checked; the
    /// unit in flight is raced against both. An engine error aborts the stage.
    pub async fn recognize_pages(
        &self,
        images: Vec<DynamicImage>,
        scope: &ProgressScope,
        guard: &StageGuard,
    ) -> Result<RecognitionOutput> {
        let unit_count = images.len();
        let mut texts: Vec<String> = Vec::with_capacity(unit_count);
        let mut units_processed = 0;
        let mut interrupted = None;

        scope.units(0, unit_count);

        for (index, image) in images.into_iter().enumerate() {
            if let Err(err) = guard.check() {
                interrupted = Some(err);
                break;
            }

            match self.recognize_unit(image, guard).await {
                Ok(text) => {
                    let text = strip_control_characters(text.trim());
                    if !text.is_empty() {
                        texts.push(text);
                    }
                    units_processed += 1;
                    scope.units(index + 1, unit_count);
                }
                Err(err) if err.is_interruption() => {
                    interrupted = Some(err);
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        tracing::debug!(unit_count, units_processed, "Recognition finished");

        Ok(RecognitionOutput {
            text: texts.join("\n\n").trim().to_string(),
            units_processed,
            unit_count,
            interrupted,
        })
    }

    async fn recognize_unit(&self, image: DynamicImage, guard: &StageGuard) -> Result<String> {
        let token = guard.token().clone();

        let mut lease = tokio::select! {
            lease = self.engine.acquire() => lease?,
            _ = token.cancelled() => return Err(DocvaultError::Cancelled),
            _ = tokio::time::sleep(guard.remaining()) => return Err(guard.timeout_error()),
        };

        let task = tokio::task::spawn_blocking(move || lease.recognize(&image));

        tokio::select! {
            joined = task => joined.map_err(|e| DocvaultError::ocr(format!("Recognition task failed: {}", e)))?,
            _ = token.cancelled() => Err(DocvaultError::Cancelled),
            _ = tokio::time::sleep(guard.remaining()) => Err(guard.timeout_error()),
        }
    }
}
