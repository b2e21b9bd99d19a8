//! The recognition engine abstraction and its shared, lazily created instance.
//!
//! Engines are heavyweight (Tesseract loads its language model on init), so a
//! single instance is created on first use and reused by every ingestion. The
//! [`EngineHandle`] owns it behind an async mutex: one unit of recognition
//! work runs at a time, whichever run submitted it.

use super::error::OcrError;
use crate::{DocvaultError, Result};
use image::DynamicImage;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A blocking OCR engine. Calls are serialised by [`EngineHandle`], so
/// implementations may keep mutable state between images.
pub trait RecognitionEngine: Send {
    fn name(&self) -> &str;

    /// Recognize the text in one image.
    fn recognize(&mut self, image: &DynamicImage) -> Result<String>;

    /// Release native resources. Called once before the engine is dropped.
    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Creates engines on demand.
pub trait EngineFactory: Send + Sync {
    fn name(&self) -> &str;

    /// Build and initialise an engine. Runs on the blocking thread pool.
    fn create(&self) -> Result<Box<dyn RecognitionEngine>>;
}

type EngineSlot = Option<Box<dyn RecognitionEngine>>;

/// Owner of the process-wide recognition engine.
///
/// Cloning the handle shares the same engine.
#[derive(Clone)]
pub struct EngineHandle {
    factory: Option<Arc<dyn EngineFactory>>,
    slot: Arc<Mutex<EngineSlot>>,
    initializations: Arc<AtomicUsize>,
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("factory", &self.factory.as_ref().map(|factory| factory.name().to_string()))
            .field("initializations", &self.initialization_count())
            .finish()
    }
}

impl EngineHandle {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            factory: Some(factory),
            slot: Arc::new(Mutex::new(None)),
            initializations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A handle with no engine. Recognition fails with `MissingDependency`.
    pub fn unavailable() -> Self {
        Self {
            factory: None,
            slot: Arc::new(Mutex::new(None)),
            initializations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The engine configured by the enabled crate features, if any.
    pub fn from_features(config: &crate::core::config::OcrConfig) -> Self {
        #[cfg(feature = "tesseract")]
        {
            Self::new(Arc::new(super::tesseract::TesseractEngineFactory::new(config.clone())))
        }

        #[cfg(not(feature = "tesseract"))]
        {
            let _ = config;
            Self::unavailable()
        }
    }

    pub fn is_configured(&self) -> bool {
        self.factory.is_some()
    }

    /// How many engines have been created over the handle's lifetime.
    pub fn initialization_count(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }

    pub async fn is_initialized(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Wait for exclusive use of the engine, creating it if needed.
    pub async fn acquire(&self) -> Result<EngineLease> {
        let mut guard = Arc::clone(&self.slot).lock_owned().await;

        if guard.is_none() {
            let factory = self.factory.clone().ok_or_else(|| {
                DocvaultError::MissingDependency(
                    "No recognition engine configured (enable the `tesseract` feature or supply an EngineFactory)"
                        .to_string(),
                )
            })?;

            tracing::debug!(engine = factory.name(), "Initializing recognition engine");
            let engine = tokio::task::spawn_blocking(move || factory.create())
                .await
                .map_err(|e| DocvaultError::from(OcrError::EngineInitializationFailed(e.to_string())))??;

            self.initializations.fetch_add(1, Ordering::SeqCst);
            *guard = Some(engine);
        }

        Ok(EngineLease { guard })
    }

    /// Drop the engine. The next [`EngineHandle::acquire`] creates a new one.
    pub async fn shutdown(&self) -> Result<()> {
        let mut guard = self.slot.lock().await;
        if let Some(mut engine) = guard.take() {
            tracing::debug!(engine = engine.name(), "Shutting down recognition engine");
            engine.shutdown()?;
        }
        Ok(())
    }
}

/// Exclusive access to the engine for one unit of work.
///
/// The lease is `Send`, so it can move onto the blocking pool with the image.
pub struct EngineLease {
    guard: OwnedMutexGuard<EngineSlot>,
}

impl EngineLease {
    pub fn recognize(&mut self, image: &DynamicImage) -> Result<String> {
        match self.guard.as_mut() {
            Some(engine) => engine.recognize(image),
            None => Err(OcrError::EngineUnavailable.into()),
        }
    }
}
