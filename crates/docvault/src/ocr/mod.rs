//! Optical character recognition.
//!
//! - [`RecognitionEngine`] / [`EngineFactory`]: the engine abstraction.
//!   `TesseractEngineFactory` is available with the `tesseract` feature; any
//!   other engine can be plugged in by implementing the traits.
//! - [`EngineHandle`]: the lazily created, shared, serialised engine instance.
//! - [`RecognitionExtractor`]: runs recognition over images with progress,
//!   cancellation and a stage deadline.
pub mod engine;
pub mod error;
pub mod processor;
#[cfg(feature = "tesseract")]
pub mod tesseract;

pub use engine::{EngineFactory, EngineHandle, EngineLease, RecognitionEngine};
pub use error::OcrError;
pub use processor::{RecognitionExtractor, RecognitionOutput};
#[cfg(feature = "tesseract")]
pub use tesseract::{TesseractEngine, TesseractEngineFactory};
