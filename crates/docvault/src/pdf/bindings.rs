use super::error::PdfError;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use pdfium_render::prelude::*;

/// Outcome of the first attempt to bind the system pdfium library.
enum InitializationState {
    Uninitialized,
    Initialized,
    Failed(String),
}

/// Binding is attempted once per process. A failure is cached so later
/// documents fail fast instead of probing the filesystem again.
static PDFIUM_STATE: Lazy<Mutex<InitializationState>> = Lazy::new(|| Mutex::new(InitializationState::Uninitialized));

/// Create fresh pdfium bindings, initialising the library on first use.
///
/// `map_err` chooses the `PdfError` variant, `context` names the caller in messages.
pub(crate) fn bind_pdfium(
    map_err: fn(String) -> PdfError,
    context: &'static str,
) -> Result<Box<dyn PdfiumLibraryBindings>, PdfError> {
    let mut state = PDFIUM_STATE.lock();

    match &*state {
        InitializationState::Failed(err) => {
            return Err(map_err(format!(
                "Pdfium initialization previously failed ({}): {}",
                context, err
            )));
        }
        InitializationState::Uninitialized => {
            return match Pdfium::bind_to_system_library() {
                Ok(bindings) => {
                    *state = InitializationState::Initialized;
                    tracing::debug!(context, "Pdfium bound to system library");
                    Ok(bindings)
                }
                Err(e) => {
                    let message = e.to_string();
                    *state = InitializationState::Failed(message.clone());
                    Err(map_err(format!("Pdfium initialization failed ({}): {}", context, message)))
                }
            };
        }
        InitializationState::Initialized => {}
    }

    Pdfium::bind_to_system_library()
        .map_err(|e| map_err(format!("Failed to create Pdfium bindings ({}): {}", context, e)))
}
