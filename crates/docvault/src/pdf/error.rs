use std::fmt;

/// Failures inside the PDF layer. Converted to `DocvaultError::Parsing` at
/// the crate boundary.
#[derive(Debug, Clone)]
pub enum PdfError {
    InvalidPdf(String),
    /// Encrypted with a non-empty user password.
    PasswordRequired,
    PageNotFound(u32),
    /// No page yielded an image that could be handed to recognition.
    NoRenderableContent,
    ImageDecodeFailed(String),
    RenderingFailed(String),
    Io(String),
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPdf(msg) => write!(f, "Not a readable PDF: {}", msg),
            Self::PasswordRequired => f.write_str("PDF requires a password"),
            Self::PageNotFound(page) => write!(f, "Page {} not found", page),
            Self::NoRenderableContent => f.write_str("No page could be rasterized"),
            Self::ImageDecodeFailed(msg) => write!(f, "Embedded image decode failed: {}", msg),
            Self::RenderingFailed(msg) => write!(f, "Page rendering failed: {}", msg),
            Self::Io(msg) => write!(f, "PDF read failed: {}", msg),
        }
    }
}

impl std::error::Error for PdfError {}

impl From<lopdf::Error> for PdfError {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(io_err) => Self::Io(io_err.to_string()),
            other => Self::InvalidPdf(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;
