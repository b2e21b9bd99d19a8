//! Turning document pages into images for recognition.

use crate::DocvaultError;
use crate::core::cancel::StageGuard;
use image::DynamicImage;

/// A page image ready for recognition.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-based page number.
    pub page_number: u32,
    pub image: DynamicImage,
}

#[derive(Debug)]
pub struct RasterizedPages {
    pub pages: Vec<PageImage>,
    /// Pages in the whole document, not only the rasterized ones.
    pub page_count: usize,
    /// Set when the stage stopped early; `pages` holds what was produced so far.
    pub interrupted: Option<DocvaultError>,
}

/// Produces page images from a structured document.
///
/// Implementations are blocking and run on the blocking thread pool.
pub trait PageRasterizer: Send + Sync {
    fn name(&self) -> &str;

    /// Rasterize up to `max_pages` pages (None = all). Cancellation and the
    /// deadline in `guard` are checked between pages.
    fn rasterize(&self, bytes: &[u8], max_pages: Option<usize>, guard: &StageGuard) -> crate::Result<RasterizedPages>;
}
