//! Page rendering through pdfium, for documents whose pages are drawn rather
//! than stored as a single image.

use super::bindings::bind_pdfium;
use super::error::PdfError;
use super::raster::{PageImage, PageRasterizer, RasterizedPages};
use crate::core::cancel::StageGuard;
use crate::core::config::PageRenderOptions;
use image::DynamicImage;
use pdfium_render::prelude::*;

const PDF_POINTS_PER_INCH: f64 = 72.0;

/// Renders pages with pdfium at an adaptive DPI.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    options: PageRenderOptions,
}

impl PdfiumRasterizer {
    pub fn new(options: PageRenderOptions) -> Self {
        Self { options }
    }

    fn render_page(&self, page: &PdfPage<'_>) -> Result<DynamicImage, PdfError> {
        let width_points = page.width().value;
        let height_points = page.height().value;

        let dpi = if self.options.auto_adjust_dpi {
            calculate_optimal_dpi(
                width_points as f64,
                height_points as f64,
                self.options.target_dpi,
                self.options.max_image_dimension,
                self.options.min_dpi,
                self.options.max_dpi,
            )
        } else {
            self.options.target_dpi
        };

        let scale = dpi as f64 / PDF_POINTS_PER_INCH;

        let config = PdfRenderConfig::new()
            .set_target_width(((width_points * scale as f32) as i32).max(1))
            .set_target_height(((height_points * scale as f32) as i32).max(1))
            .rotate_if_landscape(PdfPageRenderRotation::None, false);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| PdfError::RenderingFailed(format!("Failed to render page: {}", e)))?;

        Ok(DynamicImage::ImageRgb8(bitmap.as_image().into_rgb8()))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn rasterize(&self, bytes: &[u8], max_pages: Option<usize>, guard: &StageGuard) -> crate::Result<RasterizedPages> {
        let bindings = bind_pdfium(PdfError::RenderingFailed, "page rasterization")?;
        let pdfium = Pdfium::new(bindings);

        let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
            let err_msg = e.to_string();
            if err_msg.to_lowercase().contains("password") {
                PdfError::PasswordRequired
            } else {
                PdfError::InvalidPdf(err_msg)
            }
        })?;

        let page_count = document.pages().len() as usize;
        let limit = max_pages.unwrap_or(page_count).min(page_count);
        let mut pages = Vec::with_capacity(limit);
        let mut interrupted = None;

        for index in 0..limit {
            if let Err(err) = guard.check() {
                interrupted = Some(err);
                break;
            }

            let page = document
                .pages()
                .get(index as u16)
                .map_err(|_| PdfError::PageNotFound(index as u32 + 1))?;
            pages.push(PageImage {
                page_number: index as u32 + 1,
                image: self.render_page(&page)?,
            });
        }

        if pages.is_empty() && interrupted.is_none() {
            return Err(PdfError::NoRenderableContent.into());
        }

        Ok(RasterizedPages {
            pages,
            page_count,
            interrupted,
        })
    }
}

fn calculate_optimal_dpi(
    page_width: f64,
    page_height: f64,
    target_dpi: i32,
    max_dimension: i32,
    min_dpi: i32,
    max_dpi: i32,
) -> i32 {
    let width_inches = page_width / PDF_POINTS_PER_INCH;
    let height_inches = page_height / PDF_POINTS_PER_INCH;

    let width_at_target = (width_inches * target_dpi as f64) as i32;
    let height_at_target = (height_inches * target_dpi as f64) as i32;

    if width_at_target <= max_dimension && height_at_target <= max_dimension {
        return target_dpi.clamp(min_dpi, max_dpi);
    }

    let width_limited_dpi = (max_dimension as f64 / width_inches) as i32;
    let height_limited_dpi = (max_dimension as f64 / height_inches) as i32;

    width_limited_dpi.min(height_limited_dpi).clamp(min_dpi, max_dpi)
}
