//! Pure-Rust rasterization from the images embedded in each page.
//!
//! Scanned documents store each page as one large image XObject. Decoding that
//! image gives recognition the same input a renderer would, without a native
//! PDF library. Pages without images yield nothing.

use super::error::PdfError;
use super::raster::{PageImage, PageRasterizer, RasterizedPages};
use super::text::load_document;
use crate::core::cancel::StageGuard;
use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use std::io::Read;
use tracing::debug;

/// Images smaller than this on either side are ignored (icons, bullets).
const MIN_DIMENSION: i64 = 16;

#[derive(Debug, Clone, Default)]
pub struct EmbeddedImageRasterizer;

impl EmbeddedImageRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl PageRasterizer for EmbeddedImageRasterizer {
    fn name(&self) -> &str {
        "embedded-images"
    }

    fn rasterize(&self, bytes: &[u8], max_pages: Option<usize>, guard: &StageGuard) -> crate::Result<RasterizedPages> {
        let document = load_document(bytes)?;
        let pages = document.get_pages();
        let page_count = pages.len();
        let limit = max_pages.unwrap_or(page_count).min(page_count);

        let mut rasterized = Vec::new();
        let mut interrupted = None;

        for (page_number, page_id) in pages.into_iter().take(limit) {
            if let Err(err) = guard.check() {
                interrupted = Some(err);
                break;
            }

            let images = match document.get_page_images(page_id) {
                Ok(images) => images,
                Err(e) => {
                    debug!("Failed to get images from page {}: {}", page_number, e);
                    continue;
                }
            };

            let best = images
                .iter()
                .filter(|img| img.width >= MIN_DIMENSION && img.height >= MIN_DIMENSION)
                .filter_map(|img| match decode_pdf_image(img) {
                    Ok(decoded) => Some(decoded),
                    Err(e) => {
                        debug!("Skipping image on page {}: {}", page_number, e);
                        None
                    }
                })
                .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()));

            if let Some(image) = best {
                rasterized.push(PageImage { page_number, image });
            }
        }

        if rasterized.is_empty() && interrupted.is_none() {
            return Err(PdfError::NoRenderableContent.into());
        }

        debug!(
            pages = rasterized.len(),
            page_count, "Rasterized pages from embedded images"
        );

        Ok(RasterizedPages {
            pages: rasterized,
            page_count,
            interrupted,
        })
    }
}

fn decode_pdf_image(pdf_image: &lopdf::xobject::PdfImage) -> Result<DynamicImage, PdfError> {
    let filters: &[String] = pdf_image.filters.as_deref().unwrap_or(&[]);

    if filters.iter().any(|f| f == "DCTDecode") {
        return image::load_from_memory_with_format(pdf_image.content, ImageFormat::Jpeg)
            .map_err(|e| PdfError::ImageDecodeFailed(format!("JPEG: {}", e)));
    }

    if filters.iter().any(|f| f == "JPXDecode") {
        return image::load_from_memory(pdf_image.content)
            .map_err(|e| PdfError::ImageDecodeFailed(format!("JPEG 2000: {}", e)));
    }

    let samples = if filters.iter().any(|f| f == "FlateDecode") {
        let mut decoder = ZlibDecoder::new(pdf_image.content);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| PdfError::ImageDecodeFailed(format!("Decompression failed: {}", e)))?;
        decompressed
    } else if filters.is_empty() {
        pdf_image.content.to_vec()
    } else {
        return Err(PdfError::ImageDecodeFailed(format!("Unsupported image filter: {:?}", filters)));
    };

    let bits = pdf_image.bits_per_component.unwrap_or(8);
    if bits != 8 {
        return Err(PdfError::ImageDecodeFailed(format!(
            "Unsupported bits per component: {}",
            bits
        )));
    }

    let color_space = pdf_image.color_space.as_deref().unwrap_or("DeviceRGB");
    raw_samples_to_image(samples, pdf_image.width as u32, pdf_image.height as u32, color_space)
}

fn raw_samples_to_image(mut samples: Vec<u8>, width: u32, height: u32, color_space: &str) -> Result<DynamicImage, PdfError> {
    let pixels = width as usize * height as usize;

    let image = match color_space {
        "DeviceGray" | "Gray" | "CalGray" => {
            samples.truncate(pixels);
            GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8)
        }
        "DeviceCMYK" | "CMYK" => {
            let rgb = cmyk_to_rgb(&samples);
            RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        _ => {
            samples.truncate(pixels * 3);
            RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8)
        }
    };

    image.ok_or_else(|| {
        PdfError::ImageDecodeFailed(format!(
            "Sample buffer too small for {}x{} {}",
            width, height, color_space
        ))
    })
}

fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((cmyk.len() / 4) * 3);
    for chunk in cmyk.chunks_exact(4) {
        let k = 1.0 - f32::from(chunk[3]) / 255.0;
        for channel in &chunk[..3] {
            let value = 255.0 * (1.0 - f32::from(*channel) / 255.0) * k;
            rgb.push(value as u8);
        }
    }
    rgb
}
