//! Source-PDF access via pdfium: page text and page images.
//!
//! Everything here is blocking. pdfium keeps thread-local state and is not
//! async-safe, so callers wrap these functions in `spawn_blocking`.
//!
//! Page images are capped on their longest edge (`max_pixels`) as well as
//! scaled by DPI, so an oversized source page cannot blow up memory.

use crate::error::FillError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bind to a pdfium shared library.
///
/// Tries `PDFIUM_LIB_PATH`, then a library next to the working directory,
/// then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, FillError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(path) => Pdfium::bind_to_library(PathBuf::from(path)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| FillError::PdfiumBindingFailed(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

fn open<'a>(pdfium: &'a Pdfium, pdf_path: &Path) -> Result<PdfDocument<'a>, FillError> {
    pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| FillError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{e:?}"),
        })
}

/// Extract the text of every page, pages separated by a newline.
pub fn extract_text_blocking(pdfium: &Pdfium, pdf_path: &Path) -> Result<String, FillError> {
    let document = open(pdfium, pdf_path)?;
    let mut pages = Vec::new();

    for (idx, page) in document.pages().iter().enumerate() {
        let text = page.text().map_err(|e| FillError::RasterisationFailed {
            page: idx + 1,
            detail: format!("text extraction: {e:?}"),
        })?;
        pages.push(text.all());
    }

    debug!("Extracted text from {} page(s) of {}", pages.len(), pdf_path.display());
    Ok(pages.join("\n"))
}

/// Render every page of a PDF, in order.
pub fn render_pages_blocking(
    pdfium: &Pdfium,
    pdf_path: &Path,
    dpi: u32,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, FillError> {
    let document = open(pdfium, pdf_path)?;
    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut images = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| FillError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        images.push(image);
    }

    Ok(images)
}
