//! Page image encoding.
//!
//! A rasterised page is PNG-encoded once; the same bytes are saved under
//! `documents_images/{id}/` and sent to the model as a base64 attachment.

use crate::error::FillError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// PNG-encode a rendered page. `page` is 1-based and only used in errors.
pub fn png_bytes(img: &DynamicImage, page: usize) -> Result<Vec<u8>, FillError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| FillError::RasterisationFailed {
            page,
            detail: format!("PNG encoding: {e}"),
        })?;
    Ok(buf)
}

/// Wrap PNG bytes as a high-detail image attachment.
pub fn image_data(png: &[u8]) -> ImageData {
    let b64 = STANDARD.encode(png);
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, "image/png").with_detail("high")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn page_png_round_trips_through_attachment() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let png = png_bytes(&img, 1).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");

        let data = image_data(&png);
        assert_eq!(data.mime_type, "image/png");
        assert_eq!(STANDARD.decode(&data.data).unwrap(), png);
    }
}
