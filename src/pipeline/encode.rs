//! Image loading and encoding for the OCR engines.
//!
//! Vision models accept images as base64 data embedded in the JSON request
//! body. PNG is lossless, so re-encoding a JPEG photo never adds artefacts on
//! top of the camera's own. Phone photos are often 4000 px or more on the
//! long edge; they are scaled down to `max_pixels` first, which keeps the
//! request well under provider upload limits without losing legible text.

use crate::error::ExtractionError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Read just the image header, failing if the file cannot be decoded.
pub fn probe_image(path: &Path) -> Result<(u32, u32), ExtractionError> {
    ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| decode_error(path, e))?
        .into_dimensions()
        .map_err(|e| decode_error(path, e))
}

/// Fully decode an image file.
pub fn load_image(path: &Path) -> Result<DynamicImage, ExtractionError> {
    ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| decode_error(path, e))?
        .decode()
        .map_err(|e| decode_error(path, e))
}

/// Downscale so neither side exceeds `max_pixels`, keeping the aspect ratio.
pub fn fit_within(img: DynamicImage, max_pixels: u32) -> DynamicImage {
    if img.width() <= max_pixels && img.height() <= max_pixels {
        return img;
    }
    debug!(
        "Downscaling {}x{} image to fit {}px",
        img.width(),
        img.height(),
        max_pixels
    );
    img.resize(max_pixels, max_pixels, FilterType::Lanczos3)
}

/// Encode an image as a base64 PNG ready for a vision API.
///
/// `detail: "high"` makes GPT-4-class models tile the image instead of
/// reading one 512 px overview, which is what small menu print needs.
pub fn encode_image(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

fn decode_error(path: &Path, detail: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::ImageDecode {
        path: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Write;

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let data = encode_image(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert!(!decoded.is_empty());
    }

    #[test]
    fn fit_within_keeps_aspect_ratio() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(400, 100));
        let out = fit_within(img, 200);
        assert_eq!((out.width(), out.height()), (200, 50));

        let small = DynamicImage::ImageRgba8(RgbaImage::new(30, 20));
        let out = fit_within(small, 200);
        assert_eq!((out.width(), out.height()), (30, 20));
    }

    #[test]
    fn probe_and_load_real_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menu.png");
        RgbaImage::from_pixel(8, 6, Rgba([0, 0, 0, 255])).save(&path).unwrap();

        assert_eq!(probe_image(&path).unwrap(), (8, 6));
        assert_eq!(load_image(&path).unwrap().width(), 8);
    }

    #[test]
    fn truncated_png_fails_to_decode() {
        let mut f = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        f.write_all(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A]).unwrap();
        assert!(matches!(
            load_image(f.path()),
            Err(ExtractionError::ImageDecode { .. })
        ));
    }
}
