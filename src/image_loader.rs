//! Image decoding from raw upload bytes
//!
//! The decoder sniffs the container format from its magic bytes, decodes it
//! with the `image` crate, applies the EXIF orientation and converts the
//! result to an OpenCV `Mat` in BGR order for downstream processing.
//!
//! ## Supported Formats
//!
//! Every format enabled in the `image` crate's default feature set, most
//! notably JPEG and PNG. Animated formats contribute their first frame.

use image::{DynamicImage, ImageFormat};
use opencv::{
    core::{Mat, Scalar, Vector, CV_8UC3},
    prelude::*,
};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::exif::{apply_orientation, read_orientation};

/// Detect the container format from magic bytes
///
/// # Errors
///
/// `DecodeError` for empty input or an unrecognized signature.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat> {
    if bytes.is_empty() {
        return Err(AnalysisError::decode_msg("empty input"));
    }
    image::guess_format(bytes).map_err(|e| AnalysisError::decode("unrecognized image format", e))
}

/// Decode raw image bytes into a BGR `Mat`, honoring EXIF orientation
///
/// # Arguments
///
/// * `bytes` - Encoded image as uploaded (PNG, JPEG, ...)
///
/// # Returns
///
/// OpenCV Mat in BGR format (`CV_8UC3`)
///
/// # Errors
///
/// Returns `AnalysisError::DecodeError` if:
/// - Input is empty or the format is not recognized
/// - Decoding fails (truncated or corrupt data)
/// - The image has zero width or height
///
/// # Example
///
/// ```rust,no_run
/// use assay_reader::image_loader::decode;
/// use opencv::prelude::*;
///
/// let bytes = std::fs::read("photo.jpg").unwrap();
/// let mat = decode(&bytes)?;
/// println!("Decoded image: {}x{}", mat.cols(), mat.rows());
/// # Ok::<(), assay_reader::AnalysisError>(())
/// ```
pub fn decode(bytes: &[u8]) -> Result<Mat> {
    decode_with_orientation(bytes, true)
}

/// Decode raw image bytes, optionally skipping EXIF orientation
pub fn decode_with_orientation(bytes: &[u8], exif_correction: bool) -> Result<Mat> {
    let image = decode_dynamic(bytes, exif_correction)?;

    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    rgb_to_bgr_mat(rgb.as_raw(), width as i32, height as i32)
}

/// Decode to a `DynamicImage` with orientation applied
fn decode_dynamic(bytes: &[u8], exif_correction: bool) -> Result<DynamicImage> {
    let format = detect_format(bytes)?;

    let image = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        AnalysisError::decode(format!("failed to decode {:?} image", format), e)
    })?;

    if image.width() == 0 || image.height() == 0 {
        return Err(AnalysisError::decode_msg(format!(
            "image has zero size ({}x{})",
            image.width(),
            image.height()
        )));
    }

    let image = if exif_correction {
        apply_orientation(image, read_orientation(bytes))
    } else {
        image
    };

    debug!(
        ?format,
        width = image.width(),
        height = image.height(),
        "image decoded"
    );
    Ok(image)
}

/// Convert RGB byte buffer to OpenCV BGR Mat
fn rgb_to_bgr_mat(rgb_data: &[u8], width: i32, height: i32) -> Result<Mat> {
    let expected = width as usize * height as usize * 3;
    if rgb_data.len() != expected {
        return Err(AnalysisError::decode_msg(format!(
            "pixel buffer has {} bytes, expected {} for {}x{}",
            rgb_data.len(),
            expected,
            width,
            height
        )));
    }

    let mut mat = Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0))
        .map_err(|e| AnalysisError::opencv("image allocation", e))?;

    // BGR order for OpenCV
    let dst = mat
        .data_bytes_mut()
        .map_err(|e| AnalysisError::opencv("image buffer access", e))?;
    for (bgr, rgb) in dst.chunks_exact_mut(3).zip(rgb_data.chunks_exact(3)) {
        bgr[0] = rgb[2];
        bgr[1] = rgb[1];
        bgr[2] = rgb[0];
    }

    Ok(mat)
}

/// Encode a BGR or BGRA image as PNG, preserving alpha
pub fn encode_png(image: &Mat) -> Result<Vec<u8>> {
    if image.empty() {
        return Err(AnalysisError::ProcessingError(
            "Cannot encode an empty image".into(),
        ));
    }

    let mut buffer = Vector::<u8>::new();
    let written = opencv::imgcodecs::imencode(".png", image, &mut buffer, &Vector::new())
        .map_err(|e| AnalysisError::opencv("PNG encoding", e))?;
    if !written {
        return Err(AnalysisError::ProcessingError(
            "PNG encoder rejected the image".into(),
        ));
    }
    Ok(buffer.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use opencv::core::{Vec3b, Vec4b, CV_8UC4};
    use std::io::Cursor;

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_detect_format() {
        let png = png_bytes(DynamicImage::ImageRgb8(RgbImage::new(2, 2)));
        assert_eq!(detect_format(&png).unwrap(), ImageFormat::Png);

        let jpeg_magic = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];
        assert_eq!(detect_format(&jpeg_magic).unwrap(), ImageFormat::Jpeg);

        assert!(matches!(
            detect_format(b"definitely not an image"),
            Err(AnalysisError::DecodeError { .. })
        ));
    }

    #[test]
    fn test_empty_input_is_decode_error() {
        let err = decode(&[]).unwrap_err();
        assert!(matches!(err, AnalysisError::DecodeError { .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_truncated_png_is_decode_error() {
        let png = png_bytes(DynamicImage::ImageRgb8(RgbImage::new(16, 16)));
        let truncated = &png[..png.len() / 2];
        assert!(matches!(
            decode(truncated),
            Err(AnalysisError::DecodeError { .. })
        ));
    }

    #[test]
    fn test_decode_png_to_bgr() {
        let mut img = RgbImage::new(2, 2);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));
        img.put_pixel(0, 1, Rgb([0, 0, 255]));
        img.put_pixel(1, 1, Rgb([255, 255, 255]));

        let mat = decode(&png_bytes(DynamicImage::ImageRgb8(img))).unwrap();
        assert_eq!(mat.rows(), 2);
        assert_eq!(mat.cols(), 2);
        assert_eq!(mat.typ(), CV_8UC3);

        assert_eq!(*mat.at_2d::<Vec3b>(0, 0).unwrap(), Vec3b::from([0, 0, 255]));
        assert_eq!(*mat.at_2d::<Vec3b>(0, 1).unwrap(), Vec3b::from([0, 255, 0]));
        assert_eq!(*mat.at_2d::<Vec3b>(1, 0).unwrap(), Vec3b::from([255, 0, 0]));
        assert_eq!(*mat.at_2d::<Vec3b>(1, 1).unwrap(), Vec3b::from([255, 255, 255]));
    }

    #[test]
    fn test_decode_drops_alpha() {
        let img = RgbaImage::from_pixel(3, 1, Rgba([10, 20, 30, 128]));
        let mat = decode(&png_bytes(DynamicImage::ImageRgba8(img))).unwrap();
        assert_eq!(mat.channels(), 3);
        assert_eq!(*mat.at_2d::<Vec3b>(0, 2).unwrap(), Vec3b::from([30, 20, 10]));
    }

    #[test]
    fn test_rgb_to_bgr_rejects_short_buffer() {
        assert!(rgb_to_bgr_mat(&[1, 2, 3], 2, 2).is_err());
    }

    #[test]
    fn test_encode_png_preserves_alpha() {
        let mut bgra =
            Mat::new_rows_cols_with_default(2, 2, CV_8UC4, Scalar::all(0.0)).unwrap();
        *bgra.at_2d_mut::<Vec4b>(0, 0).unwrap() = Vec4b::from([10, 20, 30, 255]);

        let png = encode_png(&bgra).unwrap();
        assert_eq!(detect_format(&png).unwrap(), ImageFormat::Png);

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [30, 20, 10, 255]);
        assert_eq!(decoded.get_pixel(1, 1).0[3], 0);
    }

    #[test]
    fn test_encode_empty_fails() {
        assert!(encode_png(&Mat::default()).is_err());
    }
}
