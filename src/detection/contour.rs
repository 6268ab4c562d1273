//! Saturation/contour region search
//!
//! Reagent regions are strongly colored against a neutral background, so
//! the saturation channel separates them well:
//! - Threshold the blurred HSV saturation channel
//! - Clean the mask with elliptical open/close passes
//! - Keep the largest external contour
//! - Optionally trim the crop to its inscribed circle for round substrates

use opencv::{
    core::{Mat, Point, Scalar, Size, Vector, BORDER_CONSTANT, BORDER_DEFAULT},
    imgproc::{
        bounding_rect, circle, contour_area, draw_contours, find_contours, gaussian_blur,
        get_structuring_element, morphology_default_border_value, morphology_ex, threshold,
        CHAIN_APPROX_SIMPLE, LINE_8, MORPH_CLOSE, MORPH_ELLIPSE, MORPH_OPEN, RETR_EXTERNAL,
        THRESH_BINARY,
    },
    prelude::*,
};
use tracing::debug;

use crate::config::ContourSearchConfig;
use crate::constants::contour::{
    BLUR_KERNEL_SIZE, MIN_AREA_FRACTION, MORPH_ITERATIONS, MORPH_KERNEL_SIZE,
    SATURATION_THRESHOLD,
};
use crate::{AnalysisError, Result};

use super::region::{apply_alpha_mask, area_percent, crop, empty_mask, require_bgr, to_hsv};
use super::{RegionExtractor, RegionResult};

type VectorOfPoint = Vector<Point>;

/// Saturation-based region detector
#[derive(Debug, Clone)]
pub struct ContourDetector {
    saturation_threshold: u8,
    morph_kernel_size: i32,
    min_area_fraction: f64,
    circular_crop: bool,
}

impl Default for ContourDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ContourDetector {
    /// Create a detector with default parameters
    pub fn new() -> Self {
        Self {
            saturation_threshold: SATURATION_THRESHOLD,
            morph_kernel_size: MORPH_KERNEL_SIZE,
            min_area_fraction: MIN_AREA_FRACTION,
            circular_crop: false,
        }
    }

    /// Create a detector with custom parameters
    pub fn with_params(
        saturation_threshold: u8,
        morph_kernel_size: i32,
        min_area_fraction: f64,
    ) -> Self {
        Self {
            saturation_threshold,
            morph_kernel_size,
            min_area_fraction,
            circular_crop: false,
        }
    }

    /// Trim the crop to its inscribed circle
    pub fn with_circular_crop(mut self, enabled: bool) -> Self {
        self.circular_crop = enabled;
        self
    }

    pub fn from_config(config: &ContourSearchConfig) -> Self {
        Self::with_params(
            config.saturation_threshold,
            config.morph_kernel_size,
            config.min_area_fraction,
        )
        .with_circular_crop(config.circular_crop)
    }

    /// Extract the most saturated prominent region
    ///
    /// # Arguments
    ///
    /// * `image` - Decoded BGR (or BGRA) image
    ///
    /// # Returns
    ///
    /// The BGRA crop of the contour's bounding rectangle, transparent outside
    /// the contour, or `None` if no contour is large enough
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError` if the image is empty or not a color image
    pub fn detect(&self, image: &Mat) -> Result<Option<RegionResult>> {
        let bgr = require_bgr(image)?;
        let rows = bgr.rows();
        let cols = bgr.cols();

        // Step 1: Saturation mask
        let binary = self.saturation_mask(&bgr)?;

        // Step 2: Morphological cleanup
        let cleaned = self.morphological_refinement(&binary)?;

        // Step 3: Largest external contour
        let mut contours = Vector::<VectorOfPoint>::new();
        find_contours(
            &cleaned,
            &mut contours,
            RETR_EXTERNAL,
            CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )
        .map_err(|e| AnalysisError::opencv("contour detection", e))?;

        let Some((index, area)) = largest_contour(&contours)? else {
            debug!("no saturated contour found");
            return Ok(None);
        };

        let image_area = rows as f64 * cols as f64;
        if area <= 0.0 || area < self.min_area_fraction * image_area {
            debug!(
                area,
                min_area = self.min_area_fraction * image_area,
                "largest contour below minimum area"
            );
            return Ok(None);
        }

        // Step 4: Filled contour as alpha mask, crop to bounding rectangle
        let mut mask = empty_mask(rows, cols)?;
        draw_contours(
            &mut mask,
            &contours,
            index as i32,
            Scalar::all(255.0),
            -1,
            LINE_8,
            &Mat::default(),
            i32::MAX,
            Point::new(0, 0),
        )
        .map_err(|e| AnalysisError::opencv("contour mask drawing", e))?;
        let masked = apply_alpha_mask(&bgr, &mask)?;

        let contour = contours
            .get(index)
            .map_err(|e| AnalysisError::opencv("contour access", e))?;
        let bounds = bounding_rect(&contour)
            .map_err(|e| AnalysisError::opencv("bounding rectangle", e))?;
        let mut pixels = crop(&masked, bounds)?;

        // Step 5: Optional circular refinement
        if self.circular_crop {
            pixels = inscribed_circle(&pixels)?;
        }

        let area_percent = area_percent(area, rows, cols);
        debug!(
            area,
            area_percent,
            x = bounds.x,
            y = bounds.y,
            width = bounds.width,
            height = bounds.height,
            circular_crop = self.circular_crop,
            "contour region extracted"
        );

        Ok(Some(RegionResult {
            pixels,
            area_percent,
        }))
    }

    /// Blurred saturation channel thresholded to a binary mask
    fn saturation_mask(&self, bgr: &Mat) -> Result<Mat> {
        let hsv = to_hsv(bgr)?;
        let mut saturation = Mat::default();
        opencv::core::extract_channel(&hsv, &mut saturation, 1)
            .map_err(|e| AnalysisError::opencv("saturation channel extraction", e))?;

        let mut blurred = Mat::default();
        gaussian_blur(
            &saturation,
            &mut blurred,
            Size::new(BLUR_KERNEL_SIZE, BLUR_KERNEL_SIZE),
            0.0,
            0.0,
            BORDER_DEFAULT,
            opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(|e| AnalysisError::opencv("saturation blur", e))?;

        let mut binary = Mat::default();
        threshold(
            &blurred,
            &mut binary,
            self.saturation_threshold as f64,
            255.0,
            THRESH_BINARY,
        )
        .map_err(|e| AnalysisError::opencv("saturation threshold", e))?;
        Ok(binary)
    }

    /// Opening removes speckles, closing fills holes
    fn morphological_refinement(&self, binary: &Mat) -> Result<Mat> {
        let kernel = get_structuring_element(
            MORPH_ELLIPSE,
            Size::new(self.morph_kernel_size, self.morph_kernel_size),
            Point::new(-1, -1),
        )
        .map_err(|e| AnalysisError::opencv("kernel creation", e))?;
        // Pixels past the frame never erode the mask
        let border = morphology_default_border_value()
            .map_err(|e| AnalysisError::opencv("morphology border value", e))?;

        let mut opened = Mat::default();
        morphology_ex(
            binary,
            &mut opened,
            MORPH_OPEN,
            &kernel,
            Point::new(-1, -1),
            MORPH_ITERATIONS,
            BORDER_CONSTANT,
            border,
        )
        .map_err(|e| AnalysisError::opencv("opening", e))?;

        let mut closed = Mat::default();
        morphology_ex(
            &opened,
            &mut closed,
            MORPH_CLOSE,
            &kernel,
            Point::new(-1, -1),
            MORPH_ITERATIONS,
            BORDER_CONSTANT,
            border,
        )
        .map_err(|e| AnalysisError::opencv("closing", e))?;

        Ok(closed)
    }
}

/// Index and area of the largest contour
fn largest_contour(contours: &Vector<VectorOfPoint>) -> Result<Option<(usize, f64)>> {
    let mut best: Option<(usize, f64)> = None;
    for (index, contour) in contours.iter().enumerate() {
        let area = contour_area(&contour, false)
            .map_err(|e| AnalysisError::opencv("contour area", e))?;
        if best.map_or(true, |(_, best_area)| area > best_area) {
            best = Some((index, area));
        }
    }
    Ok(best)
}

/// Clear everything outside the circle inscribed in the crop
fn inscribed_circle(crop_bgra: &Mat) -> Result<Mat> {
    let width = crop_bgra.cols();
    let height = crop_bgra.rows();
    let radius = width.min(height) / 2;

    let mut mask = empty_mask(height, width)?;
    circle(
        &mut mask,
        Point::new(width / 2, height / 2),
        radius,
        Scalar::all(255.0),
        -1,
        LINE_8,
        0,
    )
    .map_err(|e| AnalysisError::opencv("inscribed circle drawing", e))?;

    let mut trimmed = Mat::new_rows_cols_with_default(
        height,
        width,
        opencv::core::CV_8UC4,
        Scalar::all(0.0),
    )
    .map_err(|e| AnalysisError::opencv("region allocation", e))?;
    crop_bgra
        .copy_to_masked(&mut trimmed, &mask)
        .map_err(|e| AnalysisError::opencv("inscribed circle copy", e))?;
    Ok(trimmed)
}

impl RegionExtractor for ContourDetector {
    fn name(&self) -> &'static str {
        "contour"
    }

    fn extract(&self, image: &Mat) -> Result<Option<RegionResult>> {
        self.detect(image)
    }
}

/// Extract the largest saturated region using the given parameters
pub fn extract_region_contour(
    image: &Mat,
    saturation_threshold: u8,
    morph_kernel_size: i32,
    min_area_fraction: f64,
) -> Result<Option<RegionResult>> {
    let config = ContourSearchConfig {
        saturation_threshold,
        morph_kernel_size,
        min_area_fraction,
        circular_crop: false,
    };
    config.validate()?;
    ContourDetector::from_config(&config).detect(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Rect, Vec4b, CV_8UC3};
    use opencv::imgproc::rectangle;

    fn square_image() -> Mat {
        let mut image =
            Mat::new_rows_cols_with_default(100, 100, CV_8UC3, Scalar::all(128.0)).unwrap();
        rectangle(
            &mut image,
            Rect::new(20, 30, 40, 30),
            Scalar::new(40.0, 40.0, 220.0, 0.0),
            -1,
            LINE_8,
            0,
        )
        .unwrap();
        image
    }

    #[test]
    fn test_contour_detector_creation() {
        let detector = ContourDetector::new();
        assert_eq!(detector.saturation_threshold, 60);
        assert_eq!(detector.morph_kernel_size, 5);
        assert_eq!(detector.min_area_fraction, 0.001);
        assert!(!detector.circular_crop);

        let detector = ContourDetector::with_params(80, 3, 0.01).with_circular_crop(true);
        assert_eq!(detector.saturation_threshold, 80);
        assert!(detector.circular_crop);
    }

    #[test]
    fn test_detects_saturated_rectangle() {
        let region = ContourDetector::new().detect(&square_image()).unwrap().expect("region");
        assert_eq!(region.pixels.channels(), 4);
        assert!((region.pixels.cols() - 40).abs() <= 3);
        assert!((region.pixels.rows() - 30).abs() <= 3);
        assert!(region.area_percent > 10.0 && region.area_percent < 14.0);

        let center = *region
            .pixels
            .at_2d::<Vec4b>(region.pixels.rows() / 2, region.pixels.cols() / 2)
            .unwrap();
        assert_eq!(center, Vec4b::from([40, 40, 220, 255]));
    }

    #[test]
    fn test_gray_image_has_no_region() {
        let image = Mat::new_rows_cols_with_default(64, 64, CV_8UC3, Scalar::all(128.0)).unwrap();
        assert!(ContourDetector::new().detect(&image).unwrap().is_none());
    }

    #[test]
    fn test_black_image_has_no_region() {
        let image = Mat::new_rows_cols_with_default(100, 100, CV_8UC3, Scalar::all(0.0)).unwrap();
        assert!(ContourDetector::new().detect(&image).unwrap().is_none());
    }

    #[test]
    fn test_full_frame_region_is_not_clipped() {
        let image =
            Mat::new_rows_cols_with_default(100, 100, CV_8UC3, Scalar::new(40.0, 40.0, 220.0, 0.0))
                .unwrap();
        let region = ContourDetector::new().detect(&image).unwrap().expect("region");
        assert!(
            region.area_percent > 95.0 && region.area_percent <= 100.0,
            "area = {}",
            region.area_percent
        );
        assert!(region.pixels.cols() >= 99);
        assert!(region.pixels.rows() >= 99);
    }

    #[test]
    fn test_min_area_rejects_small_blob() {
        let detector = ContourDetector::with_params(60, 5, 0.5);
        assert!(detector.detect(&square_image()).unwrap().is_none());
    }

    #[test]
    fn test_circular_crop_clears_corners() {
        let detector = ContourDetector::new().with_circular_crop(true);
        let region = detector.detect(&square_image()).unwrap().expect("region");
        let corner = *region.pixels.at_2d::<Vec4b>(0, 0).unwrap();
        assert_eq!(corner, Vec4b::from([0, 0, 0, 0]));
        let center = *region
            .pixels
            .at_2d::<Vec4b>(region.pixels.rows() / 2, region.pixels.cols() / 2)
            .unwrap();
        assert_eq!(center[3], 255);
    }

    #[test]
    fn test_extract_region_contour_validates() {
        assert!(extract_region_contour(&square_image(), 60, 0, 0.001).is_err());
        assert!(extract_region_contour(&square_image(), 60, 5, 0.001)
            .unwrap()
            .is_some());
    }
}
