//! Geometric circle search
//!
//! Finds the strongest circle with the Hough gradient method. Radius bounds
//! are derived from the image area, so the same configuration works for any
//! photo resolution:
//!
//! `radius = floor(sqrt(fraction * width * height / PI))`

use std::f64::consts::PI;

use opencv::{
    core::{Mat, Point, Scalar, Size, Vec3f, Vector, BORDER_DEFAULT},
    imgproc::{circle, gaussian_blur, hough_circles, HOUGH_GRADIENT, LINE_8},
    prelude::*,
};
use tracing::debug;

use crate::config::CircleSearchConfig;
use crate::constants::circle::{
    BLUR_KERNEL_SIZE, BLUR_SIGMA, HOUGH_ACCUMULATOR_THRESHOLD, HOUGH_DP, HOUGH_EDGE_THRESHOLD,
    MAX_AREA_FRACTION, MIN_AREA_FRACTION,
};
use crate::{AnalysisError, Result};

use super::region::{
    apply_alpha_mask, area_percent, clamp_rect, crop, empty_mask, require_bgr, to_gray,
};
use super::{RegionExtractor, RegionResult};

/// Circle in integer pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedCircle {
    pub center_x: i32,
    pub center_y: i32,
    pub radius: i32,
}

/// Hough circle detector
#[derive(Debug, Clone)]
pub struct CircleDetector {
    min_area_fraction: f64,
    max_area_fraction: f64,
}

impl Default for CircleDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CircleDetector {
    /// Create a detector with the default area bounds (2.5%-75%)
    pub fn new() -> Self {
        Self {
            min_area_fraction: MIN_AREA_FRACTION,
            max_area_fraction: MAX_AREA_FRACTION,
        }
    }

    /// Create a detector with custom area bounds
    pub fn with_params(min_area_fraction: f64, max_area_fraction: f64) -> Self {
        Self {
            min_area_fraction,
            max_area_fraction,
        }
    }

    pub fn from_config(config: &CircleSearchConfig) -> Self {
        Self::with_params(config.min_area_fraction, config.max_area_fraction)
    }

    /// Radius bounds `(min, max)` for an image of `rows x cols`
    pub fn radius_bounds(&self, rows: i32, cols: i32) -> (i32, i32) {
        let area = rows as f64 * cols as f64;
        let radius = |fraction: f64| (fraction * area / PI).sqrt().floor() as i32;
        (radius(self.min_area_fraction), radius(self.max_area_fraction))
    }

    /// Locate the strongest circle, if any
    pub fn find_circle(&self, bgr: &Mat) -> Result<Option<DetectedCircle>> {
        // Step 1: Radius bounds from image area
        let (min_radius, max_radius) = self.radius_bounds(bgr.rows(), bgr.cols());
        if max_radius < 1 {
            debug!(rows = bgr.rows(), cols = bgr.cols(), "image too small for circle search");
            return Ok(None);
        }

        // Step 2: Grayscale and blur
        let gray = to_gray(bgr)?;
        let mut blurred = Mat::default();
        gaussian_blur(
            &gray,
            &mut blurred,
            Size::new(BLUR_KERNEL_SIZE, BLUR_KERNEL_SIZE),
            BLUR_SIGMA,
            0.0,
            BORDER_DEFAULT,
            opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(|e| AnalysisError::opencv("Gaussian blur", e))?;

        // Step 3: Hough gradient search
        let mut circles = Vector::<Vec3f>::new();
        hough_circles(
            &blurred,
            &mut circles,
            HOUGH_GRADIENT,
            HOUGH_DP,
            max_radius as f64,
            HOUGH_EDGE_THRESHOLD,
            HOUGH_ACCUMULATOR_THRESHOLD,
            min_radius,
            max_radius,
        )
        .map_err(|e| AnalysisError::opencv("Hough circle search", e))?;

        debug!(
            candidates = circles.len(),
            min_radius,
            max_radius,
            "Hough circle search finished"
        );

        // Step 4: Strongest candidate comes first
        let Some(strongest) = circles.iter().next() else {
            return Ok(None);
        };

        let detected = DetectedCircle {
            center_x: strongest[0].round() as i32,
            center_y: strongest[1].round() as i32,
            radius: strongest[2].round() as i32,
        };
        if detected.radius < 1 {
            return Ok(None);
        }
        Ok(Some(detected))
    }

    /// Extract the circular region of a BGR image
    ///
    /// # Arguments
    ///
    /// * `image` - Decoded BGR (or BGRA) image
    ///
    /// # Returns
    ///
    /// The BGRA crop of the bounding square, transparent outside the circle,
    /// or `None` when no circle is found
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError` if the image is empty or not a color image
    pub fn detect(&self, image: &Mat) -> Result<Option<RegionResult>> {
        let bgr = require_bgr(image)?;
        let Some(found) = self.find_circle(&bgr)? else {
            return Ok(None);
        };

        let rows = bgr.rows();
        let cols = bgr.cols();
        let DetectedCircle {
            center_x: x,
            center_y: y,
            radius: r,
        } = found;

        // Step 5: Filled circle as alpha mask, crop to clamped bounding square
        let mut mask = empty_mask(rows, cols)?;
        circle(
            &mut mask,
            Point::new(x, y),
            r,
            Scalar::all(255.0),
            -1,
            LINE_8,
            0,
        )
        .map_err(|e| AnalysisError::opencv("circle mask drawing", e))?;
        let masked = apply_alpha_mask(&bgr, &mask)?;

        let Some(bounds) = clamp_rect(x - r, y - r, x + r, y + r, cols, rows) else {
            debug!(x, y, r, "circle lies outside the image");
            return Ok(None);
        };
        let pixels = crop(&masked, bounds)?;

        // Step 6: Area from the unclamped geometry
        let area_percent = area_percent(PI * (r as f64) * (r as f64), rows, cols);

        debug!(x, y, r, area_percent, "circle region extracted");
        Ok(Some(RegionResult {
            pixels,
            area_percent,
        }))
    }
}

impl RegionExtractor for CircleDetector {
    fn name(&self) -> &'static str {
        "circle"
    }

    fn extract(&self, image: &Mat) -> Result<Option<RegionResult>> {
        self.detect(image)
    }
}

/// Extract the most prominent circle using the given area bounds
pub fn extract_region_circle(
    image: &Mat,
    min_area_fraction: f64,
    max_area_fraction: f64,
) -> Result<Option<RegionResult>> {
    CircleSearchConfig {
        min_area_fraction,
        max_area_fraction,
    }
    .validate()?;
    CircleDetector::with_params(min_area_fraction, max_area_fraction).detect(image)
}
