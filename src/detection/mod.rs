//! Test region extraction module
//!
//! Locates the single prominent test region in a decoded BGR image and
//! returns it as a tightly cropped BGRA image. Pixels outside the detected
//! shape are fully transparent black.
//!
//! Two strategies are available:
//! - [`CircleDetector`]: Hough circle search for round, centered discs
//! - [`ContourDetector`]: saturation threshold and largest contour
//!
//! Not finding a region is a normal outcome (`Ok(None)`), not an error.

pub mod circle;
pub mod contour;
pub mod region;

use opencv::core::Mat;

use crate::config::ExtractionStrategy;
use crate::Result;

pub use circle::{extract_region_circle, CircleDetector};
pub use contour::{extract_region_contour, ContourDetector};

/// Extracted region
#[derive(Debug, Clone)]
pub struct RegionResult {
    /// Cropped BGRA pixels; alpha 0 outside the region
    pub pixels: Mat,
    /// Region area as percent of the full source image, in (0, 100]
    pub area_percent: f64,
}

/// A region extraction strategy
pub trait RegionExtractor: Send + Sync {
    /// Short strategy name for logs and reports
    fn name(&self) -> &'static str;

    /// Find the prominent region in a BGR image
    ///
    /// # Errors
    ///
    /// Only malformed input (empty or non-color image) and internal OpenCV
    /// failures. Absence of a region is `Ok(None)`.
    fn extract(&self, image: &Mat) -> Result<Option<RegionResult>>;
}

/// Instantiate the extractor selected by `strategy`
pub fn build_extractor(strategy: &ExtractionStrategy) -> Result<Box<dyn RegionExtractor>> {
    strategy.validate()?;
    let extractor: Box<dyn RegionExtractor> = match strategy {
        ExtractionStrategy::Circle(config) => Box::new(CircleDetector::from_config(config)),
        ExtractionStrategy::Contour(config) => Box::new(ContourDetector::from_config(config)),
    };
    Ok(extractor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CircleSearchConfig, ContourSearchConfig};

    #[test]
    fn test_build_extractor_by_strategy() {
        let circle = build_extractor(&ExtractionStrategy::default()).unwrap();
        assert_eq!(circle.name(), "circle");

        let contour =
            build_extractor(&ExtractionStrategy::Contour(ContourSearchConfig::default())).unwrap();
        assert_eq!(contour.name(), "contour");
    }

    #[test]
    fn test_build_extractor_validates() {
        let strategy = ExtractionStrategy::Circle(CircleSearchConfig {
            min_area_fraction: 0.8,
            max_area_fraction: 0.2,
        });
        assert!(build_extractor(&strategy).is_err());
    }
}
