//! # Assay Reader
//!
//! A Rust crate for reading colorimetric diagnostic assays from photographs.
//!
//! This library turns a photo of a color-changing test substrate into a
//! classified result by:
//! - Decoding the upload and correcting its EXIF orientation
//! - Locating the single prominent test region (circle or contour search)
//! - Suppressing specular glare
//! - Evaluating the substrate's color metric over the region
//! - Classifying the value against the substrate's thresholds
//!
//! ## Example
//!
//! ```rust,no_run
//! use assay_reader::{analyze_image, PipelineConfig, SubstrateCatalog};
//! use std::path::Path;
//!
//! let catalog = SubstrateCatalog::from_json_file(Path::new("substrates.json"))?;
//! let bytes = std::fs::read("photo.jpg").unwrap();
//!
//! let report = analyze_image(&bytes, catalog.get("urine_ph")?, &PipelineConfig::default())?;
//! println!("{} = {:.3} -> {}", report.metric_name, report.value, report.label);
//! # Ok::<(), assay_reader::AnalysisError>(())
//! ```

pub mod classify;
pub mod color;
pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod exif;
pub mod expression;
pub mod image_loader;
pub mod pipeline;
pub mod substrate;

pub use classify::{classify, FallbackLabel, Label, ThresholdSet};
pub use color::{correct_glare, evaluate_metric, hue_angle, GlareReport};
pub use config::{
    CircleSearchConfig, ContourSearchConfig, ExtractionStrategy, GlareConfig, PipelineConfig,
};
pub use detection::{extract_region_circle, extract_region_contour, RegionExtractor, RegionResult};
pub use error::{AnalysisError, Result};
pub use image_loader::{decode, encode_png};
pub use pipeline::{AnalysisOutcome, AnalysisReport, AssayPipeline};
pub use substrate::{SubstrateCatalog, SubstrateConfig, SubstrateSpec, ThresholdSpec};

/// Analyze one encoded image against a substrate
///
/// Convenience wrapper that builds a pipeline for a single call. Services
/// analyzing many images should build one [`AssayPipeline`] and reuse it.
///
/// # Arguments
///
/// * `bytes` - Encoded image (PNG, JPEG, ...)
/// * `substrate` - Compiled substrate definition
/// * `config` - Pipeline tuning
///
/// # Errors
///
/// Returns `AnalysisError` if:
/// - The pipeline configuration is invalid
/// - The image cannot be decoded
/// - No prominent region is detected
/// - The substrate's expressions fail at evaluation
pub fn analyze_image(
    bytes: &[u8],
    substrate: &SubstrateConfig,
    config: &PipelineConfig,
) -> Result<AnalysisReport> {
    AssayPipeline::new(config.clone())?.analyze(bytes, substrate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serialization() {
        let report = AnalysisReport {
            substrate: "urine_ph".to_string(),
            metric_name: "red_green_ratio".to_string(),
            value: 4.0,
            label: Label::Positive,
            region_area_percent: 28.27,
            mean_color: "#4F1414".to_string(),
            strategy: "circle".to_string(),
            glare: None,
            region_image: vec![1, 2, 3],
        };

        let json = serde_json::to_string(&report).unwrap();
        let deserialized: AnalysisReport = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.label, Label::Positive);
        assert_eq!(deserialized.value, 4.0);
        assert!(deserialized.region_image.is_empty());
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let catalog = SubstrateCatalog::from_json_str(
            r#"{ "ph": { "metric": "ratio", "expression": "r / g",
                 "thresholds": { "negative": "value < 1.5", "positive": "value > 2" },
                 "on_no_match": "Moderate" } }"#,
        )
        .unwrap();
        let err = analyze_image(b"garbage", catalog.get("ph").unwrap(), &PipelineConfig::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::DecodeError { .. }));
    }
}
