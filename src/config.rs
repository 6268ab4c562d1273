//! Configuration structures for the assay analysis pipeline.
//!
//! This module defines all tunable parameters of the pipeline: which region
//! extraction strategy is active and its thresholds, glare correction, and
//! decoding options. Substrate definitions (metric and threshold
//! expressions) live in [`crate::substrate`].
//!
//! # Configuration Loading
//!
//! ```no_run
//! use assay_reader::PipelineConfig;
//! use std::path::Path;
//!
//! // Load from file
//! let config = PipelineConfig::from_json_file(Path::new("pipeline.json"))?;
//!
//! // Or use defaults (circle search, no glare correction)
//! let config = PipelineConfig::default();
//! # Ok::<(), assay_reader::AnalysisError>(())
//! ```
//!
//! # Configuration Sections
//!
//! - [`ExtractionStrategy`]: circle or contour search and its parameters
//! - [`GlareConfig`]: glare correction toggle and threshold

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{circle, contour, glare};
use crate::{AnalysisError, Result};

/// Complete pipeline configuration.
///
/// Serializable to/from JSON so that a deployment can pin its tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Active region extraction strategy
    pub extraction: ExtractionStrategy,

    /// Glare correction settings
    #[serde(default)]
    pub glare: GlareConfig,

    /// Apply EXIF orientation before analysis
    #[serde(default = "default_true")]
    pub exif_correction: bool,

    /// Encode the extracted region as PNG in the report
    #[serde(default = "default_true")]
    pub encode_region: bool,
}

fn default_true() -> bool {
    true
}

/// Region extraction strategy with its parameters.
///
/// Serialized with a `strategy` tag:
///
/// ```json
/// { "strategy": "contour", "saturation_threshold": 60, "morph_kernel_size": 5,
///   "min_area_fraction": 0.001, "circular_crop": false }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Hough circle search for round, centered substrates
    Circle(CircleSearchConfig),
    /// Saturation threshold and largest-contour search
    Contour(ContourSearchConfig),
}

impl Default for ExtractionStrategy {
    fn default() -> Self {
        ExtractionStrategy::Circle(CircleSearchConfig::default())
    }
}

impl ExtractionStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ExtractionStrategy::Circle(_) => "circle",
            ExtractionStrategy::Contour(_) => "contour",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ExtractionStrategy::Circle(config) => config.validate(),
            ExtractionStrategy::Contour(config) => config.validate(),
        }
    }
}

/// Circle search parameters.
///
/// Radius bounds are derived from the image area so that the same fractions
/// work at any resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleSearchConfig {
    /// Minimum circle area as fraction of image (0.0-1.0)
    pub min_area_fraction: f64,

    /// Maximum circle area as fraction of image (0.0-1.0)
    pub max_area_fraction: f64,
}

impl Default for CircleSearchConfig {
    fn default() -> Self {
        Self {
            min_area_fraction: circle::MIN_AREA_FRACTION,
            max_area_fraction: circle::MAX_AREA_FRACTION,
        }
    }
}

impl CircleSearchConfig {
    /// Narrow preset (10%-60%) for close-up photos of a single disc
    pub fn narrow() -> Self {
        Self {
            min_area_fraction: circle::NARROW_MIN_AREA_FRACTION,
            max_area_fraction: circle::NARROW_MAX_AREA_FRACTION,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_fraction("min_area_fraction", self.min_area_fraction)?;
        validate_fraction("max_area_fraction", self.max_area_fraction)?;
        if self.min_area_fraction >= self.max_area_fraction {
            return Err(AnalysisError::invalid_parameter(
                "min_area_fraction",
                format!(
                    "{} (must be below max_area_fraction {})",
                    self.min_area_fraction, self.max_area_fraction
                ),
            ));
        }
        Ok(())
    }
}

/// Saturation/contour search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourSearchConfig {
    /// Saturation threshold (0-255)
    pub saturation_threshold: u8,

    /// Elliptical kernel size for morphological open/close (odd)
    pub morph_kernel_size: i32,

    /// Minimum contour area as fraction of image (0.0-1.0)
    pub min_area_fraction: f64,

    /// Re-mask the crop with its inscribed circle
    #[serde(default)]
    pub circular_crop: bool,
}

impl Default for ContourSearchConfig {
    fn default() -> Self {
        Self {
            saturation_threshold: contour::SATURATION_THRESHOLD,
            morph_kernel_size: contour::MORPH_KERNEL_SIZE,
            min_area_fraction: contour::MIN_AREA_FRACTION,
            circular_crop: false,
        }
    }
}

impl ContourSearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.morph_kernel_size < 1 || self.morph_kernel_size % 2 == 0 {
            return Err(AnalysisError::invalid_parameter(
                "morph_kernel_size",
                self.morph_kernel_size,
            ));
        }
        if !(0.0..1.0).contains(&self.min_area_fraction) {
            return Err(AnalysisError::invalid_parameter(
                "min_area_fraction",
                self.min_area_fraction,
            ));
        }
        Ok(())
    }
}

/// Glare correction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlareConfig {
    /// Enable glare correction
    pub enabled: bool,

    /// HSV value threshold (0-255); pixels at or above are glare
    pub threshold: u8,
}

impl Default for GlareConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: glare::DEFAULT_GLARE_THRESHOLD,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionStrategy::default(),
            glare: GlareConfig::default(),
            exif_correction: true,
            encode_region: true,
        }
    }
}

impl PipelineConfig {
    /// Contour search with circular crop and glare correction enabled
    pub fn contour_with_glare() -> Self {
        Self {
            extraction: ExtractionStrategy::Contour(ContourSearchConfig {
                circular_crop: true,
                ..ContourSearchConfig::default()
            }),
            glare: GlareConfig {
                enabled: true,
                ..GlareConfig::default()
            },
            ..Self::default()
        }
    }

    /// Check every tunable for a usable value
    pub fn validate(&self) -> Result<()> {
        self.extraction.validate()
    }

    /// Parse configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| AnalysisError::ConfigIo {
            path: "<string>".into(),
            message: e.to_string(),
            source: Some(Box::new(e)),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AnalysisError::ConfigIo {
            path: path.display().to_string(),
            message: e.to_string(),
            source: Some(Box::new(e)),
        })?;
        Self::from_json_str(&content).map_err(|err| match err {
            AnalysisError::ConfigIo { message, source, .. } => AnalysisError::ConfigIo {
                path: path.display().to_string(),
                message,
                source,
            },
            other => other,
        })
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| AnalysisError::ConfigIo {
            path: path.display().to_string(),
            message: e.to_string(),
            source: Some(Box::new(e)),
        })?;
        std::fs::write(path, json).map_err(|e| AnalysisError::ConfigIo {
            path: path.display().to_string(),
            message: e.to_string(),
            source: Some(Box::new(e)),
        })
    }
}

fn validate_fraction(parameter: &str, value: f64) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(AnalysisError::invalid_parameter(parameter, value))
    }
}
