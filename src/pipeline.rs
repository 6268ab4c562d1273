//! End-to-end analysis pipeline
//!
//! bytes -> decode -> extract region -> (glare correction) -> metric -> classify
//!
//! The pipeline holds only immutable configuration and the selected
//! extractor, so one instance can serve concurrent requests.

use std::time::Instant;

use opencv::{core::Mat, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classify::Label;
use crate::color::{ChannelMeans, GlareCorrector, GlareReport};
use crate::config::PipelineConfig;
use crate::detection::{build_extractor, RegionExtractor, RegionResult};
use crate::image_loader::{decode_with_orientation, encode_png};
use crate::substrate::SubstrateConfig;
use crate::{AnalysisError, Result};

/// Metric value and label for one image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub metric_value: f64,
    pub label: Label,
}

/// Structured result of analyzing one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Substrate the image was analyzed against
    pub substrate: String,
    /// Name of the computed metric
    pub metric_name: String,
    /// Metric value
    pub value: f64,
    /// Classification label
    pub label: Label,
    /// Region area as percent of the source image
    pub region_area_percent: f64,
    /// Mean color of the (corrected) region as sRGB hex
    pub mean_color: String,
    /// Extraction strategy that found the region
    pub strategy: String,
    /// Glare statistics when correction ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glare: Option<GlareReport>,
    /// Extracted region as PNG (BGRA with transparency)
    #[serde(skip)]
    pub region_image: Vec<u8>,
}

impl AnalysisReport {
    pub fn outcome(&self) -> AnalysisOutcome {
        AnalysisOutcome {
            metric_value: self.value,
            label: self.label,
        }
    }
}

/// Configured analysis pipeline
pub struct AssayPipeline {
    config: PipelineConfig,
    extractor: Box<dyn RegionExtractor>,
    glare: Option<GlareCorrector>,
}

impl std::fmt::Debug for AssayPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssayPipeline")
            .field("config", &self.config)
            .field("extractor", &self.extractor.name())
            .finish()
    }
}

impl AssayPipeline {
    /// Build a pipeline, validating every tunable
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if a strategy parameter is out of range.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let extractor = build_extractor(&config.extraction)?;
        let glare = config
            .glare
            .enabled
            .then(|| GlareCorrector::from_config(&config.glare));
        Ok(Self {
            config,
            extractor,
            glare,
        })
    }

    /// Use a custom extractor instead of the configured strategy
    pub fn with_extractor(mut self, extractor: Box<dyn RegionExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Analyze encoded image bytes against `substrate`
    ///
    /// # Arguments
    ///
    /// * `bytes` - Encoded image as uploaded
    /// * `substrate` - Compiled substrate definition
    ///
    /// # Returns
    ///
    /// `AnalysisReport` with metric value, label, area and region image
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError` if:
    /// - The bytes are not a decodable image (`DecodeError`)
    /// - No prominent region is detected (`NoRegionFound`)
    /// - The substrate's expressions fail at evaluation (`ConfigurationError`)
    pub fn analyze(&self, bytes: &[u8], substrate: &SubstrateConfig) -> Result<AnalysisReport> {
        let start = Instant::now();
        let image = decode_with_orientation(bytes, self.config.exif_correction)?;
        self.analyze_mat(&image, substrate, start)
    }

    /// Analyze an already decoded BGR image
    pub fn analyze_image(
        &self,
        image: &Mat,
        substrate: &SubstrateConfig,
    ) -> Result<AnalysisReport> {
        self.analyze_mat(image, substrate, Instant::now())
    }

    fn analyze_mat(
        &self,
        image: &Mat,
        substrate: &SubstrateConfig,
        start: Instant,
    ) -> Result<AnalysisReport> {
        // Step 1: Region extraction
        let region = self.extractor.extract(image)?.ok_or_else(|| {
            AnalysisError::no_region(format!(
                "{} search found no region in {}x{} image",
                self.extractor.name(),
                image.cols(),
                image.rows()
            ))
        })?;
        debug!(
            strategy = self.extractor.name(),
            area_percent = region.area_percent,
            width = region.pixels.cols(),
            height = region.pixels.rows(),
            "region extracted"
        );

        // Step 2: Glare correction
        let (region, glare) = self.correct_glare(region)?;

        // Step 3: Metric over channel means
        let means = ChannelMeans::from_image(&region.pixels)?;
        let value = substrate.metric().evaluate_means(&means.floored())?;

        // Step 4: Classification
        let label = substrate.thresholds().classify(value)?;

        let region_image = if self.config.encode_region {
            encode_png(&region.pixels)?
        } else {
            Vec::new()
        };

        info!(
            substrate = substrate.name(),
            metric = substrate.metric_name(),
            value,
            %label,
            area_percent = region.area_percent,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "image analyzed"
        );

        Ok(AnalysisReport {
            substrate: substrate.name().to_string(),
            metric_name: substrate.metric_name().to_string(),
            value,
            label,
            region_area_percent: region.area_percent,
            mean_color: means.hex(),
            strategy: self.extractor.name().to_string(),
            glare,
            region_image,
        })
    }

    fn correct_glare(&self, region: RegionResult) -> Result<(RegionResult, Option<GlareReport>)> {
        match &self.glare {
            Some(corrector) => {
                let (corrected, report) = corrector.correct(&region)?;
                Ok((corrected, Some(report)))
            }
            None => Ok((region, None)),
        }
    }
}
