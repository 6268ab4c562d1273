//! Specular glare suppression
//!
//! Flash reflections show up as near-white pixels that would drag the
//! channel means towards gray. Pixels of the opaque region whose HSV value
//! reaches the glare threshold are repainted with the mean color of the
//! remaining opaque pixels. Must run before metric evaluation.

use opencv::{
    core::{Mat, Vec4b, Vector},
    imgproc::{cvt_color, COLOR_BGR2HSV, COLOR_BGRA2BGR},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GlareConfig;
use crate::constants::glare::DEFAULT_GLARE_THRESHOLD;
use crate::detection::RegionResult;
use crate::{AnalysisError, Result};

/// Statistics from a glare correction pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlareReport {
    /// Pixels repainted
    pub glare_pixels: usize,
    /// Opaque pixels inspected
    pub opaque_pixels: usize,
    /// Substitute color as [B, G, R]
    pub substitute_bgr: [u8; 3],
}

impl GlareReport {
    /// Fraction of the opaque region that was glare
    pub fn glare_fraction(&self) -> f64 {
        if self.opaque_pixels == 0 {
            0.0
        } else {
            self.glare_pixels as f64 / self.opaque_pixels as f64
        }
    }
}

/// Glare corrector working on BGRA regions
#[derive(Debug, Clone)]
pub struct GlareCorrector {
    threshold: u8,
}

impl Default for GlareCorrector {
    fn default() -> Self {
        Self::new()
    }
}

impl GlareCorrector {
    /// Create a corrector with the default threshold (180)
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_GLARE_THRESHOLD,
        }
    }

    /// Create a corrector with a custom brightness threshold
    pub fn with_threshold(threshold: u8) -> Self {
        Self { threshold }
    }

    pub fn from_config(config: &GlareConfig) -> Self {
        Self::with_threshold(config.threshold)
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Repaint glare pixels of `region`, returning the corrected copy
    ///
    /// # Errors
    ///
    /// Only internal OpenCV failures or a region that is not BGRA.
    pub fn correct(&self, region: &RegionResult) -> Result<(RegionResult, GlareReport)> {
        let pixels = &region.pixels;
        if pixels.channels() != 4 {
            return Err(AnalysisError::ProcessingError(format!(
                "Glare correction expects a BGRA region, got {} channel(s)",
                pixels.channels()
            )));
        }

        let value = self.value_channel(pixels)?;
        let rows = pixels.rows();
        let cols = pixels.cols();

        let mut glare = Vec::new();
        let mut sums = [0u64; 3];
        let mut clean_pixels = 0u64;
        let mut opaque_pixels = 0usize;

        for row in 0..rows {
            for col in 0..cols {
                let px = pixels
                    .at_2d::<Vec4b>(row, col)
                    .map_err(|e| AnalysisError::opencv("pixel access", e))?;
                if px[3] == 0 {
                    continue;
                }
                opaque_pixels += 1;

                let v = *value
                    .at_2d::<u8>(row, col)
                    .map_err(|e| AnalysisError::opencv("value access", e))?;
                if v >= self.threshold {
                    glare.push((row, col));
                } else {
                    sums[0] += px[0] as u64;
                    sums[1] += px[1] as u64;
                    sums[2] += px[2] as u64;
                    clean_pixels += 1;
                }
            }
        }

        let substitute = if clean_pixels == 0 {
            [0u8; 3]
        } else {
            let avg = |sum: u64| (sum as f64 / clean_pixels as f64).round() as u8;
            [avg(sums[0]), avg(sums[1]), avg(sums[2])]
        };

        let mut corrected = pixels
            .try_clone()
            .map_err(|e| AnalysisError::opencv("region clone", e))?;
        for &(row, col) in &glare {
            let px = corrected
                .at_2d_mut::<Vec4b>(row, col)
                .map_err(|e| AnalysisError::opencv("pixel write", e))?;
            px[0] = substitute[0];
            px[1] = substitute[1];
            px[2] = substitute[2];
        }

        let report = GlareReport {
            glare_pixels: glare.len(),
            opaque_pixels,
            substitute_bgr: substitute,
        };

        if opaque_pixels > 0 && clean_pixels == 0 {
            warn!(
                opaque_pixels,
                threshold = self.threshold,
                "entire region is above the glare threshold, repainting black"
            );
        } else {
            debug!(
                glare_pixels = report.glare_pixels,
                opaque_pixels,
                substitute = ?substitute,
                "glare corrected"
            );
        }

        Ok((
            RegionResult {
                pixels: corrected,
                area_percent: region.area_percent,
            },
            report,
        ))
    }

    /// HSV value channel of a BGRA image
    fn value_channel(&self, bgra: &Mat) -> Result<Mat> {
        let mut bgr = Mat::default();
        cvt_color(
            bgra,
            &mut bgr,
            COLOR_BGRA2BGR,
            0,
            opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(|e| AnalysisError::opencv("BGRA to BGR conversion", e))?;

        let mut hsv = Mat::default();
        cvt_color(
            &bgr,
            &mut hsv,
            COLOR_BGR2HSV,
            0,
            opencv::core::AlgorithmHint::ALGO_HINT_DEFAULT,
        )
        .map_err(|e| AnalysisError::opencv("HSV conversion", e))?;

        let mut channels = Vector::<Mat>::new();
        opencv::core::split(&hsv, &mut channels)
            .map_err(|e| AnalysisError::opencv("HSV channel split", e))?;
        channels
            .get(2)
            .map_err(|e| AnalysisError::opencv("value channel access", e))
    }
}

/// Repaint glare pixels of `region` using `glare_threshold`
pub fn correct_glare(region: &RegionResult, glare_threshold: u8) -> Result<RegionResult> {
    GlareCorrector::with_threshold(glare_threshold)
        .correct(region)
        .map(|(corrected, _)| corrected)
}
