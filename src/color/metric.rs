//! Channel averaging and metric evaluation
//!
//! The metric is computed from the mean of each color channel over every
//! pixel of the extracted region, transparent padding included. A channel
//! whose mean is exactly zero is treated as 1 so that ratio expressions such
//! as `r / g` stay finite.

use opencv::{core::Mat, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::metric::CHANNEL_MEAN_FLOOR;
use crate::detection::RegionResult;
use crate::expression::{compile, Bindings, CompiledExpression, Scope};
use crate::{AnalysisError, Result};

use super::conversion::{channels_to_srgb, srgb_to_hex};

/// Per-channel means on the 0–255 scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelMeans {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl ChannelMeans {
    /// Raw means over all pixels of a BGR or BGRA image (no floor applied)
    pub fn from_image(image: &Mat) -> Result<Self> {
        if image.empty() {
            return Err(AnalysisError::ProcessingError(
                "Cannot average an empty region".into(),
            ));
        }
        if image.channels() < 3 {
            return Err(AnalysisError::ProcessingError(format!(
                "Expected a color region, got {} channel(s)",
                image.channels()
            )));
        }

        let mean = opencv::core::mean(image, &Mat::default())
            .map_err(|e| AnalysisError::opencv("channel mean", e))?;

        Ok(Self {
            b: mean[0],
            g: mean[1],
            r: mean[2],
        })
    }

    /// Replace zero means with the floor value
    pub fn floored(self) -> Self {
        let floor = |v: f64| if v == 0.0 { CHANNEL_MEAN_FLOOR } else { v };
        Self {
            r: floor(self.r),
            g: floor(self.g),
            b: floor(self.b),
        }
    }

    pub fn bindings(&self) -> Bindings {
        Bindings::channels(self.r, self.g, self.b)
    }

    /// Mean color as hexadecimal sRGB
    pub fn hex(&self) -> String {
        srgb_to_hex(channels_to_srgb(self.r, self.g, self.b))
    }
}

/// Evaluates a substrate metric expression over a region
#[derive(Debug, Clone)]
pub struct MetricEvaluator {
    expression: CompiledExpression,
}

impl MetricEvaluator {
    /// Compile a metric expression
    pub fn new(expression: &str) -> Result<Self> {
        let compiled = compile(expression, Scope::Metric).map_err(|e| {
            AnalysisError::expression(format!("invalid metric expression '{}'", expression), e)
        })?;
        Ok(Self {
            expression: compiled,
        })
    }

    /// Wrap an already compiled metric expression
    pub fn from_compiled(expression: CompiledExpression) -> Result<Self> {
        if expression.scope() != Scope::Metric {
            return Err(AnalysisError::configuration(format!(
                "'{}' is not a metric expression",
                expression
            )));
        }
        Ok(Self { expression })
    }

    pub fn expression(&self) -> &CompiledExpression {
        &self.expression
    }

    /// Compute the metric for a region
    pub fn evaluate(&self, region: &RegionResult) -> Result<f64> {
        let means = ChannelMeans::from_image(&region.pixels)?.floored();
        self.evaluate_means(&means)
    }

    /// Compute the metric from precomputed (floored) channel means
    pub fn evaluate_means(&self, means: &ChannelMeans) -> Result<f64> {
        let value = self
            .expression
            .evaluate_number(&means.bindings())
            .map_err(|e| {
                AnalysisError::expression(
                    format!("metric expression '{}' failed to evaluate", self.expression),
                    e,
                )
            })?;

        debug!(
            r = means.r,
            g = means.g,
            b = means.b,
            expression = %self.expression,
            value,
            "metric evaluated"
        );
        Ok(value)
    }
}

/// Compile `expression` and evaluate it over `region`
pub fn evaluate_metric(region: &RegionResult, expression: &str) -> Result<f64> {
    MetricEvaluator::new(expression)?.evaluate(region)
}
