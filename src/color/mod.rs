//! Color processing of the extracted region
//!
//! This module handles glare suppression, channel averaging and metric
//! evaluation, plus the color space helpers they share.

pub mod conversion;
pub mod glare;
pub mod metric;

pub use conversion::hue_angle;
pub use glare::{correct_glare, GlareCorrector, GlareReport};
pub use metric::{evaluate_metric, ChannelMeans, MetricEvaluator};
