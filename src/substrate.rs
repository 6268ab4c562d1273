//! Substrate definitions
//!
//! A substrate file maps each substrate name to its metric expression and
//! threshold predicates:
//!
//! ```json
//! {
//!   "urine_ph": {
//!     "metric": "red_green_ratio",
//!     "expression": "r / g",
//!     "thresholds": { "negative": "value < 1.5", "positive": "value > 2" },
//!     "on_no_match": "Moderate"
//!   }
//! }
//! ```
//!
//! Every expression is compiled when the catalog is loaded, so a malformed
//! substrate is rejected before any image is analyzed.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::{FallbackLabel, ThresholdSet};
use crate::color::MetricEvaluator;
use crate::{AnalysisError, Result};

/// Threshold predicates as written in the substrate file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSpec {
    pub negative: String,
    pub positive: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderate: Option<String>,
}

/// One substrate entry as written in the substrate file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubstrateSpec {
    /// Name of the reported metric
    pub metric: String,
    /// Metric expression over `r`, `g`, `b`
    pub expression: String,
    pub thresholds: ThresholdSpec,
    /// Label when no threshold matches; required
    pub on_no_match: FallbackLabel,
}

/// A compiled, immutable substrate
#[derive(Debug, Clone)]
pub struct SubstrateConfig {
    name: String,
    metric_name: String,
    metric: MetricEvaluator,
    thresholds: ThresholdSet,
}

impl SubstrateConfig {
    /// Compile a substrate definition
    ///
    /// # Errors
    ///
    /// `ConfigurationError` if the metric name is blank or any expression
    /// fails to compile.
    pub fn compile(name: impl Into<String>, spec: &SubstrateSpec) -> Result<Self> {
        let name = name.into();
        if spec.metric.trim().is_empty() {
            return Err(AnalysisError::configuration(format!(
                "substrate '{}' has an empty metric name",
                name
            )));
        }

        let metric = MetricEvaluator::new(&spec.expression).map_err(|e| in_substrate(&name, e))?;
        let thresholds = ThresholdSet::new(
            &spec.thresholds.negative,
            &spec.thresholds.positive,
            spec.thresholds.moderate.as_deref(),
            spec.on_no_match,
        )
        .map_err(|e| in_substrate(&name, e))?;

        Ok(Self {
            name,
            metric_name: spec.metric.trim().to_string(),
            metric,
            thresholds,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }

    pub fn metric(&self) -> &MetricEvaluator {
        &self.metric
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }
}

fn in_substrate(name: &str, err: AnalysisError) -> AnalysisError {
    match err {
        AnalysisError::ConfigurationError { message, source } => {
            AnalysisError::ConfigurationError {
                message: format!("substrate '{}': {}", name, message),
                source,
            }
        }
        other => other,
    }
}

/// All configured substrates, keyed by name
#[derive(Debug, Clone, Default)]
pub struct SubstrateCatalog {
    substrates: BTreeMap<String, SubstrateConfig>,
}

impl SubstrateCatalog {
    /// Compile every entry of a parsed substrate map
    pub fn from_specs(specs: &BTreeMap<String, SubstrateSpec>) -> Result<Self> {
        let mut substrates = BTreeMap::new();
        for (name, spec) in specs {
            substrates.insert(name.clone(), SubstrateConfig::compile(name.clone(), spec)?);
        }
        debug!(count = substrates.len(), "substrate catalog loaded");
        Ok(Self { substrates })
    }

    /// Parse and compile a substrate map from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let specs: BTreeMap<String, SubstrateSpec> =
            serde_json::from_str(json).map_err(|e| AnalysisError::ConfigIo {
                path: "<string>".into(),
                message: e.to_string(),
                source: Some(Box::new(e)),
            })?;
        Self::from_specs(&specs)
    }

    /// Load a substrate file
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

    /// Look up a substrate by name
    pub fn get(&self, name: &str) -> Result<&SubstrateConfig> {
        self.substrates
            .get(name)
            .ok_or_else(|| AnalysisError::UnknownSubstrate {
                name: name.to_string(),
            })
    }

    /// Configured substrate names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.substrates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.substrates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substrates.is_empty()
    }
}
