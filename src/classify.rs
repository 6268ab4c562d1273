//! Threshold classification of a metric value
//!
//! A substrate defines up to three boolean predicates over `value`. They are
//! tried in fixed order (negative, positive, moderate) and the first one that
//! holds decides the label. When none holds, the substrate's explicit
//! fallback applies.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::expression::{compile, Bindings, CompiledExpression, Scope};
use crate::{AnalysisError, Result};

/// Classification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Negative,
    Positive,
    Moderate,
    Invalid,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Label::Negative => "Negative",
            Label::Positive => "Positive",
            Label::Moderate => "Moderate",
            Label::Invalid => "Invalid",
        };
        f.write_str(name)
    }
}

/// Label used when no predicate matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackLabel {
    #[serde(alias = "moderate")]
    Moderate,
    #[serde(alias = "invalid")]
    Invalid,
}

impl From<FallbackLabel> for Label {
    fn from(fallback: FallbackLabel) -> Self {
        match fallback {
            FallbackLabel::Moderate => Label::Moderate,
            FallbackLabel::Invalid => Label::Invalid,
        }
    }
}

/// Compiled threshold predicates of one substrate
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSet {
    negative: CompiledExpression,
    positive: CompiledExpression,
    moderate: Option<CompiledExpression>,
    on_no_match: FallbackLabel,
}

impl ThresholdSet {
    /// Compile the predicates of a substrate
    ///
    /// # Errors
    ///
    /// `ConfigurationError` naming the offending predicate when any of them
    /// is empty, malformed, references anything but `value`, or is not boolean.
    pub fn new(
        negative: &str,
        positive: &str,
        moderate: Option<&str>,
        on_no_match: FallbackLabel,
    ) -> Result<Self> {
        Ok(Self {
            negative: compile_predicate("negative", negative)?,
            positive: compile_predicate("positive", positive)?,
            moderate: moderate
                .map(|source| compile_predicate("moderate", source))
                .transpose()?,
            on_no_match,
        })
    }

    pub fn negative(&self) -> &CompiledExpression {
        &self.negative
    }

    pub fn positive(&self) -> &CompiledExpression {
        &self.positive
    }

    pub fn moderate(&self) -> Option<&CompiledExpression> {
        self.moderate.as_ref()
    }

    pub fn on_no_match(&self) -> FallbackLabel {
        self.on_no_match
    }

    /// Map `value` to a label
    pub fn classify(&self, value: f64) -> Result<Label> {
        if !value.is_finite() {
            return Err(AnalysisError::configuration(format!(
                "cannot classify non-finite metric value {}",
                value
            )));
        }

        let bindings = Bindings::value(value);
        let ordered = [
            (Label::Negative, Some(&self.negative)),
            (Label::Positive, Some(&self.positive)),
            (Label::Moderate, self.moderate.as_ref()),
        ];

        for (label, predicate) in ordered {
            let Some(predicate) = predicate else {
                continue;
            };
            let holds = predicate.evaluate_bool(&bindings).map_err(|e| {
                AnalysisError::expression(
                    format!("{} threshold '{}' failed to evaluate", label, predicate),
                    e,
                )
            })?;
            if holds {
                debug!(value, %label, predicate = %predicate, "threshold matched");
                return Ok(label);
            }
        }

        let label = Label::from(self.on_no_match);
        debug!(value, %label, "no threshold matched, using fallback");
        Ok(label)
    }
}

fn compile_predicate(name: &str, source: &str) -> Result<CompiledExpression> {
    compile(source, Scope::Threshold).map_err(|e| {
        AnalysisError::expression(format!("invalid {} threshold '{}'", name, source), e)
    })
}

/// Classify `value` against `thresholds`
pub fn classify(value: f64, thresholds: &ThresholdSet) -> Result<Label> {
    thresholds.classify(value)
}
