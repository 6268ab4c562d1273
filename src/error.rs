//! Error types for the assay_reader library

use thiserror::Error;

use crate::expression::ExpressionError;

/// Result type alias for assay_reader operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Error taxonomy for the analysis pipeline.
///
/// Errors fall into three families:
/// - client input problems (`DecodeError`, `NoRegionFound`, `UnknownSubstrate`)
/// - operator/deployment problems (`ConfigurationError`, `InvalidParameter`, `ConfigIo`)
/// - internal failures (`ProcessingError`, `OpenCvError`)
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Input bytes are not a well-formed raster image
    #[error("Failed to decode image: {message}")]
    DecodeError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No prominent test region was detected in the image
    #[error("No prominent region detected: {reason}")]
    NoRegionFound { reason: String },

    /// A substrate's expression is malformed or evaluates to an unusable result
    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        #[source]
        source: Option<ExpressionError>,
    },

    /// Requested substrate is not present in the catalog
    #[error("Unknown substrate: {name}")]
    UnknownSubstrate { name: String },

    /// Invalid tunable parameter
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// Configuration file could not be read or parsed
    #[error("Failed to load configuration from {path}: {message}")]
    ConfigIo {
        path: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// OpenCV operation failed
    #[error("OpenCV error: {operation}")]
    OpenCvError {
        operation: String,
        #[source]
        source: Option<opencv::Error>,
    },

    /// Generic processing error
    #[error("Processing error: {0}")]
    ProcessingError(String),
}

impl AnalysisError {
    /// Create a decode error with context
    pub fn decode<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::DecodeError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a decode error without an underlying cause
    pub fn decode_msg(message: impl Into<String>) -> Self {
        Self::DecodeError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a no-region outcome
    pub fn no_region(reason: impl Into<String>) -> Self {
        Self::NoRegionFound {
            reason: reason.into(),
        }
    }

    /// Create a configuration error caused by an expression failure
    pub fn expression(message: impl Into<String>, source: ExpressionError) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a configuration error without an expression cause
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            source: None,
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create an OpenCV error with context
    pub fn opencv(operation: impl Into<String>, source: opencv::Error) -> Self {
        Self::OpenCvError {
            operation: operation.into(),
            source: Some(source),
        }
    }

    /// Whether the error was caused by the submitted image rather than by deployment data
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::DecodeError { .. }
                | AnalysisError::NoRegionFound { .. }
                | AnalysisError::UnknownSubstrate { .. }
        )
    }

    /// Whether the error indicates bad substrate or pipeline configuration
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::ConfigurationError { .. }
                | AnalysisError::InvalidParameter { .. }
                | AnalysisError::ConfigIo { .. }
        )
    }

    /// Get user-friendly error description for application display
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::DecodeError { .. } => {
                "Could not read the image. Please upload a PNG or JPEG photo.".to_string()
            }
            AnalysisError::NoRegionFound { .. } => {
                "No prominent region detected in the image. \
                 Please center the test area and retake the photo."
                    .to_string()
            }
            AnalysisError::UnknownSubstrate { name } => {
                format!("Unknown substrate '{}'.", name)
            }
            AnalysisError::ConfigurationError { .. }
            | AnalysisError::InvalidParameter { .. }
            | AnalysisError::ConfigIo { .. } => {
                "The analysis service is misconfigured. Please contact the operator.".to_string()
            }
            _ => "Image analysis failed. Please try with a different image.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert!(AnalysisError::no_region("no contour").is_client_error());
        assert!(AnalysisError::decode_msg("empty input").is_client_error());
        assert!(!AnalysisError::configuration("bad").is_client_error());
        assert!(!AnalysisError::ProcessingError("boom".into()).is_client_error());
    }

    #[test]
    fn test_configuration_errors() {
        assert!(AnalysisError::configuration("bad").is_configuration_error());
        assert!(AnalysisError::invalid_parameter("glare_threshold", 300).is_configuration_error());
        assert!(!AnalysisError::no_region("none").is_configuration_error());
    }

    #[test]
    fn test_display_messages() {
        let err = AnalysisError::no_region("contour area below 0.1% of image");
        assert_eq!(
            err.to_string(),
            "No prominent region detected: contour area below 0.1% of image"
        );

        let err = AnalysisError::invalid_parameter("morph_kernel_size", 4);
        assert_eq!(err.to_string(), "Invalid parameter: morph_kernel_size = 4");
    }

    #[test]
    fn test_user_message_hides_configuration_details() {
        let err = AnalysisError::configuration("expression 'r/' is malformed");
        assert!(!err.user_message().contains("r/"));
    }
}
