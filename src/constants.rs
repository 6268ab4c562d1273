//! Default tuning values for region extraction, glare correction and metrics
//!
//! These are defaults only; every value can be overridden through
//! [`PipelineConfig`](crate::config::PipelineConfig).

/// Geometric circle search defaults
pub mod circle {
    /// Smallest accepted circle as a fraction of image area (2.5%)
    pub const MIN_AREA_FRACTION: f64 = 0.025;

    /// Largest accepted circle as a fraction of image area (75%)
    pub const MAX_AREA_FRACTION: f64 = 0.75;

    /// Area bounds of the narrow-range deployment (10%-60%)
    pub const NARROW_MIN_AREA_FRACTION: f64 = 0.10;
    pub const NARROW_MAX_AREA_FRACTION: f64 = 0.60;

    /// Gaussian blur kernel applied before the Hough search
    pub const BLUR_KERNEL_SIZE: i32 = 9;

    /// Gaussian blur sigma
    pub const BLUR_SIGMA: f64 = 2.0;

    /// Inverse accumulator resolution ratio
    pub const HOUGH_DP: f64 = 1.0;

    /// Upper Canny threshold used by the gradient Hough method
    pub const HOUGH_EDGE_THRESHOLD: f64 = 50.0;

    /// Accumulator votes required for a circle center
    pub const HOUGH_ACCUMULATOR_THRESHOLD: f64 = 30.0;
}

/// Saturation/contour search defaults
pub mod contour {
    /// Saturation (0-255) above which a pixel is a region candidate
    pub const SATURATION_THRESHOLD: u8 = 60;

    /// Elliptical structuring element size for open/close passes
    pub const MORPH_KERNEL_SIZE: i32 = 5;

    /// Iterations of each morphological pass
    pub const MORPH_ITERATIONS: i32 = 2;

    /// Smallest accepted contour as a fraction of image area (0.1%)
    pub const MIN_AREA_FRACTION: f64 = 0.001;

    /// Gaussian blur kernel applied to the saturation channel
    pub const BLUR_KERNEL_SIZE: i32 = 5;
}

/// Glare correction defaults
pub mod glare {
    /// HSV value (0-255) at or above which a pixel is glare
    pub const DEFAULT_GLARE_THRESHOLD: u8 = 180;
}

/// Metric evaluation constants
pub mod metric {
    /// Replacement for a channel mean that is exactly zero
    pub const CHANNEL_MEAN_FLOOR: f64 = 1.0;
}

/// Upper bound on region area percentage
pub const MAX_AREA_PERCENT: f64 = 100.0;
