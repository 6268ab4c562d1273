//! Integration tests for the complete analysis pipeline
//!
//! These tests validate the end-to-end workflow on synthetic photos drawn
//! with OpenCV and encoded to PNG:
//! - Decoding and region extraction (circle and contour strategies)
//! - Glare correction and metric evaluation
//! - Threshold classification
//! - Error handling for undecodable input and bad configuration

use approx::assert_relative_eq;
use assay_reader::{
    analyze_image, classify, decode, encode_png, extract_region_circle, extract_region_contour,
    AnalysisError, AssayPipeline, ContourSearchConfig, ExtractionStrategy, FallbackLabel,
    GlareConfig, Label, PipelineConfig, SubstrateCatalog, ThresholdSet,
};
use opencv::{
    core::{Mat, Point, Scalar, CV_8UC3},
    imgproc::{circle, LINE_8},
    prelude::*,
};

const SUBSTRATES: &str = r#"{
    "urine_ph": {
        "metric": "red_green_ratio",
        "expression": "r / g",
        "thresholds": { "negative": "value < 1.5", "positive": "value > 2" },
        "on_no_match": "Moderate"
    },
    "hue_strip": {
        "metric": "hue",
        "expression": "hue_angle(r, g, b)",
        "thresholds": {
            "negative": "value >= 90 and value < 150",
            "positive": "value < 30 or value >= 330",
            "moderate": "30 <= value < 90"
        },
        "on_no_match": "Invalid"
    }
}"#;

fn catalog() -> SubstrateCatalog {
    SubstrateCatalog::from_json_str(SUBSTRATES).unwrap()
}

/// 100x100 black image with a filled disc of radius 30 at the center
fn disc_image(bgr: (f64, f64, f64)) -> Mat {
    let mut image = Mat::new_rows_cols_with_default(100, 100, CV_8UC3, Scalar::all(0.0)).unwrap();
    circle(
        &mut image,
        Point::new(50, 50),
        30,
        Scalar::new(bgr.0, bgr.1, bgr.2, 0.0),
        -1,
        LINE_8,
        0,
    )
    .unwrap();
    image
}

fn red_disc_png() -> Vec<u8> {
    encode_png(&disc_image((50.0, 50.0, 200.0))).unwrap()
}

// ============================================================================
// End-to-End Tests
// ============================================================================

#[test]
fn test_red_disc_is_positive() {
    let catalog = catalog();
    let report = analyze_image(
        &red_disc_png(),
        catalog.get("urine_ph").unwrap(),
        &PipelineConfig::default(),
    )
    .unwrap();

    assert_eq!(report.label, Label::Positive);
    assert_relative_eq!(report.value, 4.0, epsilon = 1e-9);
    assert_eq!(report.substrate, "urine_ph");
    assert_eq!(report.metric_name, "red_green_ratio");
    assert!(report.mean_color.starts_with('#'));

    // region image is a PNG with alpha
    let region = image::load_from_memory(&report.region_image).unwrap();
    assert!(region.color().has_alpha());

    // unclamped crop is the 2r bounding square of the detected circle
    assert_eq!(region.width(), region.height());
    let radius = region.width() as f64 / 2.0;
    assert!((radius - 30.0).abs() <= 1.0, "radius = {}", radius);
    let expected_area = 100.0 * std::f64::consts::PI * radius * radius / (100.0 * 100.0);
    assert_relative_eq!(report.region_area_percent, expected_area, epsilon = 1e-9);
    assert!(
        (report.region_area_percent - 28.27).abs() < 2.0,
        "area = {}",
        report.region_area_percent
    );
}

#[test]
fn test_analysis_is_deterministic() {
    let catalog = catalog();
    let substrate = catalog.get("urine_ph").unwrap();
    let pipeline = AssayPipeline::new(PipelineConfig::default()).unwrap();
    let bytes = red_disc_png();

    let first = pipeline.analyze(&bytes, substrate).unwrap();
    let second = pipeline.analyze(&bytes, substrate).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_contour_strategy_on_red_disc() {
    let catalog = catalog();
    let config = PipelineConfig {
        extraction: ExtractionStrategy::Contour(ContourSearchConfig::default()),
        ..PipelineConfig::default()
    };
    let report = analyze_image(&red_disc_png(), catalog.get("urine_ph").unwrap(), &config).unwrap();

    assert_eq!(report.label, Label::Positive);
    assert_eq!(report.strategy, "contour");
    assert!(report.region_area_percent > 24.0 && report.region_area_percent < 31.0);
}

#[test]
fn test_full_frame_region_under_contour() {
    let image =
        Mat::new_rows_cols_with_default(100, 100, CV_8UC3, Scalar::new(40.0, 40.0, 220.0, 0.0))
            .unwrap();
    let config = PipelineConfig {
        extraction: ExtractionStrategy::Contour(ContourSearchConfig::default()),
        ..PipelineConfig::default()
    };
    let catalog = catalog();
    let report = analyze_image(
        &encode_png(&image).unwrap(),
        catalog.get("urine_ph").unwrap(),
        &config,
    )
    .unwrap();

    assert!(
        report.region_area_percent > 95.0 && report.region_area_percent <= 100.0,
        "area = {}",
        report.region_area_percent
    );
    assert_relative_eq!(report.value, 220.0 / 40.0, epsilon = 1e-9);
    assert_eq!(report.label, Label::Positive);
}

#[test]
fn test_hue_metric_on_green_disc() {
    let catalog = catalog();
    let bytes = encode_png(&disc_image((0.0, 255.0, 0.0))).unwrap();
    let report = analyze_image(
        &bytes,
        catalog.get("hue_strip").unwrap(),
        &PipelineConfig::default(),
    )
    .unwrap();

    assert_relative_eq!(report.value, 120.0, epsilon = 1e-6);
    assert_eq!(report.label, Label::Negative);
}

#[test]
fn test_all_black_image_has_no_region_under_contour() {
    let black = Mat::new_rows_cols_with_default(100, 100, CV_8UC3, Scalar::all(0.0)).unwrap();
    assert!(extract_region_contour(&black, 60, 5, 0.001).unwrap().is_none());

    let config = PipelineConfig {
        extraction: ExtractionStrategy::Contour(ContourSearchConfig::default()),
        ..PipelineConfig::default()
    };
    let catalog = catalog();
    let err = analyze_image(
        &encode_png(&black).unwrap(),
        catalog.get("urine_ph").unwrap(),
        &config,
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::NoRegionFound { .. }));
    assert!(err.user_message().contains("No prominent region"));
}

// ============================================================================
// Glare Tests
// ============================================================================

#[test]
fn test_glare_spot_is_removed() {
    // dim red disc with a white highlight
    let mut image = disc_image((30.0, 30.0, 120.0));
    circle(
        &mut image,
        Point::new(45, 45),
        6,
        Scalar::all(255.0),
        -1,
        LINE_8,
        0,
    )
    .unwrap();
    let bytes = encode_png(&image).unwrap();
    let catalog = catalog();
    let substrate = catalog.get("urine_ph").unwrap();

    let plain = AssayPipeline::new(PipelineConfig::default())
        .unwrap()
        .analyze(&bytes, substrate)
        .unwrap();
    let corrected = AssayPipeline::new(PipelineConfig {
        glare: GlareConfig {
            enabled: true,
            threshold: 180,
        },
        ..PipelineConfig::default()
    })
    .unwrap()
    .analyze(&bytes, substrate)
    .unwrap();

    let glare = corrected.glare.expect("glare report");
    assert!(glare.glare_pixels > 0);
    let [b, g, r] = glare.substitute_bgr;
    assert_eq!(b, g);
    assert!(r > 3 * g, "substitute = {:?}", glare.substitute_bgr);
    // highlight pulled the ratio towards 1, correction restores it
    assert!(plain.value < corrected.value);
    assert!((corrected.value - 4.0).abs() < 0.2, "value = {}", corrected.value);
}

// ============================================================================
// Module Operation Tests
// ============================================================================

#[test]
fn test_decode_then_extract_circle() {
    let image = decode(&red_disc_png()).unwrap();
    assert_eq!(image.rows(), 100);
    assert_eq!(image.cols(), 100);

    let region = extract_region_circle(&image, 0.025, 0.75).unwrap().expect("circle");
    assert!(region.area_percent > 0.0 && region.area_percent <= 100.0);
    assert_eq!(region.pixels.channels(), 4);
}

#[test]
fn test_area_invariant_over_disc_sizes() {
    for radius in [12, 20, 30, 40] {
        let mut image =
            Mat::new_rows_cols_with_default(100, 100, CV_8UC3, Scalar::all(0.0)).unwrap();
        circle(
            &mut image,
            Point::new(50, 50),
            radius,
            Scalar::new(40.0, 60.0, 210.0, 0.0),
            -1,
            LINE_8,
            0,
        )
        .unwrap();

        for region in [
            extract_region_circle(&image, 0.025, 0.75).unwrap(),
            extract_region_contour(&image, 60, 5, 0.001).unwrap(),
        ]
        .into_iter()
        .flatten()
        {
            assert!(
                region.area_percent > 0.0 && region.area_percent <= 100.0,
                "radius {} gave area {}",
                radius,
                region.area_percent
            );
        }
    }
}

#[test]
fn test_classify_boundaries() {
    let thresholds =
        ThresholdSet::new("value < 1.5", "value > 2", None, FallbackLabel::Moderate).unwrap();
    assert_eq!(classify(1.5, &thresholds).unwrap(), Label::Moderate);
    assert_eq!(classify(2.0, &thresholds).unwrap(), Label::Moderate);
    assert_eq!(classify(1.49, &thresholds).unwrap(), Label::Negative);
    assert_eq!(classify(2.01, &thresholds).unwrap(), Label::Positive);
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[test]
fn test_garbage_bytes_are_decode_error() {
    let catalog = catalog();
    let err = analyze_image(
        b"\x00\x01not an image",
        catalog.get("urine_ph").unwrap(),
        &PipelineConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::DecodeError { .. }));
    assert!(err.is_client_error());
}

#[test]
fn test_unknown_substrate() {
    assert!(matches!(
        catalog().get("glucose"),
        Err(AnalysisError::UnknownSubstrate { .. })
    ));
}

#[test]
fn test_malformed_substrate_rejected_at_load() {
    let json = r#"{
        "bad": {
            "metric": "ratio",
            "expression": "r / g",
            "thresholds": { "negative": "value <", "positive": "value > 2" },
            "on_no_match": "Invalid"
        }
    }"#;
    let err = SubstrateCatalog::from_json_str(json).unwrap_err();
    assert!(err.is_configuration_error());
    assert!(!err.is_client_error());
}

#[test]
fn test_invalid_pipeline_config_rejected() {
    let config = PipelineConfig {
        extraction: ExtractionStrategy::Contour(ContourSearchConfig {
            morph_kernel_size: 4,
            ..ContourSearchConfig::default()
        }),
        ..PipelineConfig::default()
    };
    assert!(matches!(
        AssayPipeline::new(config),
        Err(AnalysisError::InvalidParameter { .. })
    ));
}
