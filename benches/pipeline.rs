use assay_reader::{
    encode_png, AssayPipeline, ContourSearchConfig, ExtractionStrategy, PipelineConfig,
    SubstrateCatalog,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
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
    }
}"#;

fn synthetic_photo(size: i32) -> Vec<u8> {
    let mut image = Mat::new_rows_cols_with_default(size, size, CV_8UC3, Scalar::all(20.0))
        .expect("allocate image");
    circle(
        &mut image,
        Point::new(size / 2, size / 2),
        size * 3 / 10,
        Scalar::new(50.0, 50.0, 200.0, 0.0),
        -1,
        LINE_8,
        0,
    )
    .expect("draw disc");
    encode_png(&image).expect("encode png")
}

fn benchmark_pipeline(c: &mut Criterion) {
    let catalog = SubstrateCatalog::from_json_str(SUBSTRATES).expect("catalog");
    let substrate = catalog.get("urine_ph").expect("substrate");
    let photo = synthetic_photo(640);

    let circle_pipeline = AssayPipeline::new(PipelineConfig::default()).expect("pipeline");
    c.bench_function("analyze_circle_640", |b| {
        b.iter(|| circle_pipeline.analyze(black_box(&photo), substrate))
    });

    let contour_pipeline = AssayPipeline::new(PipelineConfig {
        extraction: ExtractionStrategy::Contour(ContourSearchConfig::default()),
        ..PipelineConfig::default()
    })
    .expect("pipeline");
    c.bench_function("analyze_contour_640", |b| {
        b.iter(|| contour_pipeline.analyze(black_box(&photo), substrate))
    });

    let thresholds = substrate.thresholds();
    c.bench_function("classify", |b| b.iter(|| thresholds.classify(black_box(1.75))));
}

criterion_group!(benches, benchmark_pipeline);
criterion_main!(benches);
