//! Generate default pipeline and sample substrate configuration files
//!
//! Writes `pipeline.json` (default tuning) and `substrates.json` (sample
//! substrate definitions) into the given directory.

use assay_reader::{FallbackLabel, PipelineConfig, SubstrateCatalog, SubstrateSpec, ThresholdSpec};
use std::{collections::BTreeMap, env, path::Path, process};

fn sample_substrates() -> BTreeMap<String, SubstrateSpec> {
    let mut substrates = BTreeMap::new();
    substrates.insert(
        "urine_ph".to_string(),
        SubstrateSpec {
            metric: "red_green_ratio".to_string(),
            expression: "r / g".to_string(),
            thresholds: ThresholdSpec {
                negative: "value < 1.5".to_string(),
                positive: "value > 2".to_string(),
                moderate: None,
            },
            on_no_match: FallbackLabel::Moderate,
        },
    );
    substrates.insert(
        "nitrite".to_string(),
        SubstrateSpec {
            metric: "hue".to_string(),
            expression: "hue_angle(r, g, b)".to_string(),
            thresholds: ThresholdSpec {
                negative: "value < 20 or value >= 340".to_string(),
                positive: "280 <= value < 340".to_string(),
                moderate: Some("20 <= value < 280".to_string()),
            },
            on_no_match: FallbackLabel::Invalid,
        },
    );
    substrates
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <output_dir> [--contour]", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} config/", args[0]);
        process::exit(1);
    }

    let output_dir = Path::new(&args[1]);
    if let Err(e) = std::fs::create_dir_all(output_dir) {
        eprintln!("Error creating directory: {}", e);
        process::exit(1);
    }

    let config = if args.iter().any(|a| a == "--contour") {
        PipelineConfig::contour_with_glare()
    } else {
        PipelineConfig::default()
    };

    let pipeline_path = output_dir.join("pipeline.json");
    if let Err(e) = config.to_json_file(&pipeline_path) {
        eprintln!("Error saving pipeline config: {}", e);
        process::exit(1);
    }

    let substrates = sample_substrates();
    let substrates_path = output_dir.join("substrates.json");
    let written = serde_json::to_string_pretty(&substrates)
        .map_err(|e| e.to_string())
        .and_then(|json| std::fs::write(&substrates_path, json).map_err(|e| e.to_string()));
    if let Err(e) = written {
        eprintln!("Error saving substrates: {}", e);
        process::exit(1);
    }

    // Round-trip through the loader so a broken sample never ships
    match SubstrateCatalog::from_json_file(&substrates_path) {
        Ok(catalog) => {
            eprintln!("Configuration saved to {}", output_dir.display());
            eprintln!();
            eprintln!("Config summary:");
            eprintln!("  Strategy: {}", config.extraction.name());
            eprintln!(
                "  Glare correction: {} (threshold {})",
                if config.glare.enabled { "on" } else { "off" },
                config.glare.threshold
            );
            eprintln!("  Substrates: {}", catalog.names().collect::<Vec<_>>().join(", "));
        }
        Err(e) => {
            eprintln!("Generated substrates failed to load: {}", e);
            process::exit(1);
        }
    }
}
