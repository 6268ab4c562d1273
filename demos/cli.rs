//! Command-line interface for assay_reader
//!
//! Analyzes one photo against a substrate and prints the report as JSON.
//! Set `RUST_LOG=assay_reader=debug` to trace every pipeline stage.

use assay_reader::{AssayPipeline, PipelineConfig, SubstrateCatalog};
use std::{
    env,
    path::{Path, PathBuf},
    process,
};

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

struct Args {
    substrates: PathBuf,
    substrate: String,
    image: PathBuf,
    pipeline: Option<PathBuf>,
    region_out: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut positional = Vec::new();
    let mut pipeline = None;
    let mut region_out = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--pipeline" => {
                i += 1;
                pipeline = Some(PathBuf::from(args.get(i).ok_or("--pipeline needs a path")?));
            }
            "--region" => {
                i += 1;
                region_out = Some(PathBuf::from(args.get(i).ok_or("--region needs a path")?));
            }
            "--help" | "-h" => {
                print_help(&args[0]);
                process::exit(0);
            }
            arg if arg.starts_with("--") => return Err(format!("Unknown option: {}", arg)),
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    if positional.len() != 3 {
        return Err("Expected <substrates.json> <substrate> <image>".to_string());
    }

    let image = PathBuf::from(positional.pop().unwrap_or_default());
    let substrate = positional.pop().unwrap_or_default();
    let substrates = PathBuf::from(positional.pop().unwrap_or_default());
    Ok(Args {
        substrates,
        substrate,
        image,
        pipeline,
        region_out,
    })
}

fn print_help(program: &str) {
    eprintln!("Usage: {} <substrates.json> <substrate> <image> [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --pipeline <config.json>  Pipeline configuration (default: circle search)");
    eprintln!("  --region <out.png>        Write the extracted region image");
    eprintln!("  -h, --help                Show this help");
}

fn run(args: Args) -> Result<(), String> {
    let catalog = SubstrateCatalog::from_json_file(&args.substrates).map_err(|e| e.to_string())?;
    let substrate = catalog.get(&args.substrate).map_err(|e| {
        format!(
            "{} (available: {})",
            e,
            catalog.names().collect::<Vec<_>>().join(", ")
        )
    })?;

    let config = match &args.pipeline {
        Some(path) => PipelineConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => PipelineConfig::default(),
    };
    let pipeline = AssayPipeline::new(config).map_err(|e| e.to_string())?;

    let bytes = std::fs::read(&args.image)
        .map_err(|e| format!("Cannot read {}: {}", args.image.display(), e))?;
    let report = pipeline
        .analyze(&bytes, substrate)
        .map_err(|e| format!("{}\n{}", e.user_message(), e))?;

    if let Some(path) = &args.region_out {
        write_region(path, &report.region_image)?;
    }

    let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

fn write_region(path: &Path, png: &[u8]) -> Result<(), String> {
    if png.is_empty() {
        return Err("Region encoding is disabled in the pipeline config".to_string());
    }
    std::fs::write(path, png).map_err(|e| format!("Cannot write {}: {}", path.display(), e))?;
    eprintln!("Region image saved to {}", path.display());
    Ok(())
}

fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let parsed = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            process::exit(1);
        }
    };

    if let Err(e) = run(parsed) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
