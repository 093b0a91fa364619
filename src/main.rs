use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use ssdetect::app::{App, AppOptions};

/// Run a single-shot detector over image files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Detector config (toml, yaml or json)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Directory assets such as `file:///android_asset/...` resolve against
    #[arg(short, long, value_name = "DIR")]
    assets: Option<PathBuf>,

    /// JSON file of canned output tensors, used instead of running a model
    #[arg(long, value_name = "FILE")]
    stub_outputs: Option<PathBuf>,

    /// Log inference statistics after each image
    #[arg(long)]
    stats: bool,

    /// Print one JSON object per image
    #[arg(long)]
    json: bool,

    #[arg(required = true, value_name = "IMAGE")]
    images: Vec<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let options = AppOptions {
        config_path: args.config.clone(),
        assets: args.assets.clone(),
        stub_outputs: args.stub_outputs.clone(),
        stats: args.stats,
    };
    let mut app = App::start(&options)
        .with_context(|| format!("failed to start detector from {}", args.config.display()))?;

    for path in &args.images {
        let detections = app
            .process(path)
            .with_context(|| format!("detection failed for {}", path.display()))?;

        if args.json {
            println!("{}", json!({ "image": path, "detections": detections }));
        } else {
            println!("{}: {} detections", path.display(), detections.len());
            for det in &detections {
                println!("  {det}");
            }
        }

        if args.stats {
            let stats = app.stat_string();
            if !stats.is_empty() {
                tracing::info!("{stats}");
            }
        }
    }

    app.stop();
    Ok(())
}
