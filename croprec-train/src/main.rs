//! croprec-train - offline crop classifier training
//!
//! Trains the random forest on the embedded dataset (or a JSON dataset file)
//! and writes the model artifact the prediction service loads.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use croprec_common::artifact::DEFAULT_ARTIFACT_PATH;
use croprec_common::forest::ForestConfig;
use croprec_train::{run, success_message, EncodingChoice, TrainOptions};

/// Command-line arguments for croprec-train
#[derive(Parser, Debug)]
#[command(name = "croprec-train")]
#[command(about = "Train the crop recommendation model")]
#[command(version)]
struct Args {
    /// Where to write the model artifact (overwritten if present)
    #[arg(short, long, default_value = DEFAULT_ARTIFACT_PATH, env = "CROPREC_MODEL_PATH")]
    output: PathBuf,

    /// JSON file with an array of {soil_type, rainfall, past_yield, crop}
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Soil encoding for the training matrix
    #[arg(short, long, value_enum, default_value_t = EncodingChoice::Standard)]
    encoding: EncodingChoice,

    /// Number of trees in the forest
    #[arg(long, default_value_t = 100)]
    trees: usize,

    /// RNG seed for reproducible forests
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "croprec_train=info,croprec_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("Starting croprec-train v{}", env!("CARGO_PKG_VERSION"));

    let options = TrainOptions {
        output: args.output,
        dataset: args.dataset,
        encoding: args.encoding,
        forest: ForestConfig {
            n_trees: args.trees,
            seed: args.seed,
            ..ForestConfig::default()
        },
    };

    let report = run(&options)?;
    info!(
        "Trained on {} samples, {} labels, encoding {}",
        report.n_samples, report.n_labels, report.encoding
    );
    println!("{}", success_message(&report));

    Ok(())
}
