use anyhow::Result;
use clap::Parser;
use selector::{run_experiment, ExperimentOptions};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};
use ufsaco_core::config::SearchConfig;

#[derive(Parser)]
#[command(name = "selector")]
#[command(about = "Select features with UFSACO and compare them against Information Gain and Gain Ratio")]
struct Args {
    /// JSON search configuration (numberAnts, numberFeatures, topFeatures, ...)
    #[arg(long)]
    config: PathBuf,
    /// Folder holding the named indexes
    #[arg(long, default_value = "./index")]
    index_dir: PathBuf,
    #[arg(long, default_value = "training")]
    training: String,
    #[arg(long, default_value = "test")]
    test: String,
    /// Where ARFF files are written
    #[arg(long, default_value = "./arff")]
    arff_dir: PathBuf,
    /// Also write the summary JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    // a configuration without the mandatory keys stops here
    let config = SearchConfig::load(&args.config)?;

    let summary = run_experiment(&ExperimentOptions {
        index_dir: args.index_dir,
        training: args.training,
        test: args.test,
        config,
        arff_dir: args.arff_dir,
    })?;

    let json = serde_json::to_string_pretty(&summary)?;
    if let Some(path) = &args.report {
        std::fs::write(path, &json)?;
        tracing::info!(path = %path.display(), "wrote report");
    }
    println!("{json}");
    Ok(())
}
