mod cli;
mod compare;
mod eval_set;
mod metrics;
mod outputs;
mod report;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use research::io::config::{DEFAULT_CONFIG_PATH, load_config};

#[derive(Parser, Debug)]
#[command(
    name = "eval",
    version,
    about = "Score exported lifecycle results against the evaluation set"
)]
struct Cli {
    /// File name in the outputs directory, or a path to the batch results JSON.
    output_file: PathBuf,
    #[arg(long, default_value = "evaluation_set/evaluation_set.csv")]
    eval_set: PathBuf,
    /// Defaults to `batch.output_dir` from the research config.
    #[arg(long)]
    outputs_dir: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn main() -> Result<()> {
    research::logging::init();
    let cli = Cli::parse();
    let outputs_dir = match cli.outputs_dir {
        Some(dir) => dir,
        None => load_config(&cli.config)?.batch.output_dir,
    };
    cli::evaluate(&cli.output_file, &cli.eval_set, &outputs_dir)?;
    Ok(())
}
