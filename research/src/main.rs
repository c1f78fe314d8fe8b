//! Component lifecycle research CLI.
//!
//! `run` researches a list of components concurrently and exports the batch
//! report as JSON; `trace` researches them one at a time and prints every
//! step to the console.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::debug;

use research::batch::run_batch;
use research::core::run_state::RunState;
use research::exit_codes;
use research::io::chat::ChatClient;
use research::io::components::load_components;
use research::io::config::{DEFAULT_CONFIG_PATH, ResearchConfig, load_config};
use research::io::export::{export_json, results_file_name};
use research::io::oracle::ChatOracle;
use research::io::prompt::PromptSet;
use research::io::search::PerplexitySearch;
use research::logging;
use research::session::Researcher;
use research::trace::{render_event, render_header};

#[derive(Parser)]
#[command(
    name = "research",
    version,
    about = "Iterative lifecycle-date research for software components"
)]
struct Cli {
    /// Path to the TOML config (missing file means defaults).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Research every component concurrently and export the results.
    Run {
        /// `.json` list or one component per line.
        components_file: PathBuf,
        /// Override `batch.max_concurrent`.
        #[arg(long)]
        max_concurrent: Option<usize>,
        /// Override `batch.output_dir`.
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Results file name; defaults to a timestamped name.
        #[arg(long)]
        output_name: Option<String>,
    },
    /// Research components one at a time, printing each step.
    Trace {
        components_file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    logging::init();

    let code = match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let mut config = load_config(&cli.config)?;
    match cli.command {
        Command::Run {
            components_file,
            max_concurrent,
            output_dir,
            output_name,
        } => {
            if let Some(max_concurrent) = max_concurrent {
                config.batch.max_concurrent = max_concurrent;
            }
            if let Some(output_dir) = output_dir {
                config.batch.output_dir = output_dir;
            }
            config.validate().context("validate overrides")?;
            cmd_run(&config, &components_file, output_name).await
        }
        Command::Trace { components_file } => cmd_trace(&config, &components_file).await,
    }
}

async fn cmd_run(
    config: &ResearchConfig,
    components_file: &Path,
    output_name: Option<String>,
) -> Result<i32> {
    let components = load_components(components_file)?;
    let researcher = Arc::new(build_researcher(config)?);
    println!(
        "research: {} components, max_concurrent={}",
        components.len(),
        config.batch.max_concurrent
    );

    let report = run_batch(researcher, components, config.batch.max_concurrent).await?;
    let file_name = output_name.unwrap_or_else(|| results_file_name(Local::now()));
    let path = export_json(&report, &config.batch.output_dir, &file_name)?;

    let meta = &report.batch_metadata;
    println!(
        "research: completed={}/{} failed={} processing_time={:.1}s",
        meta.successful, meta.total_components, meta.failed, meta.processing_time
    );
    println!("research: results={}", path.display());
    Ok(if meta.failed > 0 {
        exit_codes::PARTIAL
    } else {
        exit_codes::OK
    })
}

async fn cmd_trace(config: &ResearchConfig, components_file: &Path) -> Result<i32> {
    let components = load_components(components_file)?;
    let researcher = build_researcher(config)?;
    let total = components.len();
    let mut failed = 0usize;

    for (index, component) in components.iter().enumerate() {
        print!("{}", render_header(component, index, total));
        let session = researcher
            .run_session(RunState::new(component.as_str()), |event| {
                print!("{}", render_event(&event));
            })
            .await;
        if let Err(err) = session {
            failed += 1;
            eprintln!("trace: {component}: {err}");
        }
    }
    Ok(if failed > 0 {
        exit_codes::PARTIAL
    } else {
        exit_codes::OK
    })
}

fn build_researcher(config: &ResearchConfig) -> Result<Researcher> {
    let prompts = PromptSet::new()?;
    let search_chat =
        ChatClient::new(config.search.chat_settings().context("configure search")?)?;
    let oracle_chat =
        ChatClient::new(config.oracle.chat_settings().context("configure oracle")?)?;
    let search = PerplexitySearch::with_prompts(
        search_chat,
        &prompts,
        &config.search.fast_model,
        &config.search.deep_model,
    )?;
    let oracle = ChatOracle::new(
        oracle_chat,
        config.oracle.model.clone(),
        config.oracle.temperature,
    )?;
    debug!(
        fast = %config.search.fast_model,
        deep = %config.search.deep_model,
        oracle = %config.oracle.model,
        "collaborators configured"
    );
    Ok(Researcher::new(
        Arc::new(search),
        Arc::new(oracle),
        prompts,
        config.policy.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "research",
            "run",
            "components.txt",
            "--max-concurrent",
            "5",
            "--output-dir",
            "out",
        ])
        .expect("parse");
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        let Command::Run {
            components_file,
            max_concurrent,
            output_dir,
            output_name,
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(components_file, PathBuf::from("components.txt"));
        assert_eq!(max_concurrent, Some(5));
        assert_eq!(output_dir, Some(PathBuf::from("out")));
        assert_eq!(output_name, None);
    }

    #[test]
    fn parses_trace_with_config() {
        let cli = Cli::try_parse_from(["research", "trace", "c.json", "--config", "alt.toml"])
            .expect("parse");
        assert_eq!(cli.config, PathBuf::from("alt.toml"));
        assert!(matches!(cli.command, Command::Trace { .. }));
    }

    #[test]
    fn run_requires_components_file() {
        assert!(Cli::try_parse_from(["research", "run"]).is_err());
    }
}
