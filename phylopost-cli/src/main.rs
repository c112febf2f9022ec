//! phylopost CLI - combine replicated MCMC chains and estimate epidemic quantities.

mod config;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use phylopost_core::Summarizable;
use phylopost_epi::{EpidemicEstimator, ReportedCases};
use phylopost_io::{save_json, write_records};
use phylopost_mcmc::{combine_logs, combine_logs_and_trajectories, CombinedSample};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::{PipelineConfig, EXAMPLE};

#[derive(Parser)]
#[command(name = "phylopost")]
#[command(version)]
#[command(about = "Post-processing of phylodynamic MCMC output")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter chains for convergence and join the survivors
    Combine {
        /// Parameter logs, one per chain
        #[arg(short, long, required = true, num_args = 1..)]
        logs: Vec<PathBuf>,

        /// Trajectory tables, paired with the logs by position. When given,
        /// chains are compared with the ESS-adjusted pairwise test instead of
        /// ANOVA ranking.
        #[arg(short, long, num_args = 1..)]
        trajectories: Vec<PathBuf>,

        /// Path to output JSON file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Summarize a combined sample
    Estimate {
        /// Combined sample written by `combine`
        #[arg(short, long)]
        sample: PathBuf,

        /// Directory for the summary files
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Reported case counts, for the reporting rate
        #[arg(short, long)]
        reported: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate,

    /// Show example configuration
    ExampleConfig,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::ExampleConfig => {
            println!("{EXAMPLE}");
            Ok(())
        }

        Commands::Validate => {
            let config = PipelineConfig::load(cli.config.as_deref())?;
            info!("Configuration is valid");
            info!(
                "  Burn-in: {:.0}%, {} trajectories per chain",
                config.combine.burn_in * 100.0,
                config.combine.ntraj
            );
            info!(
                "  Pairwise threshold: {}, ANOVA alpha: {}",
                config.combine.p_threshold, config.combine.anova_alpha
            );
            info!(
                "  gamma0 = {}, gamma1 = {}, interval = {:.0}%",
                config.estimate.gamma0,
                config.estimate.gamma1,
                config.estimate.interval * 100.0
            );
            Ok(())
        }

        Commands::Combine {
            logs,
            trajectories,
            output,
        } => {
            let config = PipelineConfig::load(cli.config.as_deref())?;
            let combined = if trajectories.is_empty() {
                combine_logs(&logs, &config.combine)?
            } else {
                combine_logs_and_trajectories(&logs, &trajectories, &config.combine)?
            };
            combined
                .sample
                .save_json(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            println!("\n=== Combination Complete ===");
            print!("{}", combined.report);
            println!("Output: {}", output.display());
            Ok(())
        }

        Commands::Estimate {
            sample,
            output_dir,
            reported,
        } => {
            let config = PipelineConfig::load(cli.config.as_deref())?;
            let sample = CombinedSample::load_json(&sample)
                .with_context(|| format!("Failed to load {}", sample.display()))?;
            let reported = reported
                .map(|path| ReportedCases::read(&path, &config.estimate.reported))
                .transpose()?;
            estimate(&sample, &config, reported.as_ref(), &output_dir)
        }
    }
}

fn estimate(
    sample: &CombinedSample,
    config: &PipelineConfig,
    reported: Option<&ReportedCases>,
    output_dir: &Path,
) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let estimator = EpidemicEstimator::new(sample, &config.estimate)?;

    let parameters = estimator.parameters()?;
    write_records(output_dir.join("parameters.csv"), &parameters)?;
    let scalars = estimator.scalars()?;
    save_json(output_dir.join("scalars.json"), &scalars)?;

    println!("\n=== Posterior Summary ===");
    for p in &parameters {
        println!("{}", p.summary());
    }
    println!("R:             {}", scalars.reproduction_number.summary());
    println!("Growth rate:   {} /day", scalars.growth_rate.summary());
    println!("Doubling time: {} days", scalars.doubling_time.summary());

    if sample.trajectories().is_empty() {
        if reported.is_some() {
            bail!("reported cases need a sample with trajectories");
        }
        info!("Sample has no trajectories, skipping time series");
        return Ok(());
    }

    println!("\n=== Time Series ===");
    for series in estimator.time_series(reported)? {
        let path = output_dir.join(format!("{}.csv", series.quantity));
        series.write_csv(&path)?;
        println!("{:<22} {:>4} rows  {}", series.quantity, series.len(), path.display());
    }
    Ok(())
}
