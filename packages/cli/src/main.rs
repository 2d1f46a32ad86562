#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for report-watch.
//!
//! Runs an ensemble of CUSUM detectors over monthly report counts and
//! ranks neighbourhoods (or neighbourhood/sector pairs) by how many
//! detector configurations see a newly raised alarm. Without a
//! subcommand an interactive menu is shown.
//!
//! Uses `indicatif-log-bridge` (via [`report_watch_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod config;
mod interactive;
mod pipeline;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use report_watch_cli_utils::IndicatifProgress;
use report_watch_detect::GridCells;
use report_watch_detect_models::CusumParams;
use report_watch_series_models::{EntityKey, Grouping};

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "report_watch",
    about = "Ensemble CUSUM detection of emerging report-count anomalies"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep the hyperparameter grid and rank entities by vote count
    Detect {
        /// Input CSV with one row per report (or per aggregated count)
        #[arg(long)]
        input: PathBuf,
        /// TOML config file (columns, grid, grouping)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Group rows by `neighbourhood` or `neighbourhood_sector`
        #[arg(long)]
        group_by: Option<Grouping>,
        /// Only report the first K ranked entities
        #[arg(long)]
        top_k: Option<usize>,
        /// Print the result as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the per-period detector state for one entity
    Trace {
        /// Input CSV with one row per report (or per aggregated count)
        #[arg(long)]
        input: PathBuf,
        /// TOML config file (columns, grouping)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Group rows by `neighbourhood` or `neighbourhood_sector`.
        /// Defaults to `neighbourhood_sector` when `--entity` names a sector.
        #[arg(long)]
        group_by: Option<Grouping>,
        /// Entity key, `NEIGHBOURHOOD` or `NEIGHBOURHOOD/SECTOR`
        #[arg(long)]
        entity: EntityKey,
        /// Slack (C)
        #[arg(long, default_value = "0")]
        slack: f64,
        /// Alarm threshold (T)
        #[arg(long)]
        threshold: f64,
        /// Print the trace as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show the expanded slack and threshold axes
    Grid {
        /// TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let multi = report_watch_cli_utils::init_logger(report_watch_cli_utils::verbosity_level(
        cli.verbose,
    ));

    let Some(command) = cli.command else {
        println!("Report Watch");
        println!();
        return interactive::run(&multi);
    };

    match command {
        Commands::Detect {
            input,
            config,
            group_by,
            top_k,
            json,
        } => {
            let config = Config::load(config.as_deref())?.with_overrides(group_by, top_k);
            let progress = IndicatifProgress::sweep_bar(&multi, "Sweeping grid");
            let result = pipeline::detect(&input, &config, &progress)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", report::render_ranking(&result));
            }
        }
        Commands::Trace {
            input,
            config,
            group_by,
            entity,
            slack,
            threshold,
            json,
        } => {
            let group_by = group_by.or_else(|| {
                entity
                    .sector
                    .is_some()
                    .then_some(Grouping::NeighbourhoodSector)
            });
            let config = Config::load(config.as_deref())?.with_overrides(group_by, None);
            let params = CusumParams { slack, threshold };

            let series = pipeline::load_series(&input, &config)?;
            let states = pipeline::trace_entity(&series, &entity, params)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&states)?);
            } else {
                print!("{}", report::render_trace(&entity, params, &states));
            }
        }
        Commands::Grid { config } => {
            let config = Config::load(config.as_deref())?;
            let grid = GridCells::new(&config.grid)?;
            print!("{}", report::render_grid(&grid));
        }
    }

    Ok(())
}
