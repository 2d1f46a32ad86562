//! Interactive menu for report-watch.
//!
//! Provides a `dialoguer` flow for running detection without memorizing
//! CLI flags.

use std::path::PathBuf;

use dialoguer::{Input, Select};
use report_watch_cli_utils::{IndicatifProgress, MultiProgress};
use report_watch_detect::GridCells;
use report_watch_detect_models::CusumParams;
use report_watch_series_models::{EntityKey, Grouping};

use crate::config::Config;
use crate::{pipeline, report};

/// Top-level actions available in the interactive menu.
enum Action {
    Detect,
    Trace,
    ShowGrid,
}

impl Action {
    const ALL: &[Self] = &[Self::Detect, Self::Trace, Self::ShowGrid];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Detect => "Rank emerging anomalies",
            Self::Trace => "Trace one entity",
            Self::ShowGrid => "Show hyperparameter grid",
        }
    }
}

/// Runs the interactive menu.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected operation fails.
pub fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    let config_path = prompt_optional_path("Config file (empty for defaults)")?;
    let config = Config::load(config_path.as_deref())?;

    match Action::ALL[idx] {
        Action::Detect => {
            let input = prompt_path("Input CSV")?;
            let grouping = prompt_grouping(config.grouping)?;
            let top_k = prompt_optional_usize("Number of entities to report (empty for all)")?;
            let config = config.with_overrides(Some(grouping), top_k);

            let progress = IndicatifProgress::sweep_bar(multi, "Sweeping grid");
            let result = pipeline::detect(&input, &config, &progress)?;
            print!("{}", report::render_ranking(&result));
        }
        Action::Trace => {
            let input = prompt_path("Input CSV")?;
            let grouping = prompt_grouping(config.grouping)?;
            let config = config.with_overrides(Some(grouping), None);

            let entity: EntityKey = Input::<String>::new()
                .with_prompt("Entity (NEIGHBOURHOOD or NEIGHBOURHOOD/SECTOR)")
                .interact_text()?
                .parse()?;
            let slack: f64 = Input::new()
                .with_prompt("Slack (C)")
                .default(0.0)
                .interact_text()?;
            let threshold: f64 = Input::new()
                .with_prompt("Threshold (T)")
                .default(5.0)
                .interact_text()?;
            let params = CusumParams { slack, threshold };

            let series = pipeline::load_series(&input, &config)?;
            let states = pipeline::trace_entity(&series, &entity, params)?;
            print!("{}", report::render_trace(&entity, params, &states));
        }
        Action::ShowGrid => {
            let grid = GridCells::new(&config.grid)?;
            print!("{}", report::render_grid(&grid));
        }
    }

    Ok(())
}

fn prompt_grouping(default: Grouping) -> Result<Grouping, Box<dyn std::error::Error>> {
    let labels: Vec<&str> = Grouping::all().iter().map(AsRef::as_ref).collect();
    let default_idx = Grouping::all()
        .iter()
        .position(|g| *g == default)
        .unwrap_or(0);

    let idx = Select::new()
        .with_prompt("Group reports by")
        .items(&labels)
        .default(default_idx)
        .interact()?;

    Ok(Grouping::all()[idx])
}

fn prompt_path(prompt: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let input: String = Input::new().with_prompt(prompt).interact_text()?;
    Ok(PathBuf::from(input.trim()))
}

fn prompt_optional_path(prompt: &str) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    if input.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(PathBuf::from(input.trim())))
    }
}

fn prompt_optional_usize(prompt: &str) -> Result<Option<usize>, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    if input.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(input.trim().parse()?))
    }
}
