#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # hint-rating
//! ## Introduction
//!
//! Rates automatically generated programming hints against a gold standard of
//! tutor hints.
//!
//! ## Usage
//!
//! `hint-rating rate dataset.json --preset python` rates every algorithm in
//! the dataset and prints a summary per assignment. `--hints-out` and
//! `--requests-out` write the per-hint and per-request rows as JSON.
//!
//! The environment preset can also be set with `HINT_RATING_PRESET`, in the
//! environment or in a `.env` file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bpaf::*;
use dotenvy::dotenv;
use hint_rating::{
    RatingSettings,
    data::HintSet,
    dataset::Dataset,
    rating::{Rater, RatingOptions},
    report,
};
use tracing::{Level, info, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Where the rating settings come from.
#[derive(Debug, Clone)]
struct SettingsArgs {
    /// Path to a JSON settings file
    config: Option<PathBuf>,
    /// Name of a built-in preset
    preset: Option<String>,
}

/// Arguments of the `rate` command.
#[derive(Debug, Clone)]
struct RateArgs {
    /// Rating settings
    settings:     SettingsArgs,
    /// Log every rating with its diff
    debug:        bool,
    /// Rate requests one at a time
    sequential:   bool,
    /// Where to write per-hint rows
    hints_out:    Option<PathBuf>,
    /// Where to write per-request rows
    requests_out: Option<PathBuf>,
    /// Dataset to rate
    dataset:      PathBuf,
}

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Rate every algorithm of a dataset
    Rate(RateArgs),
    /// Print the state of every request
    Requests(SettingsArgs, PathBuf),
}

/// Parsed command line.
#[derive(Debug, Clone)]
struct Cli {
    /// Log at debug level
    verbose: bool,
    /// What to do
    cmd:     Cmd,
}

/// Parse the command line arguments
fn options() -> Cli {
    /// parses the dataset path
    fn d() -> impl Parser<PathBuf> {
        positional("DATASET").help("Path to a JSON dataset of tutor hints and algorithm outcomes")
    }

    /// parses where the rating settings come from
    fn s() -> impl Parser<SettingsArgs> {
        let config = long("config")
            .help("JSON file with rating settings")
            .argument::<PathBuf>("FILE")
            .optional();
        let preset = long("preset")
            .help("Built-in settings: snap or python")
            .argument::<String>("NAME")
            .optional();
        construct!(SettingsArgs { config, preset })
    }

    let settings = s();
    let debug = long("debug")
        .help("Log every rated hint with its diff")
        .switch();
    let sequential = long("sequential")
        .help("Rate requests one at a time")
        .switch();
    let hints_out = long("hints-out")
        .help("Write one JSON row per rated hint to FILE")
        .argument::<PathBuf>("FILE")
        .optional();
    let requests_out = long("requests-out")
        .help("Write one JSON row per rated request to FILE")
        .argument::<PathBuf>("FILE")
        .optional();
    let dataset = d();

    let rate = construct!(RateArgs {
        settings,
        debug,
        sequential,
        hints_out,
        requests_out,
        dataset
    })
    .to_options()
    .command("rate")
    .help("Rate every algorithm in a dataset")
    .map(Cmd::Rate);

    let requests = construct!(Cmd::Requests(s(), d()))
        .to_options()
        .command("requests")
        .help("Print the state of every hint request");

    let verbose = short('v')
        .long("verbose")
        .help("Log at debug level")
        .switch();
    let cmd = construct!([rate, requests]);

    construct!(Cli { verbose, cmd })
        .to_options()
        .descr("Rates programming hints against a gold standard")
        .run()
}

/// Resolves settings: a file, then a preset, then the environment.
fn load_settings(args: &SettingsArgs) -> Result<RatingSettings> {
    if let Some(path) = &args.config {
        return RatingSettings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()));
    }
    if let Some(name) = &args.preset {
        return RatingSettings::preset(name).with_context(|| format!("Unknown preset `{name}`"));
    }
    RatingSettings::from_env().context("Failed to resolve settings from the environment")
}

/// Rates every algorithm and writes the requested outputs.
fn rate(args: RateArgs) -> Result<()> {
    let settings = load_settings(&args.settings)?;
    let dataset = Dataset::load(&args.dataset)
        .with_context(|| format!("Failed to load dataset {}", args.dataset.display()))?;
    let standard = dataset.gold_standard()?;
    let rater = Rater::builder()
        .config(&settings)
        .options(
            RatingOptions::builder()
                .debug(args.debug)
                .parallel(!args.sequential)
                .build(),
        )
        .build();

    let mut sets = vec![];
    for hint_set in dataset.hint_sets()? {
        info!(algorithm = %hint_set.name(), "rating with {} settings", settings.name);
        let set = rater
            .rate(&standard, &hint_set)
            .with_context(|| format!("Failed to rate `{}`", hint_set.name()))?;
        sets.push(set);
    }

    eprintln!("{}", report::summary_table(&sets));

    if let Some(path) = &args.hints_out {
        let rows: Vec<_> = sets
            .iter()
            .flat_map(|set| report::hint_rows(set, &settings))
            .collect();
        report::write_json(&rows, path)?;
    }
    if let Some(path) = &args.requests_out {
        let rows: Vec<_> = sets.iter().flat_map(report::request_rows).collect();
        report::write_json(&rows, path)?;
    }

    Ok(())
}

fn main() -> Result<()> {
    dotenv().ok();
    let opts = options();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let level = if opts.verbose { Level::DEBUG } else { Level::INFO };
    let filter_layer = LevelFilter::from_level(level);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    match opts.cmd {
        Cmd::Rate(args) => rate(args)?,
        Cmd::Requests(settings, path) => {
            let settings = load_settings(&settings)?;
            let dataset = Dataset::load(&path)
                .with_context(|| format!("Failed to load dataset {}", path.display()))?;
            print!("{}", dataset.gold_standard()?.render_request_nodes(&settings));
        }
    };

    Ok(())
}
