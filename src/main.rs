use std::fs;
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};

use trialprep::config::RunConfig;
use trialprep::data::filter::{remove_outliers, RT_COLUMN};
use trialprep::data::loader::{load_registry, load_table, write_csv};
use trialprep::data::split::split_and_save;
use trialprep::paths::{purpose, ConfigPaths, PathProvider};
use trialprep::report;
use trialprep::sim::combine::combine_dat_files;
use trialprep::sim::compile::compile_datasets;
use trialprep::sim::convert::convert_lst_files;

#[derive(Parser)]
#[command(
    name = "trialprep",
    version,
    about = "Preprocess, partition, and compile behavioral response-time trial data"
)]
struct Cli {
    /// Run configuration file (TOML).
    #[arg(short, long, default_value = "trialprep.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the raw datasets, remove outliers, and write corrected CSVs.
    Preprocess,
    /// Partition a corrected dataset by group, session, condition, and participant.
    Split,
    /// Concatenate simulator .dat outputs into a single file.
    Combine,
    /// Convert simulator .lst outputs into headered .txt files.
    Convert,
    /// Compile empirical and simulated trials into comparable CSVs.
    Compile,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let cfg = RunConfig::load(&cli.config)?;
    let paths = ConfigPaths::new(&cfg);

    match cli.command {
        Command::Preprocess => preprocess(&cfg, &paths),
        Command::Split => split(&cfg, &paths),
        Command::Combine => combine(&paths),
        Command::Convert => convert(&paths),
        Command::Compile => compile(&cfg),
    }
}

fn preprocess(cfg: &RunConfig, paths: &dyn PathProvider) -> Result<()> {
    let pre = cfg.preprocess()?;

    let raw = load_registry(pre);
    ensure!(!raw.is_empty(), "no dataset loaded successfully");
    report::missing_values(&raw);

    let corrected = remove_outliers(&raw, pre.z_threshold)?;
    report::missing_values(&corrected);
    report::column_lengths(&raw, RT_COLUMN);
    report::column_lengths(&corrected, RT_COLUMN);
    report::count_responses(&corrected);

    let out_dir = paths.pick_directory(purpose::CORRECTED_DIR)?;
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    for (name, table) in &corrected {
        let path = out_dir.join(format!("{}_corrected.csv", slug(name)));
        write_csv(table, &path)
            .with_context(|| format!("writing corrected dataset '{name}'"))?;
        log::info!("wrote corrected dataset '{name}' to {}", path.display());
    }

    if let Some(report_path) = &pre.report_path {
        report::write_report(report_path, &raw, &corrected)?;
    }
    Ok(())
}

fn split(cfg: &RunConfig, paths: &dyn PathProvider) -> Result<()> {
    let sp = cfg.split()?;
    let table = load_table(&sp.input, &sp.load)
        .with_context(|| format!("loading {}", sp.input.display()))?;
    let out_dir = paths.pick_directory(purpose::SPLIT_OUTPUT)?;
    let files = split_and_save(&table, &sp.columns, &out_dir)?;
    log::info!("wrote {} partition files under {}", files.len(), out_dir.display());
    Ok(())
}

fn combine(paths: &dyn PathProvider) -> Result<()> {
    let folders = paths.pick_directories(purpose::COMBINE_INPUTS)?;
    let output = paths.pick_save_path(purpose::COMBINE_OUTPUT)?;
    combine_dat_files(&folders, &output)?;
    Ok(())
}

fn convert(paths: &dyn PathProvider) -> Result<()> {
    let dir = paths.pick_directory(purpose::CONVERT_DIR)?;
    let files = convert_lst_files(&dir)?;
    log::info!("converted {} list files in {}", files.len(), dir.display());
    Ok(())
}

fn compile(cfg: &RunConfig) -> Result<()> {
    compile_datasets(cfg.compile()?)?;
    Ok(())
}

/// Dataset name → filename stem ("Raw Data Set" → "raw_data_set").
fn slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}
