use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::filter::DEFAULT_Z_THRESHOLD;
use crate::data::loader::LoadSpec;
use crate::data::split::SplitColumns;

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Everything the pipeline used to hardcode — paths, thresholds, column
/// lists, exclusions, rename maps — lives in one TOML file, one section per
/// subcommand. Sections are optional; a subcommand fails with the name of
/// the section it needs when that section is absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    pub preprocess: Option<PreprocessConfig>,
    pub split: Option<SplitConfig>,
    pub combine: Option<CombineConfig>,
    pub convert: Option<ConvertConfig>,
    pub compile: Option<CompileConfig>,
}

/// `[preprocess]` — load the raw datasets, remove outliers, write corrected
/// CSVs and the diagnostics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Directory holding the raw CSV exports.
    pub data_dir: PathBuf,
    /// Dataset name → CSV filename inside `data_dir`.
    pub datasets: BTreeMap<String, String>,
    #[serde(default)]
    pub load: LoadSpec,
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,
    /// Where corrected per-dataset CSVs are written.
    pub corrected_dir: PathBuf,
    /// Optional JSON diagnostics report comparing raw vs. corrected data.
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

fn default_z_threshold() -> f64 {
    DEFAULT_Z_THRESHOLD
}

/// `[split]` — partition one corrected CSV into per-participant text files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Corrected CSV to partition.
    pub input: PathBuf,
    #[serde(default)]
    pub load: LoadSpec,
    #[serde(default)]
    pub columns: SplitColumns,
    pub output_dir: PathBuf,
}

/// `[combine]` — concatenate simulator `.dat` outputs into one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombineConfig {
    pub folders: Vec<PathBuf>,
    pub output: PathBuf,
}

/// `[convert]` — rewrite simulator `.lst` outputs as headered `.txt` files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    pub directory: PathBuf,
}

/// `[compile]` — merge empirical partitions and simulated outputs into two
/// comparable CSVs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    pub empirical_folders: Vec<PathBuf>,
    pub simulated_folder: PathBuf,
    pub empirical_output: PathBuf,
    pub simulated_output: PathBuf,
}

impl RunConfig {
    /// Load and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let cfg: RunConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if let Some(pre) = &self.preprocess {
            ensure!(
                pre.z_threshold.is_finite() && pre.z_threshold > 0.0,
                "[preprocess] z_threshold must be positive and finite, got {}",
                pre.z_threshold
            );
            ensure!(
                !pre.datasets.is_empty(),
                "[preprocess] needs at least one dataset"
            );
        }
        if let Some(combine) = &self.combine {
            ensure!(
                !combine.folders.is_empty(),
                "[combine] needs at least one input folder"
            );
        }
        if let Some(compile) = &self.compile {
            ensure!(
                !compile.empirical_folders.is_empty(),
                "[compile] needs at least one empirical folder"
            );
        }
        Ok(())
    }

    pub fn preprocess(&self) -> Result<&PreprocessConfig> {
        self.preprocess
            .as_ref()
            .context("config has no [preprocess] section")
    }

    pub fn split(&self) -> Result<&SplitConfig> {
        self.split.as_ref().context("config has no [split] section")
    }

    pub fn combine(&self) -> Result<&CombineConfig> {
        self.combine
            .as_ref()
            .context("config has no [combine] section")
    }

    pub fn convert(&self) -> Result<&ConvertConfig> {
        self.convert
            .as_ref()
            .context("config has no [convert] section")
    }

    pub fn compile(&self) -> Result<&CompileConfig> {
        self.compile
            .as_ref()
            .context("config has no [compile] section")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[preprocess]
data_dir = "data"
corrected_dir = "corrected"

[preprocess.datasets]
"Raw Data Set" = "Raw.csv"

[[preprocess.load.exclude]]
column = "CONCLUDED"
values = ["DROPOUT"]

[[preprocess.load.rename]]
from = "PARTICIPANT"
to = "subj_idx"

[split]
input = "corrected/raw_data_set_corrected.csv"
output_dir = "datasets"
"#;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let cfg: RunConfig = toml::from_str(MINIMAL).unwrap();
        cfg.validate().unwrap();

        let pre = cfg.preprocess().unwrap();
        assert_eq!(pre.z_threshold, DEFAULT_Z_THRESHOLD);
        assert_eq!(pre.datasets["Raw Data Set"], "Raw.csv");
        assert_eq!(pre.load.exclude[0].column, "CONCLUDED");

        let split = cfg.split().unwrap();
        assert_eq!(split.columns.group, "GROUP");
        assert_eq!(split.columns.subject, "subj_idx");
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let mut cfg: RunConfig = toml::from_str(MINIMAL).unwrap();
        cfg.preprocess.as_mut().unwrap().z_threshold = -1.0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("z_threshold"));
    }

    #[test]
    fn missing_section_is_named_in_the_error() {
        let cfg = RunConfig::default();
        let err = cfg.combine().unwrap_err();
        assert!(err.to_string().contains("[combine]"));
    }
}
