use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::config::RunConfig;

// ---------------------------------------------------------------------------
// Path selection – replaces the original interactive folder pickers
// ---------------------------------------------------------------------------

/// What a path is being selected for. Purposes double as the key the
/// config-backed provider resolves and the text of the error when nothing
/// is configured for them.
pub mod purpose {
    pub const CORRECTED_DIR: &str = "corrected output directory";
    pub const SPLIT_OUTPUT: &str = "partition output directory";
    pub const CONVERT_DIR: &str = "simulator list-file directory";
    pub const COMBINE_INPUTS: &str = "simulator output folders";
    pub const COMBINE_OUTPUT: &str = "combined output file";
}

/// Where the pipeline gets its directories and save targets from. The
/// production implementation reads the run configuration; tests inject a
/// fixed in-memory provider.
pub trait PathProvider {
    fn pick_directory(&self, purpose: &str) -> Result<PathBuf>;
    fn pick_directories(&self, purpose: &str) -> Result<Vec<PathBuf>>;
    fn pick_save_path(&self, purpose: &str) -> Result<PathBuf>;
}

// ---------------------------------------------------------------------------
// Config-backed provider (production)
// ---------------------------------------------------------------------------

/// Resolves every purpose from the loaded `RunConfig`, so a missing path is
/// reported as the config section that should define it.
pub struct ConfigPaths<'a> {
    cfg: &'a RunConfig,
}

impl<'a> ConfigPaths<'a> {
    pub fn new(cfg: &'a RunConfig) -> Self {
        ConfigPaths { cfg }
    }
}

impl PathProvider for ConfigPaths<'_> {
    fn pick_directory(&self, purpose: &str) -> Result<PathBuf> {
        match purpose {
            purpose::CORRECTED_DIR => Ok(self.cfg.preprocess()?.corrected_dir.clone()),
            purpose::SPLIT_OUTPUT => Ok(self.cfg.split()?.output_dir.clone()),
            purpose::CONVERT_DIR => Ok(self.cfg.convert()?.directory.clone()),
            other => bail!("no configured directory for purpose '{other}'"),
        }
    }

    fn pick_directories(&self, purpose: &str) -> Result<Vec<PathBuf>> {
        match purpose {
            purpose::COMBINE_INPUTS => Ok(self.cfg.combine()?.folders.clone()),
            other => bail!("no configured directory list for purpose '{other}'"),
        }
    }

    fn pick_save_path(&self, purpose: &str) -> Result<PathBuf> {
        match purpose {
            purpose::COMBINE_OUTPUT => Ok(self.cfg.combine()?.output.clone()),
            other => bail!("no configured save path for purpose '{other}'"),
        }
    }
}

// ---------------------------------------------------------------------------
// Fixed provider (tests)
// ---------------------------------------------------------------------------

/// In-memory provider with preselected paths per purpose.
#[derive(Debug, Clone, Default)]
pub struct FixedPaths {
    dirs: BTreeMap<String, Vec<PathBuf>>,
    saves: BTreeMap<String, PathBuf>,
}

impl FixedPaths {
    pub fn with_directory(mut self, purpose: &str, dir: impl Into<PathBuf>) -> Self {
        self.dirs.entry(purpose.to_string()).or_default().push(dir.into());
        self
    }

    pub fn with_save_path(mut self, purpose: &str, path: impl Into<PathBuf>) -> Self {
        self.saves.insert(purpose.to_string(), path.into());
        self
    }
}

impl PathProvider for FixedPaths {
    fn pick_directory(&self, purpose: &str) -> Result<PathBuf> {
        match self.dirs.get(purpose).and_then(|d| d.first()) {
            Some(dir) => Ok(dir.clone()),
            None => bail!("no directory preselected for '{purpose}'"),
        }
    }

    fn pick_directories(&self, purpose: &str) -> Result<Vec<PathBuf>> {
        match self.dirs.get(purpose) {
            Some(dirs) if !dirs.is_empty() => Ok(dirs.clone()),
            _ => bail!("no directories preselected for '{purpose}'"),
        }
    }

    fn pick_save_path(&self, purpose: &str) -> Result<PathBuf> {
        match self.saves.get(purpose) {
            Some(path) => Ok(path.clone()),
            None => bail!("no save path preselected for '{purpose}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_provider_returns_preselected_paths() {
        let paths = FixedPaths::default()
            .with_directory(purpose::COMBINE_INPUTS, "/tmp/a")
            .with_directory(purpose::COMBINE_INPUTS, "/tmp/b")
            .with_save_path(purpose::COMBINE_OUTPUT, "/tmp/out.dat");

        let dirs = paths.pick_directories(purpose::COMBINE_INPUTS).unwrap();
        assert_eq!(dirs.len(), 2);
        assert_eq!(
            paths.pick_save_path(purpose::COMBINE_OUTPUT).unwrap(),
            PathBuf::from("/tmp/out.dat")
        );
    }

    #[test]
    fn unknown_purpose_is_an_error_naming_it() {
        let paths = FixedPaths::default();
        let err = paths.pick_directory(purpose::SPLIT_OUTPUT).unwrap_err();
        assert!(err.to_string().contains(purpose::SPLIT_OUTPUT));
    }

    #[test]
    fn config_provider_points_at_missing_section() {
        let cfg = RunConfig::default();
        let paths = ConfigPaths::new(&cfg);
        let err = paths.pick_directories(purpose::COMBINE_INPUTS).unwrap_err();
        assert!(format!("{err:#}").contains("[combine]"));
    }
}
