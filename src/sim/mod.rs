//! Simulator file utilities: combine raw outputs, convert list files, and
//! compile empirical vs. simulated trials into comparable CSVs.

pub mod combine;
pub mod compile;
pub mod convert;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Files directly inside `dir` carrying `ext`, sorted by path.
pub(crate) fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("reading directory {}", dir.display()))?
            .path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(ext) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Like [`files_with_extension`], but descending into subdirectories.
/// Entries are visited in sorted order so the result is deterministic.
pub(crate) fn files_with_extension_recursive(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?;
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        paths.push(
            entry
                .with_context(|| format!("reading directory {}", dir.display()))?
                .path(),
        );
    }
    paths.sort();

    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(files_with_extension_recursive(&path, ext)?);
        } else if path.extension().and_then(|e| e.to_str()) == Some(ext) {
            files.push(path);
        }
    }
    Ok(files)
}
