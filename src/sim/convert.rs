use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::files_with_extension;

// ---------------------------------------------------------------------------
// Convert simulator .lst outputs into headered .txt files
// ---------------------------------------------------------------------------

/// Header prepended verbatim to every converted file.
pub const LST_HEADER: &str = "# RESPONSE\tTIME\n";

/// For every `.lst` file directly inside `dir`, write a sibling `.txt`
/// holding [`LST_HEADER`] followed by the original content unchanged.
/// Returns the paths of the files written.
pub fn convert_lst_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut converted = Vec::new();
    for lst in files_with_extension(dir, "lst")? {
        let txt = lst.with_extension("txt");
        let content = fs::read_to_string(&lst)
            .with_context(|| format!("reading {}", lst.display()))?;
        fs::write(&txt, format!("{LST_HEADER}{content}"))
            .with_context(|| format!("writing {}", txt.display()))?;
        log::info!("converted {} to {}", lst.display(), txt.display());
        converted.push(txt);
    }
    Ok(converted)
}
