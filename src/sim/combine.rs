use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::files_with_extension_recursive;

// ---------------------------------------------------------------------------
// Combine simulator .dat outputs into a single file
// ---------------------------------------------------------------------------

/// Concatenate the byte contents of every `.dat` file found under the given
/// folders (recursive, sorted traversal) into `output`, opened once. No
/// deduplication, no content inspection. Returns the bytes written.
pub fn combine_dat_files(folders: &[PathBuf], output: &Path) -> Result<u64> {
    let mut out = File::create(output)
        .with_context(|| format!("creating combined file {}", output.display()))?;

    let mut total = 0u64;
    for folder in folders {
        for dat in files_with_extension_recursive(folder, "dat")? {
            let mut input =
                File::open(&dat).with_context(|| format!("opening {}", dat.display()))?;
            let copied = io::copy(&mut input, &mut out)
                .with_context(|| format!("appending {}", dat.display()))?;
            log::debug!("appended {copied} bytes from {}", dat.display());
            total += copied;
        }
    }
    log::info!(
        "combined .dat files from {} folder(s) into {} ({total} bytes)",
        folders.len(),
        output.display()
    );
    Ok(total)
}
