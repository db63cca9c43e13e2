use anyhow::Context;

use super::error::DataError;
use super::model::{Registry, Table};
use super::stats;

// ---------------------------------------------------------------------------
// Response-time outlier removal
// ---------------------------------------------------------------------------

/// Canonical response-time column, produced by the loader's renames.
pub const RT_COLUMN: &str = "rt";

/// Trials at or below 100 ms are discarded as anticipatory responses.
pub const MIN_RT_SECONDS: f64 = 0.1;

pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

/// Drop outlier trials from one table in two sequential passes:
///
/// 1. z-score pass — keep rows with `|z| <= threshold`, where z uses the
///    mean and sample standard deviation of this table's own `rt` values;
/// 2. floor pass — from the survivors, keep rows with `rt > MIN_RT_SECONDS`.
///
/// A zero or undefined standard deviation (all response times identical, or
/// fewer than two rows) leaves pass 1 a no-op rather than dividing by zero.
/// An empty table comes back unchanged. A table without an `rt` column fails
/// with `ColumnMissing` before any statistics are computed.
pub fn filter_table(table: &Table, threshold: f64) -> Result<Table, DataError> {
    table.require_column(RT_COLUMN)?;
    if table.is_empty() {
        return Ok(table.clone());
    }

    let rt = table.numeric_column(RT_COLUMN)?;
    let z_kept = match stats::z_scores(&rt) {
        Some(z) => table.retain_rows(|i, _| z[i].abs() <= threshold),
        None => table.clone(),
    };

    let rt = z_kept.numeric_column(RT_COLUMN)?;
    Ok(z_kept.retain_rows(|i, _| rt[i] > MIN_RT_SECONDS))
}

/// Filter every dataset in the registry, producing a brand-new registry.
/// The input registry and its tables are never touched, so raw and corrected
/// data stay comparable side by side.
pub fn remove_outliers(registry: &Registry, threshold: f64) -> anyhow::Result<Registry> {
    let mut corrected = Registry::new();
    for (name, table) in registry {
        let filtered = filter_table(table, threshold)
            .with_context(|| format!("removing outliers from dataset '{name}'"))?;
        log::info!(
            "dataset '{name}': {} of {} trials kept after outlier removal",
            filtered.len(),
            table.len()
        );
        corrected.insert(name.clone(), filtered);
    }
    Ok(corrected)
}
