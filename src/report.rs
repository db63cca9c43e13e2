//! Diagnostics over raw and corrected registries.
//!
//! Computes the numbers behind the usual comparison plots (trial counts,
//! response tallies, response-time quartiles, percent correct); rendering is
//! left to downstream tooling, which reads the JSON report.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::data::error::DataError;
use crate::data::filter::RT_COLUMN;
use crate::data::model::{Registry, Table};
use crate::data::stats;

/// Canonical response column, produced by the loader's renames.
pub const RESPONSE_COLUMN: &str = "response";

/// The ordinal levels a response can take.
const RESPONSE_LEVELS: [(&str, f64); 5] = [
    ("0", 0.0),
    ("0.25", 0.25),
    ("0.5", 0.5),
    ("0.75", 0.75),
    ("1", 1.0),
];

// ---------------------------------------------------------------------------
// Registry-wide checks
// ---------------------------------------------------------------------------

/// Per-dataset columns that still contain nulls (should be none after
/// loading, since the loader drops null rows — this is the sanity check).
pub fn missing_values(registry: &Registry) -> BTreeMap<String, BTreeMap<String, usize>> {
    let mut out = BTreeMap::new();
    for (name, table) in registry {
        let nonzero: BTreeMap<String, usize> = table
            .null_counts()
            .into_iter()
            .filter(|(_, n)| *n > 0)
            .collect();
        if nonzero.is_empty() {
            log::info!("no missing values in dataset '{name}'");
        } else {
            log::warn!("missing values in dataset '{name}': {nonzero:?}");
        }
        out.insert(name.clone(), nonzero);
    }
    out
}

/// Row count of `column` per dataset. Datasets without the column are
/// logged and skipped.
pub fn column_lengths(registry: &Registry, column: &str) -> BTreeMap<String, usize> {
    let mut out = BTreeMap::new();
    for (name, table) in registry {
        match table.column_index(column) {
            Some(_) => {
                log::info!(
                    "dataset '{name}': column '{column}' has {} values",
                    table.len()
                );
                out.insert(name.clone(), table.len());
            }
            None => log::warn!("dataset '{name}' has no column '{column}'"),
        }
    }
    out
}

/// Tally the ordinal response levels in one table.
pub fn response_counts(table: &Table) -> Result<BTreeMap<String, usize>, DataError> {
    let responses = table.numeric_column(RESPONSE_COLUMN)?;
    let mut counts: BTreeMap<String, usize> = RESPONSE_LEVELS
        .iter()
        .map(|(label, _)| (label.to_string(), 0))
        .collect();
    for r in &responses {
        for (label, level) in &RESPONSE_LEVELS {
            if r == level {
                if let Some(n) = counts.get_mut(*label) {
                    *n += 1;
                }
            }
        }
    }
    Ok(counts)
}

/// Response tallies per dataset; datasets without a response column are
/// logged and skipped.
pub fn count_responses(registry: &Registry) -> BTreeMap<String, BTreeMap<String, usize>> {
    let mut out = BTreeMap::new();
    for (name, table) in registry {
        match response_counts(table) {
            Ok(counts) => {
                out.insert(name.clone(), counts);
            }
            Err(e) => log::warn!("skipping response counts for dataset '{name}': {e}"),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Per-table summaries
// ---------------------------------------------------------------------------

/// Response-time distribution summary, the numbers behind the histograms
/// and boxplots.
#[derive(Debug, Clone, Serialize)]
pub struct RtSummary {
    pub trials: usize,
    pub mean: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
}

pub fn rt_summary(table: &Table) -> Result<RtSummary, DataError> {
    let mut rt = table.numeric_column(RT_COLUMN)?;
    Ok(RtSummary {
        trials: rt.len(),
        mean: stats::mean(&rt),
        q25: stats::quantile(&mut rt, 0.25),
        median: stats::quantile(&mut rt, 0.5),
        q75: stats::quantile(&mut rt, 0.75),
    })
}

/// Mean response × 100 per (subject, group, session) — the aggregation
/// behind the empirical vs. simulated scatterplots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentCorrect {
    pub subject: String,
    pub group: String,
    pub session: String,
    pub percent: f64,
}

pub fn percent_correct(
    table: &Table,
    subject: &str,
    group: &str,
    session: &str,
) -> Result<Vec<PercentCorrect>, DataError> {
    let indices = table.require_columns(&[subject, group, session])?;
    let responses = table.numeric_column(RESPONSE_COLUMN)?;

    let mut groups: BTreeMap<(String, String, String), (f64, usize)> = BTreeMap::new();
    for (row_no, row) in table.rows().iter().enumerate() {
        let key = (
            row[indices[0]].to_string(),
            row[indices[1]].to_string(),
            row[indices[2]].to_string(),
        );
        let entry = groups.entry(key).or_insert((0.0, 0));
        entry.0 += responses[row_no];
        entry.1 += 1;
    }

    Ok(groups
        .into_iter()
        .map(|((subject, group, session), (sum, n))| PercentCorrect {
            subject,
            group,
            session,
            percent: sum / n as f64 * 100.0,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// JSON report
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct DatasetReport {
    pub raw_trials: usize,
    pub corrected_trials: usize,
    pub rt_raw: RtSummary,
    pub rt_corrected: RtSummary,
    pub responses_corrected: BTreeMap<String, usize>,
}

/// Summarize every dataset present in both registries and write the result
/// as pretty-printed JSON for downstream plotting tools.
pub fn write_report(path: &Path, raw: &Registry, corrected: &Registry) -> Result<()> {
    let mut datasets = BTreeMap::new();
    for (name, raw_table) in raw {
        let Some(corr_table) = corrected.get(name) else {
            continue;
        };
        let entry = DatasetReport {
            raw_trials: raw_table.len(),
            corrected_trials: corr_table.len(),
            rt_raw: rt_summary(raw_table)
                .with_context(|| format!("summarizing raw dataset '{name}'"))?,
            rt_corrected: rt_summary(corr_table)
                .with_context(|| format!("summarizing corrected dataset '{name}'"))?,
            responses_corrected: response_counts(corr_table)
                .with_context(|| format!("counting responses in dataset '{name}'"))?,
        };
        datasets.insert(name.clone(), entry);
    }

    let file =
        File::create(path).with_context(|| format!("creating report {}", path.display()))?;
    serde_json::to_writer_pretty(file, &datasets)
        .with_context(|| format!("writing report {}", path.display()))?;
    log::info!("wrote diagnostics report to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Table, Value};

    fn table() -> Table {
        let mut t = Table::new(vec![
            "subj_idx".into(),
            "GROUP".into(),
            "SESSION".into(),
            "response".into(),
            "rt".into(),
        ]);
        let rows = [
            ("PT0001", "Placebo", 1, 1.0, 0.5),
            ("PT0001", "Placebo", 1, 0.0, 0.6),
            ("PT0001", "Placebo", 2, 1.0, 0.4),
            ("PT0002", "Probiotics", 1, 0.25, 0.7),
        ];
        for (subj, group, session, response, rt) in rows {
            t.push_row(vec![
                Value::Str(subj.into()),
                Value::Str(group.into()),
                Value::Int(session),
                Value::Float(response),
                Value::Float(rt),
            ]);
        }
        t
    }

    #[test]
    fn response_counts_tally_each_level() {
        let counts = response_counts(&table()).unwrap();
        assert_eq!(counts["1"], 2);
        assert_eq!(counts["0"], 1);
        assert_eq!(counts["0.25"], 1);
        assert_eq!(counts["0.5"], 0);
    }

    #[test]
    fn percent_correct_groups_by_subject_group_session() {
        let mut pc =
            percent_correct(&table(), "subj_idx", "GROUP", "SESSION").unwrap();
        pc.sort_by(|a, b| (&a.subject, &a.session).cmp(&(&b.subject, &b.session)));

        assert_eq!(pc.len(), 3);
        assert!((pc[0].percent - 50.0).abs() < 1e-12); // PT0001 session 1
        assert!((pc[1].percent - 100.0).abs() < 1e-12); // PT0001 session 2
        assert!((pc[2].percent - 25.0).abs() < 1e-12); // PT0002 session 1
    }

    #[test]
    fn rt_summary_reports_quartiles() {
        let summary = rt_summary(&table()).unwrap();
        assert_eq!(summary.trials, 4);
        assert!((summary.median - 0.55).abs() < 1e-12);
        assert!((summary.mean - 0.55).abs() < 1e-12);
    }

    #[test]
    fn report_is_valid_json_keyed_by_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let mut raw = Registry::new();
        raw.insert("Raw Data Set".into(), table());
        let corrected = raw.clone();

        write_report(&path, &raw, &corrected).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["Raw Data Set"]["raw_trials"], 4);
        assert_eq!(parsed["Raw Data Set"]["responses_corrected"]["1"], 2);
    }
}
