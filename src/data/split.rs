use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::model::Table;

// ---------------------------------------------------------------------------
// Group → session → condition → participant partitioner
// ---------------------------------------------------------------------------

/// Literal participant-id prefix stripped for partition filenames.
pub const SUBJECT_PREFIX: &str = "PT";

/// The four grouping columns, outermost first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitColumns {
    pub group: String,
    pub session: String,
    pub condition: String,
    pub subject: String,
}

impl Default for SplitColumns {
    fn default() -> Self {
        SplitColumns {
            group: "GROUP".into(),
            session: "SESSION".into(),
            condition: "CONDITION".into(),
            subject: "subj_idx".into(),
        }
    }
}

/// Remove the literal `PT` prefix from a participant id. Ids without the
/// prefix pass through unchanged; trailing characters are never touched.
pub fn strip_subject_prefix(id: &str) -> &str {
    id.strip_prefix(SUBJECT_PREFIX).unwrap_or(id)
}

/// Partition `table` by (group, session, condition, participant) and write
/// one tab-separated text file per partition under
/// `base / group / "session N" / condition / pt_<id>.txt` (group and
/// condition lowercased). Intermediate directories are created on demand and
/// existing ones are fine, so re-runs are idempotent.
///
/// All four grouping columns are validated before any file is written; a
/// missing column aborts with no partial output on disk.
///
/// Returns the paths written. The file set is a pure function of the table:
/// rows are grouped by key in one pass, so input row order cannot change
/// partition membership or naming.
pub fn split_and_save(
    table: &Table,
    columns: &SplitColumns,
    base_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let indices = table.require_columns(&[
        columns.group.as_str(),
        columns.session.as_str(),
        columns.condition.as_str(),
        columns.subject.as_str(),
    ])?;
    let (g, s, c, p) = (indices[0], indices[1], indices[2], indices[3]);

    let mut partitions: BTreeMap<(String, String, String, String), Vec<usize>> = BTreeMap::new();
    for (row_no, row) in table.rows().iter().enumerate() {
        let key = (
            row[g].to_string(),
            row[s].to_string(),
            row[c].to_string(),
            row[p].to_string(),
        );
        partitions.entry(key).or_default().push(row_no);
    }

    let mut written = Vec::with_capacity(partitions.len());
    for ((group, session, condition, subject), rows) in &partitions {
        let dir = base_dir
            .join(group.to_lowercase())
            .join(format!("session {session}"))
            .join(condition.to_lowercase());
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating partition directory {}", dir.display()))?;

        let path = dir.join(format!("pt_{}.txt", strip_subject_prefix(subject)));
        write_partition(table, rows, &path)
            .with_context(|| format!("writing partition file {}", path.display()))?;
        log::info!(
            "saved {} trials for participant {subject} to {}",
            rows.len(),
            path.display()
        );
        written.push(path);
    }
    Ok(written)
}

/// One partition file: `#`-prefixed tab-joined header, then one
/// tab-separated line per row. No index column, no repeated header.
fn write_partition(table: &Table, rows: &[usize], path: &Path) -> std::io::Result<()> {
    let file = fs::File::create(path)?;
    let mut w = BufWriter::new(file);
    writeln!(w, "#{}", table.columns().join("\t"))?;
    for &i in rows {
        let line: Vec<String> = table.rows()[i].iter().map(ToString::to_string).collect();
        writeln!(w, "{}", line.join("\t"))?;
    }
    w.flush()
}
