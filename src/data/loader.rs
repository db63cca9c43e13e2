use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::DataError;
use super::model::{Registry, Table, Value};
use crate::config::PreprocessConfig;

// ---------------------------------------------------------------------------
// Load specification
// ---------------------------------------------------------------------------

/// Declared dtype for a column. `Category` is stored as a string; the
/// distinction only matters to readers of the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Str,
    Category,
    Float,
    Int,
}

/// Remove rows whose value in `column` matches any of `values`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exclusion {
    pub column: String,
    pub values: Vec<String>,
}

/// Literal substring replacement applied to every cell of one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellReplacement {
    pub column: String,
    pub from: String,
    pub to: String,
}

/// Header rename (substring match, applied in order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

/// Everything `load_table` needs to turn a raw CSV export into a clean table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadSpec {
    /// Column name → declared dtype. Unlisted columns are type-guessed.
    #[serde(default)]
    pub dtypes: BTreeMap<String, ColumnType>,
    /// Row exclusions, applied one after another: a row removed by an earlier
    /// exclusion never reaches a later one.
    #[serde(default)]
    pub exclude: Vec<Exclusion>,
    /// When set, project onto exactly these columns (validated first).
    #[serde(default)]
    pub keep_columns: Option<Vec<String>>,
    /// Columns to drop after projection; absent names are ignored.
    #[serde(default)]
    pub drop_columns: Vec<String>,
    /// Cell-level cleanup substitutions (e.g. spaces → underscores).
    #[serde(default)]
    pub replace: Vec<CellReplacement>,
    /// Header renames to canonical names, e.g. `PARTICIPANT` → `subj_idx`.
    #[serde(default)]
    pub rename: Vec<Rename>,
}

// ---------------------------------------------------------------------------
// CSV → Table
// ---------------------------------------------------------------------------

/// Load one CSV export and run the cleaning pipeline:
/// parse + cast → row exclusions → column projection → column drops →
/// cell cleanup → drop null rows → header renames.
///
/// No side effects beyond the returned table.
pub fn load_table(path: &Path, spec: &LoadSpec) -> Result<Table, DataError> {
    if !path.exists() {
        return Err(DataError::FileNotFound(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| DataError::Malformed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DataError::Malformed {
            path: path.to_path_buf(),
            source: e,
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(DataError::EmptyInput(path.to_path_buf()));
    }

    let dtypes: Vec<Option<ColumnType>> =
        headers.iter().map(|h| spec.dtypes.get(h).copied()).collect();

    let mut table = Table::new(headers.clone());
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| DataError::Malformed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut row = Vec::with_capacity(headers.len());
        for (col_idx, cell) in record.iter().enumerate() {
            row.push(cast(cell.trim(), dtypes[col_idx], &headers[col_idx], row_no)?);
        }
        table.push_row(row);
    }

    let mut table = harmonize_numeric_columns(table);
    for ex in &spec.exclude {
        table = table.exclude_rows(&ex.column, &ex.values)?;
    }
    if let Some(keep) = &spec.keep_columns {
        table = table.select_columns(keep)?;
    }
    table = table.drop_columns(&spec.drop_columns);
    for r in &spec.replace {
        table = table.replace_in_column(&r.column, &r.from, &r.to)?;
    }
    table = table.drop_null_rows();
    let mapping: Vec<(String, String)> = spec
        .rename
        .iter()
        .map(|r| (r.from.clone(), r.to.clone()))
        .collect();
    Ok(table.rename_columns(&mapping))
}

fn cast(
    cell: &str,
    dtype: Option<ColumnType>,
    column: &str,
    row: usize,
) -> Result<Value, DataError> {
    if cell.is_empty() {
        return Ok(Value::Null);
    }
    match dtype {
        Some(ColumnType::Str) | Some(ColumnType::Category) => Ok(Value::Str(cell.to_string())),
        Some(ColumnType::Float) => {
            cell.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| DataError::NotNumeric {
                    column: column.to_string(),
                    row,
                    value: cell.to_string(),
                })
        }
        Some(ColumnType::Int) => {
            cell.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| DataError::NotNumeric {
                    column: column.to_string(),
                    row,
                    value: cell.to_string(),
                })
        }
        None => Ok(guess(cell)),
    }
}

fn guess(cell: &str) -> Value {
    if let Ok(i) = cell.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = cell.parse::<f64>() {
        return Value::Float(f);
    }
    Value::Str(cell.to_string())
}

/// A guessed column holding both `7` and `0.25` would come out mixed
/// Int/Float; promote such columns to all-float so columns stay homogeneous.
fn harmonize_numeric_columns(table: Table) -> Table {
    let mut promote = vec![false; table.columns().len()];
    for (col, flag) in promote.iter_mut().enumerate() {
        let mut has_int = false;
        let mut has_float = false;
        for row in table.rows() {
            match row[col] {
                Value::Int(_) => has_int = true,
                Value::Float(_) => has_float = true,
                _ => {}
            }
        }
        *flag = has_int && has_float;
    }
    if !promote.iter().any(|&p| p) {
        return table;
    }
    let columns = table.columns().to_vec();
    let mut out = Table::new(columns);
    for row in table.rows() {
        let row = row
            .iter()
            .enumerate()
            .map(|(col, v)| match v {
                Value::Int(i) if promote[col] => Value::Float(*i as f64),
                other => other.clone(),
            })
            .collect();
        out.push_row(row);
    }
    out
}

// ---------------------------------------------------------------------------
// Registry loading
// ---------------------------------------------------------------------------

/// Load every configured dataset. A dataset that fails to load is logged
/// with its name and skipped; the rest of the batch still loads.
pub fn load_registry(cfg: &PreprocessConfig) -> Registry {
    let mut registry = Registry::new();
    for (name, filename) in &cfg.datasets {
        let path = cfg.data_dir.join(filename);
        match load_table(&path, &cfg.load) {
            Ok(table) => {
                log::info!(
                    "loaded dataset '{name}' from {}: {} rows, columns {:?}",
                    path.display(),
                    table.len(),
                    table.columns()
                );
                registry.insert(name.clone(), table);
            }
            Err(e) => {
                log::error!("skipping dataset '{name}' ({}): {e}", path.display());
            }
        }
    }
    registry
}

// ---------------------------------------------------------------------------
// Table → CSV
// ---------------------------------------------------------------------------

/// Write a table back out as CSV (header + rows, no index column).
pub fn write_csv(table: &Table, path: &Path) -> Result<(), DataError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| DataError::Malformed {
        path: path.to_path_buf(),
        source: e,
    })?;
    let to_csv_err = |e: csv::Error| DataError::Malformed {
        path: path.to_path_buf(),
        source: e,
    };
    writer.write_record(table.columns()).map_err(to_csv_err)?;
    for row in table.rows() {
        let record: Vec<String> = row.iter().map(ToString::to_string).collect();
        writer.write_record(&record).map_err(to_csv_err)?;
    }
    writer
        .flush()
        .map_err(|e| DataError::Malformed {
            path: path.to_path_buf(),
            source: csv::Error::from(e),
        })
}
