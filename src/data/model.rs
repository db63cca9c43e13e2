use std::collections::BTreeMap;
use std::fmt;

use super::error::DataError;

// ---------------------------------------------------------------------------
// Value – a single cell in a trial table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the dtypes of the source exports.
/// Using `BTreeMap` keys downstream (response tallies) so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Null,
}

// -- Manual Eq/Ord so we can key BTreeMaps with Value --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Int(_) => 1,
                Float(_) => 2,
                Str(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Str(a), Str(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{}", fmt_float(*v)),
            Value::Null => Ok(()),
        }
    }
}

/// Render a float the way the source exports carry it: whole numbers keep a
/// trailing `.0` so a float column stays recognisably float in text output.
pub fn fmt_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

impl Value {
    /// Numeric view used by the statistics layer.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Table – named columns, aligned rows
// ---------------------------------------------------------------------------

/// An in-memory trial table: ordered column names plus row-major values.
/// Every row transform returns a new `Table`; nothing mutates in place, so a
/// raw table and its corrected counterpart can always be compared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row. The caller guarantees the width matches the header.
    pub fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Resolve one column name, failing with the name that was not found.
    pub fn require_column(&self, name: &str) -> Result<usize, DataError> {
        self.column_index(name)
            .ok_or_else(|| DataError::ColumnMissing(vec![name.to_string()]))
    }

    /// Resolve several column names at once. All missing names are reported
    /// together so the operator sees the full list on the first failure.
    pub fn require_columns(&self, names: &[&str]) -> Result<Vec<usize>, DataError> {
        let mut indices = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column_index(name) {
                Some(i) => indices.push(i),
                None => missing.push(name.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(indices)
        } else {
            Err(DataError::ColumnMissing(missing))
        }
    }

    /// Project onto `keep`, preserving the order of `keep`. Every requested
    /// column is validated before any projection happens.
    pub fn select_columns(&self, keep: &[String]) -> Result<Table, DataError> {
        let refs: Vec<&str> = keep.iter().map(String::as_str).collect();
        let indices = self.require_columns(&refs)?;
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Table {
            columns: keep.to_vec(),
            rows,
        })
    }

    /// Remove the listed columns. Names not present are ignored.
    pub fn drop_columns(&self, drop: &[String]) -> Table {
        let kept: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !drop.contains(c))
            .map(|(i, _)| i)
            .collect();
        let columns = kept.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| kept.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Table { columns, rows }
    }

    /// Rename headers by ordered substring replacement, e.g.
    /// `PARTICIPANT` → `subj_idx` also renames a `PARTICIPANT_ID` column.
    pub fn rename_columns(&self, mapping: &[(String, String)]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let mut name = c.clone();
                for (from, to) in mapping {
                    name = name.replace(from.as_str(), to.as_str());
                }
                name
            })
            .collect();
        Table {
            columns,
            rows: self.rows.clone(),
        }
    }

    /// Keep rows for which `keep` returns true. Pure transform.
    pub fn retain_rows(&self, keep: impl Fn(usize, &[Value]) -> bool) -> Table {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter(|(i, row)| keep(*i, row))
            .map(|(_, row)| row.clone())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Remove rows whose rendered value in `column` equals any of `values`.
    pub fn exclude_rows(&self, column: &str, values: &[String]) -> Result<Table, DataError> {
        let idx = self.require_column(column)?;
        Ok(self.retain_rows(|_, row| !values.iter().any(|v| row[idx].to_string() == *v)))
    }

    /// Remove rows containing any null value.
    pub fn drop_null_rows(&self) -> Table {
        self.retain_rows(|_, row| !row.iter().any(Value::is_null))
    }

    /// Literal substring replacement in every string cell of one column.
    pub fn replace_in_column(
        &self,
        column: &str,
        from: &str,
        to: &str,
    ) -> Result<Table, DataError> {
        let idx = self.require_column(column)?;
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                if let Value::Str(s) = &row[idx] {
                    row[idx] = Value::Str(s.replace(from, to));
                }
                row
            })
            .collect();
        Ok(Table {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Extract one column as `f64`, failing on the first non-numeric cell.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>, DataError> {
        let idx = self.require_column(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row, r)| {
                r[idx].as_f64().ok_or_else(|| DataError::NotNumeric {
                    column: name.to_string(),
                    row,
                    value: r[idx].to_string(),
                })
            })
            .collect()
    }

    /// Per-column null tallies (diagnostics).
    pub fn null_counts(&self) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> =
            self.columns.iter().map(|c| (c.clone(), 0)).collect();
        for row in &self.rows {
            for (col, value) in self.columns.iter().zip(row) {
                if value.is_null() {
                    if let Some(n) = counts.get_mut(col) {
                        *n += 1;
                    }
                }
            }
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// Registry – named collection of tables
// ---------------------------------------------------------------------------

/// Dataset name → table. Built once at load time; the outlier filter produces
/// a new registry rather than touching this one.
pub type Registry = BTreeMap<String, Table>;
