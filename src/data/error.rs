use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the data layer. Application seams wrap these in
/// `anyhow` context naming the dataset or file being processed.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("input file is empty: {}", .0.display())]
    EmptyInput(PathBuf),

    #[error("malformed CSV in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("column(s) not found: {}", .0.join(", "))]
    ColumnMissing(Vec<String>),

    #[error("column '{column}' has non-numeric value '{value}' at row {row}")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },
}
