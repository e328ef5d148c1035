use thiserror::Error;

use crate::store::GridError;
use crate::value::CellValue;

pub type TableResult<T> = Result<T, TableError>;

/// Failures surfaced by [`RecordTable`](crate::RecordTable) and
/// [`TableRegistry`](crate::TableRegistry).
///
/// "Nothing matched" is never an error: lookups return `None` or an empty `Vec`.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("table not found: {0}")]
    NotFound(String),

    #[error("unknown column {table}[{column}]")]
    InvalidColumn { table: String, column: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("type mismatch in {table}[{column}]: {value:?} is not numeric")]
    TypeMismatch {
        table: String,
        column: String,
        value: CellValue,
    },

    #[error(transparent)]
    Store(#[from] GridError),
}
