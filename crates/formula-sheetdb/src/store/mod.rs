//! Grid storage backends.
//!
//! The record engine only ever talks to a [`GridStore`]: it resolves a grid by
//! name, reads the header and data rows, and writes rows or cells addressed by
//! physical (1-based) row/column numbers. Two backends ship with the crate:
//! - [`InMemoryGridStore`] for embedding and tests
//! - [`SqliteGridStore`] for sparse, persistent grids

mod memory;
mod schema;
mod sqlite;

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::address::{CellAddress, MAX_COLS, MAX_ROWS};
use crate::value::CellValue;

pub use memory::InMemoryGridStore;
pub use sqlite::{SqliteGrid, SqliteGridStore, SqliteGridStoreConfig};

/// A positional data row. Cell `i` belongs to the column at position `i`.
pub type Record = Vec<CellValue>;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("grid not found: {0}")]
    GridNotFound(String),
    #[error("grid already exists: {0}")]
    DuplicateGrid(String),
    #[error("invalid cell address: row {row}, col {col}")]
    InvalidAddress { row: u32, col: u32 },
    #[error("batch write rejected: {0}")]
    Rejected(String),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GridError>;

/// Cell-level access to named two-dimensional grids.
///
/// Row 1 of every grid is its header; data starts on row 2. All row and column
/// numbers are 1-based. Implementations serialize their own physical writes but
/// make no promise about read-then-write sequences issued by callers.
pub trait GridStore {
    /// Opaque handle to a resolved grid.
    type Grid: Clone + fmt::Debug;

    /// Look up a grid by name; fails with [`GridError::GridNotFound`] if absent.
    fn resolve_table(&self, name: &str) -> Result<Self::Grid>;

    /// The header row, one cell per column (may be empty for a blank grid).
    fn read_header_row(&self, grid: &Self::Grid) -> Result<Vec<CellValue>>;

    /// Every row below the header up to the last used row, in physical order.
    fn read_all_data_rows(&self, grid: &Self::Grid) -> Result<Vec<Record>>;

    /// Write `record` on the row after the last used row.
    fn append_row(&self, grid: &Self::Grid, record: &[CellValue]) -> Result<()>;

    /// Write `records` on consecutive rows starting at `start_row`.
    fn write_row_block(&self, grid: &Self::Grid, start_row: u32, records: &[Record])
        -> Result<()>;

    /// Overwrite the first `record.len()` cells of `row`.
    fn write_row(&self, grid: &Self::Grid, row: u32, record: &[CellValue]) -> Result<()>;

    fn write_cell(&self, grid: &Self::Grid, row: u32, col: u32, value: &CellValue) -> Result<()>;

    /// Apply every cell write in one request: either all of them land or none do.
    fn batch_write_cells(
        &self,
        grid: &Self::Grid,
        cells: &BTreeMap<CellAddress, CellValue>,
    ) -> Result<()>;
}

/// Rows and columns are 1-based and bounded by [`MAX_ROWS`] and [`MAX_COLS`].
pub(crate) fn check_address(row: u32, col: u32) -> Result<()> {
    if row == 0 || col == 0 || row > MAX_ROWS || col > MAX_COLS {
        return Err(GridError::InvalidAddress { row, col });
    }
    Ok(())
}

/// Checks that `record` fits on `row`; an empty record still needs a valid row.
pub(crate) fn check_row(row: u32, record: &[CellValue]) -> Result<()> {
    let width = u32::try_from(record.len()).unwrap_or(u32::MAX);
    check_address(row, width.max(1))
}

/// Checks every row of a block written from `start_row` downwards.
pub(crate) fn check_block(start_row: u32, records: &[Record]) -> Result<()> {
    check_address(start_row, 1)?;
    for (offset, record) in records.iter().enumerate() {
        let offset = u32::try_from(offset).unwrap_or(u32::MAX);
        check_row(start_row.saturating_add(offset), record)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_outside_the_grid_are_invalid() {
        assert!(check_address(1, 1).is_ok());
        assert!(check_address(MAX_ROWS, MAX_COLS).is_ok());
        for (row, col) in [(0, 1), (1, 0), (MAX_ROWS + 1, 1), (1, MAX_COLS + 1), (u32::MAX, 1)] {
            assert!(matches!(
                check_address(row, col),
                Err(GridError::InvalidAddress { row: r, col: c }) if r == row && c == col
            ));
        }
        assert!(check_row(2, &[]).is_ok());
        assert!(check_row(MAX_ROWS + 1, &[]).is_err());
        assert!(check_row(2, &vec![CellValue::Empty; MAX_COLS as usize + 1]).is_err());

        let block = vec![vec![CellValue::from(1)]; 2];
        assert!(check_block(MAX_ROWS - 1, &block).is_ok());
        assert!(matches!(
            check_block(MAX_ROWS, &block),
            Err(GridError::InvalidAddress { row, .. }) if row == MAX_ROWS + 1
        ));
    }
}
