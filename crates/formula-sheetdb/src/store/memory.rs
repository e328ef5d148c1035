use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{check_address, check_block, check_row, GridError, GridStore, Record, Result};
use crate::address::{CellAddress, HEADER_ROW};
use crate::value::CellValue;

/// Grids held in process memory, keyed by name.
///
/// Each grid is a dense `Vec` of rows with the header at index 0. Writes past the
/// current extent grow the grid and pad new cells with [`CellValue::Empty`].
#[derive(Debug, Default)]
pub struct InMemoryGridStore {
    grids: Mutex<HashMap<String, Vec<Record>>>,
    reject_batch_writes: AtomicBool,
}

impl InMemoryGridStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty grid whose first row is `header`.
    pub fn create_grid<I, S>(&self, name: &str, header: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut grids = self.lock();
        if grids.contains_key(name) {
            return Err(GridError::DuplicateGrid(name.to_string()));
        }
        grids.insert(name.to_string(), vec![header_cells(header)]);
        Ok(())
    }

    /// Replace the header row of an existing grid.
    pub fn set_header<I, S>(&self, name: &str, header: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut grids = self.lock();
        let rows = grids
            .get_mut(name)
            .ok_or_else(|| GridError::GridNotFound(name.to_string()))?;
        rows[0] = header_cells(header);
        Ok(())
    }

    /// Append a raw row directly below the last used row.
    pub fn push_row(&self, name: &str, row: Record) -> Result<()> {
        let handle = self.resolve_table(name)?;
        self.append_row(&handle, &row)
    }

    /// Snapshot of every physical row, header included.
    pub fn rows(&self, name: &str) -> Result<Vec<Record>> {
        let grids = self.lock();
        grids
            .get(name)
            .cloned()
            .ok_or_else(|| GridError::GridNotFound(name.to_string()))
    }

    /// When set, every [`GridStore::batch_write_cells`] call is rejected.
    pub fn set_reject_batch_writes(&self, reject: bool) {
        self.reject_batch_writes.store(reject, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Record>>> {
        match self.grids.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn with_grid<T>(&self, name: &str, f: impl FnOnce(&mut Vec<Record>) -> Result<T>) -> Result<T> {
        let mut grids = self.lock();
        let rows = grids
            .get_mut(name)
            .ok_or_else(|| GridError::GridNotFound(name.to_string()))?;
        f(rows)
    }
}

fn header_cells<I, S>(header: I) -> Record
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    header
        .into_iter()
        .map(|name| CellValue::from(Into::<String>::into(name)))
        .collect()
}

/// Number of rows up to and including the last row holding a non-empty cell.
fn used_rows(rows: &[Record]) -> usize {
    rows.iter()
        .rposition(|row| row.iter().any(|cell| !cell.is_empty()))
        .map_or(0, |idx| idx + 1)
}

fn put_cell(rows: &mut Vec<Record>, row: u32, col: u32, value: CellValue) {
    let (r, c) = (row as usize - 1, col as usize - 1);
    if rows.len() <= r {
        rows.resize_with(r + 1, Vec::new);
    }
    let cells = &mut rows[r];
    if cells.len() <= c {
        cells.resize(c + 1, CellValue::Empty);
    }
    cells[c] = value;
}

fn put_row(rows: &mut Vec<Record>, row: u32, record: &[CellValue]) {
    for (idx, value) in record.iter().enumerate() {
        put_cell(rows, row, idx as u32 + 1, value.clone());
    }
    if record.is_empty() && rows.len() < row as usize {
        rows.resize_with(row as usize, Vec::new);
    }
}

impl GridStore for InMemoryGridStore {
    type Grid = String;

    fn resolve_table(&self, name: &str) -> Result<String> {
        if self.lock().contains_key(name) {
            Ok(name.to_string())
        } else {
            Err(GridError::GridNotFound(name.to_string()))
        }
    }

    fn read_header_row(&self, grid: &String) -> Result<Vec<CellValue>> {
        self.with_grid(grid, |rows| Ok(rows.first().cloned().unwrap_or_default()))
    }

    fn read_all_data_rows(&self, grid: &String) -> Result<Vec<Record>> {
        self.with_grid(grid, |rows| {
            let used = used_rows(rows);
            let width = rows[..used].iter().map(Vec::len).max().unwrap_or(0);
            Ok(rows
                .iter()
                .take(used)
                .skip(HEADER_ROW as usize)
                .map(|row| {
                    let mut row = row.clone();
                    row.resize(width, CellValue::Empty);
                    row
                })
                .collect())
        })
    }

    fn append_row(&self, grid: &String, record: &[CellValue]) -> Result<()> {
        self.with_grid(grid, |rows| {
            let next = used_rows(rows) as u32 + 1;
            check_row(next, record)?;
            put_row(rows, next, record);
            Ok(())
        })
    }

    fn write_row_block(&self, grid: &String, start_row: u32, records: &[Record]) -> Result<()> {
        check_block(start_row, records)?;
        self.with_grid(grid, |rows| {
            for (offset, record) in records.iter().enumerate() {
                put_row(rows, start_row + offset as u32, record);
            }
            Ok(())
        })
    }

    fn write_row(&self, grid: &String, row: u32, record: &[CellValue]) -> Result<()> {
        check_row(row, record)?;
        self.with_grid(grid, |rows| {
            put_row(rows, row, record);
            Ok(())
        })
    }

    fn write_cell(&self, grid: &String, row: u32, col: u32, value: &CellValue) -> Result<()> {
        check_address(row, col)?;
        self.with_grid(grid, |rows| {
            put_cell(rows, row, col, value.clone());
            Ok(())
        })
    }

    fn batch_write_cells(
        &self,
        grid: &String,
        cells: &BTreeMap<CellAddress, CellValue>,
    ) -> Result<()> {
        if self.reject_batch_writes.load(Ordering::SeqCst) {
            return Err(GridError::Rejected(format!(
                "{} cell(s) for grid {grid}",
                cells.len()
            )));
        }
        for addr in cells.keys() {
            check_address(addr.row, addr.col)?;
        }
        self.with_grid(grid, |rows| {
            for (addr, value) in cells {
                put_cell(rows, addr.row, addr.col, value.clone());
            }
            Ok(())
        })
    }
}
