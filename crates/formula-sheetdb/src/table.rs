use std::collections::BTreeMap;
use std::sync::Arc;

use crate::address::{data_row_number, CellAddress};
use crate::codec::{self, RecordObject};
use crate::column_index::ColumnIndex;
use crate::error::{TableError, TableResult};
use crate::query::{self, Criteria, Filter, SortSpec};
use crate::store::{GridError, GridStore, Record};
use crate::value::CellValue;

/// Record-level access to one named grid.
///
/// The column index is read from the header once, when the table is opened, and
/// is never refreshed. Row data is re-read from the store on every call.
///
/// Updates locate their row with one read and write it back with another; callers
/// must not let other writers touch the same grid in between.
#[derive(Debug)]
pub struct RecordTable<S: GridStore> {
    name: String,
    store: Arc<S>,
    grid: S::Grid,
    columns: ColumnIndex,
}

impl<S: GridStore> RecordTable<S> {
    /// Resolve `name` in `store` and index its header row.
    pub fn open(store: Arc<S>, name: &str) -> TableResult<Self> {
        let grid = store.resolve_table(name).map_err(|err| match err {
            GridError::GridNotFound(name) => TableError::NotFound(name),
            other => TableError::Store(other),
        })?;
        let header = store.read_header_row(&grid)?;
        let columns = ColumnIndex::from_header(&header);

        for (idx, column) in columns.shadowed() {
            log::warn!(
                "table {name}: header column {} ({column}) is shadowed by a later column with the same name",
                idx + 1
            );
        }
        log::debug!("opened table {name} with {} column(s)", columns.len());

        Ok(Self {
            name: name.to_string(),
            store,
            grid,
            columns,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The column index captured when the table was opened.
    pub fn columns(&self) -> &ColumnIndex {
        &self.columns
    }

    pub fn encode(&self, obj: &RecordObject) -> Record {
        codec::encode(obj, &self.columns)
    }

    pub fn decode(&self, record: &[CellValue]) -> RecordObject {
        codec::decode(record, &self.columns)
    }

    /// Sort already-selected records in place.
    pub fn sort(&self, records: &mut [RecordObject], spec: &SortSpec) -> TableResult<()> {
        query::sort_records(records, spec, &self.columns, &self.name)
    }

    fn position(&self, column: &str) -> TableResult<usize> {
        query::column_position(&self.columns, &self.name, column)
    }

    /// Fresh data rows, each exactly as wide as the header.
    fn read_records(&self) -> TableResult<Vec<Record>> {
        let width = self.columns.len();
        let records: Vec<Record> = self
            .store
            .read_all_data_rows(&self.grid)?
            .into_iter()
            .map(|record| codec::normalize(record, width))
            .collect();
        log::trace!("table {}: read {} data row(s)", self.name, records.len());
        Ok(records)
    }

    fn select_where(&self, filter: &Filter<'_>, sort: Option<&SortSpec>) -> TableResult<Vec<RecordObject>> {
        if let Some(spec) = sort {
            self.position(&spec.column)?;
        }
        let mut out: Vec<RecordObject> = self
            .read_records()?
            .iter()
            .filter(|record| filter.matches(record))
            .map(|record| self.decode(record))
            .collect();
        if let Some(spec) = sort {
            self.sort(&mut out, spec)?;
        }
        Ok(out)
    }

    /// Zero-based index and contents of the first row whose `pk_column` matches.
    fn find_by_pk(&self, pk_column: &str, pk_value: &CellValue) -> TableResult<Option<(usize, Record)>> {
        let filter = Filter::single(self.position(pk_column)?, pk_value);
        Ok(self
            .read_records()?
            .into_iter()
            .enumerate()
            .find(|(_, record)| filter.matches(record)))
    }

    /// Append `obj` as a new row. Returns the number of rows written (always 1).
    pub fn insert(&self, obj: &RecordObject) -> TableResult<usize> {
        let record = self.encode(obj);
        self.store.append_row(&self.grid, &record)?;
        Ok(1)
    }

    /// Write `objs` as one contiguous block below the current last row.
    pub fn insert_all(&self, objs: &[RecordObject]) -> TableResult<usize> {
        if objs.is_empty() {
            return Err(TableError::InvalidArgument(format!(
                "insert_all into {} needs at least one record",
                self.name
            )));
        }
        let start = data_row_number(self.read_records()?.len());
        let records: Vec<Record> = objs.iter().map(|obj| self.encode(obj)).collect();
        self.store.write_row_block(&self.grid, start, &records)?;
        Ok(records.len())
    }

    /// First record (in physical order) whose `pk_column` matches `pk_value`.
    pub fn select_by_pk(
        &self,
        pk_column: &str,
        pk_value: impl Into<CellValue>,
    ) -> TableResult<Option<RecordObject>> {
        let pk_value = pk_value.into();
        Ok(self
            .find_by_pk(pk_column, &pk_value)?
            .map(|(_, record)| self.decode(&record)))
    }

    /// First record matching `pk_value` after ordering every match by `sort`.
    pub fn select_by_pk_sorted(
        &self,
        pk_column: &str,
        pk_value: impl Into<CellValue>,
        sort: &SortSpec,
    ) -> TableResult<Option<RecordObject>> {
        let pk_value = pk_value.into();
        let filter = Filter::single(self.position(pk_column)?, &pk_value);
        Ok(self.select_where(&filter, Some(sort))?.into_iter().next())
    }

    pub fn select_by_column(
        &self,
        column: &str,
        value: impl Into<CellValue>,
    ) -> TableResult<Vec<RecordObject>> {
        let value = value.into();
        self.select_where(&Filter::single(self.position(column)?, &value), None)
    }

    pub fn select_by_column_sorted(
        &self,
        column: &str,
        value: impl Into<CellValue>,
        sort: &SortSpec,
    ) -> TableResult<Vec<RecordObject>> {
        let value = value.into();
        self.select_where(&Filter::single(self.position(column)?, &value), Some(sort))
    }

    pub fn select_by_columns(&self, criteria: &Criteria) -> TableResult<Vec<RecordObject>> {
        let filter = Filter::new(criteria, &self.columns, &self.name)?;
        self.select_where(&filter, None)
    }

    pub fn select_by_columns_sorted(
        &self,
        criteria: &Criteria,
        sort: &SortSpec,
    ) -> TableResult<Vec<RecordObject>> {
        let filter = Filter::new(criteria, &self.columns, &self.name)?;
        self.select_where(&filter, Some(sort))
    }

    pub fn select_all(&self) -> TableResult<Vec<RecordObject>> {
        self.select_by_columns(&Criteria::new())
    }

    pub fn select_all_sorted(&self, sort: &SortSpec) -> TableResult<Vec<RecordObject>> {
        self.select_by_columns_sorted(&Criteria::new(), sort)
    }

    /// Largest numeric value in `column`, or `None` when no cell is numeric.
    pub fn select_max(&self, column: &str) -> TableResult<Option<f64>> {
        let idx = self.position(column)?;
        Ok(self
            .read_records()?
            .iter()
            .filter_map(|record| record[idx].as_number())
            .filter(|n| !n.is_nan())
            .reduce(f64::max))
    }

    /// Add `increment` to `column` on the first row matching the key and write
    /// back only that cell.
    ///
    /// An empty cell counts as `0`. Returns the new value, or `None` when no row
    /// matches.
    pub fn select_by_pk_and_increment(
        &self,
        pk_column: &str,
        pk_value: impl Into<CellValue>,
        column: &str,
        increment: f64,
    ) -> TableResult<Option<f64>> {
        if !increment.is_finite() {
            return Err(TableError::InvalidArgument(format!(
                "increment must be a finite number, got {increment}"
            )));
        }
        let idx = self.position(column)?;
        let pk_value = pk_value.into();
        let Some((row_idx, record)) = self.find_by_pk(pk_column, &pk_value)? else {
            return Ok(None);
        };

        let current = &record[idx];
        let base = if current.is_empty() {
            0.0
        } else {
            current.as_number().ok_or_else(|| TableError::TypeMismatch {
                table: self.name.clone(),
                column: column.to_string(),
                value: current.clone(),
            })?
        };
        let next = base + increment;
        self.store.write_cell(
            &self.grid,
            data_row_number(row_idx),
            idx as u32 + 1,
            &CellValue::Number(next),
        )?;
        Ok(Some(next))
    }

    /// Replace the whole row matching the key with `obj`.
    ///
    /// Columns missing from `obj` are cleared.
    pub fn update_by_pk(
        &self,
        pk_column: &str,
        pk_value: impl Into<CellValue>,
        obj: &RecordObject,
    ) -> TableResult<Option<RecordObject>> {
        let pk_value = pk_value.into();
        let Some((row_idx, _)) = self.find_by_pk(pk_column, &pk_value)? else {
            return Ok(None);
        };
        let record = self.encode(obj);
        self.store
            .write_row(&self.grid, data_row_number(row_idx), &record)?;
        Ok(Some(self.decode(&record)))
    }

    /// Set one column on the row matching the key, keeping its other cells.
    pub fn update_item_by_pk(
        &self,
        pk_column: &str,
        pk_value: impl Into<CellValue>,
        column: &str,
        value: impl Into<CellValue>,
    ) -> TableResult<Option<RecordObject>> {
        let idx = self.position(column)?;
        let pk_value = pk_value.into();
        let Some((row_idx, mut record)) = self.find_by_pk(pk_column, &pk_value)? else {
            return Ok(None);
        };
        record[idx] = value.into();
        self.store
            .write_row(&self.grid, data_row_number(row_idx), &record)?;
        Ok(Some(self.decode(&record)))
    }

    /// Set `column` to `value` on every row matching `criteria`.
    pub fn update_item_by_columns(
        &self,
        criteria: &Criteria,
        column: &str,
        value: impl Into<CellValue>,
    ) -> TableResult<Vec<RecordObject>> {
        let mut patch = RecordObject::new();
        patch.insert(column.to_string(), value.into());
        self.update_items_by_columns(criteria, &patch)
    }

    /// Apply every `column -> value` pair in `patch` to each row matching
    /// `criteria`. Returns the rows as written.
    pub fn update_items_by_columns(
        &self,
        criteria: &Criteria,
        patch: &RecordObject,
    ) -> TableResult<Vec<RecordObject>> {
        let filter = Filter::new(criteria, &self.columns, &self.name)?;
        let patch = patch
            .iter()
            .map(|(column, value)| Ok((self.position(column)?, value)))
            .collect::<TableResult<Vec<_>>>()?;

        let mut updated = Vec::new();
        for (row_idx, mut record) in self.read_records()?.into_iter().enumerate() {
            if !filter.matches(&record) {
                continue;
            }
            for (idx, value) in &patch {
                record[*idx] = (*value).clone();
            }
            self.store
                .write_row(&self.grid, data_row_number(row_idx), &record)?;
            updated.push(self.decode(&record));
        }
        log::trace!("table {}: updated {} row(s)", self.name, updated.len());
        Ok(updated)
    }

    /// Write arbitrary cells in one batched request.
    ///
    /// Returns `false` if the store rejects the batch; the cause is logged and
    /// nothing is raised.
    pub fn update_cells(&self, cells: &BTreeMap<CellAddress, CellValue>) -> bool {
        if cells.is_empty() {
            return true;
        }
        match self.store.batch_write_cells(&self.grid, cells) {
            Ok(()) => true,
            Err(err) => {
                log::warn!(
                    "table {}: batched write of {} cell(s) failed: {err}",
                    self.name,
                    cells.len()
                );
                false
            }
        }
    }
}
