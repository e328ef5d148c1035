use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::address::CellAddress;
use crate::codec::RecordObject;
use crate::error::TableResult;
use crate::query::{Criteria, SortSpec};
use crate::store::GridStore;
use crate::table::RecordTable;
use crate::value::CellValue;

/// Name-keyed cache of [`RecordTable`]s over one store.
///
/// A table is opened (and its header indexed) the first time its name is
/// requested; later requests return the same instance for the registry's whole
/// lifetime, even if the grid's header has since changed. Build a new registry
/// to pick up schema changes.
///
/// Every `RecordTable` operation is mirrored here with the table name as the
/// first argument.
#[derive(Debug)]
pub struct TableRegistry<S: GridStore> {
    store: Arc<S>,
    tables: HashMap<String, Arc<RecordTable<S>>>,
}

impl<S: GridStore> TableRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            tables: HashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Return the cached table for `name`, opening it on first access.
    pub fn get(&mut self, name: &str) -> TableResult<Arc<RecordTable<S>>> {
        if let Some(table) = self.tables.get(name) {
            log::trace!("table cache hit: {name}");
            return Ok(Arc::clone(table));
        }

        log::debug!("table cache miss: {name}");
        let table = Arc::new(RecordTable::open(Arc::clone(&self.store), name)?);
        self.tables.insert(name.to_string(), Arc::clone(&table));
        Ok(table)
    }

    /// Whether `name` has already been opened by this registry.
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Number of cached tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn insert(&mut self, table: &str, obj: &RecordObject) -> TableResult<usize> {
        self.get(table)?.insert(obj)
    }

    pub fn insert_all(&mut self, table: &str, objs: &[RecordObject]) -> TableResult<usize> {
        self.get(table)?.insert_all(objs)
    }

    pub fn select_by_pk(
        &mut self,
        table: &str,
        pk_column: &str,
        pk_value: impl Into<CellValue>,
    ) -> TableResult<Option<RecordObject>> {
        self.get(table)?.select_by_pk(pk_column, pk_value)
    }

    pub fn select_by_pk_sorted(
        &mut self,
        table: &str,
        pk_column: &str,
        pk_value: impl Into<CellValue>,
        sort: &SortSpec,
    ) -> TableResult<Option<RecordObject>> {
        self.get(table)?.select_by_pk_sorted(pk_column, pk_value, sort)
    }

    pub fn select_by_column(
        &mut self,
        table: &str,
        column: &str,
        value: impl Into<CellValue>,
    ) -> TableResult<Vec<RecordObject>> {
        self.get(table)?.select_by_column(column, value)
    }

    pub fn select_by_column_sorted(
        &mut self,
        table: &str,
        column: &str,
        value: impl Into<CellValue>,
        sort: &SortSpec,
    ) -> TableResult<Vec<RecordObject>> {
        self.get(table)?.select_by_column_sorted(column, value, sort)
    }

    pub fn select_by_columns(
        &mut self,
        table: &str,
        criteria: &Criteria,
    ) -> TableResult<Vec<RecordObject>> {
        self.get(table)?.select_by_columns(criteria)
    }

    pub fn select_by_columns_sorted(
        &mut self,
        table: &str,
        criteria: &Criteria,
        sort: &SortSpec,
    ) -> TableResult<Vec<RecordObject>> {
        self.get(table)?.select_by_columns_sorted(criteria, sort)
    }

    pub fn select_all(&mut self, table: &str) -> TableResult<Vec<RecordObject>> {
        self.get(table)?.select_all()
    }

    pub fn select_all_sorted(
        &mut self,
        table: &str,
        sort: &SortSpec,
    ) -> TableResult<Vec<RecordObject>> {
        self.get(table)?.select_all_sorted(sort)
    }

    pub fn select_max(&mut self, table: &str, column: &str) -> TableResult<Option<f64>> {
        self.get(table)?.select_max(column)
    }

    pub fn select_by_pk_and_increment(
        &mut self,
        table: &str,
        pk_column: &str,
        pk_value: impl Into<CellValue>,
        column: &str,
        increment: f64,
    ) -> TableResult<Option<f64>> {
        self.get(table)?
            .select_by_pk_and_increment(pk_column, pk_value, column, increment)
    }

    pub fn update_by_pk(
        &mut self,
        table: &str,
        pk_column: &str,
        pk_value: impl Into<CellValue>,
        obj: &RecordObject,
    ) -> TableResult<Option<RecordObject>> {
        self.get(table)?.update_by_pk(pk_column, pk_value, obj)
    }

    pub fn update_item_by_pk(
        &mut self,
        table: &str,
        pk_column: &str,
        pk_value: impl Into<CellValue>,
        column: &str,
        value: impl Into<CellValue>,
    ) -> TableResult<Option<RecordObject>> {
        self.get(table)?
            .update_item_by_pk(pk_column, pk_value, column, value)
    }

    pub fn update_item_by_columns(
        &mut self,
        table: &str,
        criteria: &Criteria,
        column: &str,
        value: impl Into<CellValue>,
    ) -> TableResult<Vec<RecordObject>> {
        self.get(table)?
            .update_item_by_columns(criteria, column, value)
    }

    pub fn update_items_by_columns(
        &mut self,
        table: &str,
        criteria: &Criteria,
        patch: &RecordObject,
    ) -> TableResult<Vec<RecordObject>> {
        self.get(table)?.update_items_by_columns(criteria, patch)
    }

    /// Batched cell write against `table`.
    ///
    /// Lookup failures (unknown table) propagate; a rejected batch is `Ok(false)`.
    pub fn update_cells(
        &mut self,
        table: &str,
        cells: &BTreeMap<CellAddress, CellValue>,
    ) -> TableResult<bool> {
        Ok(self.get(table)?.update_cells(cells))
    }
}
