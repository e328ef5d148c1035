#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use formula_sheetdb::store::Result;
use formula_sheetdb::{CellAddress, CellValue, GridStore, InMemoryGridStore, Record, RecordObject};

/// Build a record object from a JSON object literal.
pub fn obj(value: serde_json::Value) -> RecordObject {
    serde_json::from_value(value).expect("record object json")
}

pub fn row(value: serde_json::Value) -> Record {
    serde_json::from_value(value).expect("record json")
}

/// `Orders(id, customer, qty)` seeded with three rows.
pub fn orders_store() -> Arc<InMemoryGridStore> {
    let store = InMemoryGridStore::new();
    store
        .create_grid("Orders", ["id", "customer", "qty"])
        .expect("create grid");
    for r in [
        serde_json::json!([1, "ada", 3]),
        serde_json::json!([2, "grace", ""]),
        serde_json::json!([3, "ada", 10]),
    ] {
        store.push_row("Orders", row(r)).expect("seed row");
    }
    Arc::new(store)
}

/// Wraps an [`InMemoryGridStore`] and records which write paths were used.
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub inner: InMemoryGridStore,
    calls: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl GridStore for RecordingStore {
    type Grid = String;

    fn resolve_table(&self, name: &str) -> Result<String> {
        self.inner.resolve_table(name)
    }

    fn read_header_row(&self, grid: &String) -> Result<Vec<CellValue>> {
        self.record("read_header_row".to_string());
        self.inner.read_header_row(grid)
    }

    fn read_all_data_rows(&self, grid: &String) -> Result<Vec<Record>> {
        self.record("read_all_data_rows".to_string());
        self.inner.read_all_data_rows(grid)
    }

    fn append_row(&self, grid: &String, record: &[CellValue]) -> Result<()> {
        self.record("append_row".to_string());
        self.inner.append_row(grid, record)
    }

    fn write_row_block(&self, grid: &String, start_row: u32, records: &[Record]) -> Result<()> {
        self.record(format!("write_row_block({start_row}, {})", records.len()));
        self.inner.write_row_block(grid, start_row, records)
    }

    fn write_row(&self, grid: &String, row: u32, record: &[CellValue]) -> Result<()> {
        self.record(format!("write_row({row})"));
        self.inner.write_row(grid, row, record)
    }

    fn write_cell(&self, grid: &String, row: u32, col: u32, value: &CellValue) -> Result<()> {
        self.record(format!("write_cell({row}, {col})"));
        self.inner.write_cell(grid, row, col, value)
    }

    fn batch_write_cells(
        &self,
        grid: &String,
        cells: &BTreeMap<CellAddress, CellValue>,
    ) -> Result<()> {
        self.record(format!("batch_write_cells({})", cells.len()));
        self.inner.batch_write_cells(grid, cells)
    }
}
