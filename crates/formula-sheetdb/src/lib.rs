//! Row-store access to header-labeled sheets.
//!
//! A grid whose first row names its columns is treated as a table of records:
//! callers insert, select, sort, increment and update rows by column name
//! instead of by cell coordinates. This crate exposes:
//! - [`ColumnIndex`] and the [`codec`] between name-keyed and positional rows
//! - criteria matching and sorting ([`Criteria`], [`SortSpec`])
//! - [`RecordTable`], the per-grid engine
//! - [`TableRegistry`], a lazily populated cache of tables by name
//! - the [`GridStore`] seam with in-memory and SQLite backends
//!
//! Nothing here locks across a read and the write that follows it. Callers that
//! share a grid with other writers must serialize access themselves.

pub mod address;
pub mod codec;
mod column_index;
mod error;
mod query;
mod registry;
pub mod store;
mod table;
mod value;

pub use address::{A1ParseError, CellAddress, MAX_COLS, MAX_ROWS};
pub use codec::RecordObject;
pub use column_index::ColumnIndex;
pub use error::{TableError, TableResult};
pub use query::{compare_cells, sort_records, Criteria, SortOrder, SortSpec};
pub use registry::TableRegistry;
pub use store::{
    GridError, GridStore, InMemoryGridStore, Record, SqliteGrid, SqliteGridStore,
    SqliteGridStoreConfig,
};
pub use table::RecordTable;
pub use value::{values_match, CellValue};
