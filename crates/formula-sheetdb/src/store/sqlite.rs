use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use super::{check_address, check_block, check_row, schema, GridError, GridStore, Record, Result};
use crate::address::{CellAddress, DATA_ROW_OFFSET, HEADER_ROW};
use crate::value::CellValue;

#[derive(Debug, Clone)]
pub struct SqliteGridStoreConfig {
    /// How long a connection waits on a locked database (default: 5s).
    pub busy_timeout: Duration,
}

impl Default for SqliteGridStoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle to a grid persisted in a [`SqliteGridStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteGrid {
    id: i64,
    name: String,
}

impl SqliteGrid {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Grids persisted in SQLite.
///
/// Cells are stored sparsely as JSON-encoded [`CellValue`]s; writing the empty
/// sentinel deletes the cell. Multi-cell writes (`write_row_block`,
/// `batch_write_cells`) run inside a single transaction.
#[derive(Debug, Clone)]
pub struct SqliteGridStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGridStore {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_path_with_config(path, &SqliteGridStoreConfig::default())
    }

    pub fn open_path_with_config(
        path: impl AsRef<Path>,
        config: &SqliteGridStoreConfig,
    ) -> Result<Self> {
        Self::from_connection(Connection::open(path)?, config)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(
            Connection::open_in_memory()?,
            &SqliteGridStoreConfig::default(),
        )
    }

    pub fn open_uri(uri: &str) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI;
        Self::from_connection(
            Connection::open_with_flags(uri, flags)?,
            &SqliteGridStoreConfig::default(),
        )
    }

    fn from_connection(conn: Connection, config: &SqliteGridStoreConfig) -> Result<Self> {
        conn.busy_timeout(config.busy_timeout)?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create a grid whose first row is `header`.
    pub fn create_grid<I, S>(&self, name: &str, header: I) -> Result<SqliteGrid>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut conn = self.lock();
        if find_grid(&conn, name)?.is_some() {
            return Err(GridError::DuplicateGrid(name.to_string()));
        }

        let tx = conn.transaction()?;
        tx.execute("INSERT INTO grids (name) VALUES (?1)", params![name])?;
        let grid = SqliteGrid {
            id: tx.last_insert_rowid(),
            name: name.to_string(),
        };
        write_header(&tx, grid.id, header)?;
        tx.commit()?;
        Ok(grid)
    }

    /// Replace the header row of an existing grid.
    pub fn set_header<I, S>(&self, name: &str, header: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut conn = self.lock();
        let grid = find_grid(&conn, name)?.ok_or_else(|| GridError::GridNotFound(name.to_string()))?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM grid_cells WHERE grid_id = ?1 AND row = ?2",
            params![grid.id, i64::from(HEADER_ROW)],
        )?;
        write_header(&tx, grid.id, header)?;
        tx.commit()?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn find_grid(conn: &Connection, name: &str) -> Result<Option<SqliteGrid>> {
    let id = conn
        .query_row(
            "SELECT id FROM grids WHERE name = ?1",
            params![name],
            |r| r.get::<_, i64>(0),
        )
        .optional()?;
    Ok(id.map(|id| SqliteGrid {
        id,
        name: name.to_string(),
    }))
}

fn write_header<I, S>(conn: &Connection, grid_id: i64, header: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for (idx, name) in header.into_iter().enumerate() {
        put_cell(
            conn,
            grid_id,
            HEADER_ROW,
            idx as u32 + 1,
            &CellValue::from(Into::<String>::into(name)),
        )?;
    }
    Ok(())
}

fn put_cell(conn: &Connection, grid_id: i64, row: u32, col: u32, value: &CellValue) -> Result<()> {
    check_address(row, col)?;
    if value.is_empty() {
        conn.execute(
            "DELETE FROM grid_cells WHERE grid_id = ?1 AND row = ?2 AND col = ?3",
            params![grid_id, i64::from(row), i64::from(col)],
        )?;
    } else {
        conn.execute(
            r#"
            INSERT INTO grid_cells (grid_id, row, col, value) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(grid_id, row, col) DO UPDATE SET value = excluded.value
            "#,
            params![
                grid_id,
                i64::from(row),
                i64::from(col),
                serde_json::to_string(value)?
            ],
        )?;
    }
    Ok(())
}

fn put_row(conn: &Connection, grid_id: i64, row: u32, record: &[CellValue]) -> Result<()> {
    for (idx, value) in record.iter().enumerate() {
        put_cell(conn, grid_id, row, idx as u32 + 1, value)?;
    }
    Ok(())
}

fn last_used_row(conn: &Connection, grid_id: i64) -> Result<u32> {
    let last: i64 = conn.query_row(
        "SELECT COALESCE(MAX(row), 0) FROM grid_cells WHERE grid_id = ?1",
        params![grid_id],
        |r| r.get(0),
    )?;
    Ok(last as u32)
}

/// Dense rows `first_row..=last_row`, each `width` cells wide.
fn read_rows(conn: &Connection, grid_id: i64, first_row: u32, last_row: u32) -> Result<Vec<Record>> {
    if last_row < first_row {
        return Ok(Vec::new());
    }
    let width: i64 = conn.query_row(
        "SELECT COALESCE(MAX(col), 0) FROM grid_cells WHERE grid_id = ?1",
        params![grid_id],
        |r| r.get(0),
    )?;

    let mut stmt = conn.prepare(
        r#"
        SELECT row, col, value
        FROM grid_cells
        WHERE grid_id = ?1 AND row >= ?2 AND row <= ?3
        "#,
    )?;
    let cells = stmt.query_map(
        params![grid_id, i64::from(first_row), i64::from(last_row)],
        |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?, r.get::<_, String>(2)?)),
    )?;

    let mut rows = vec![vec![CellValue::Empty; width as usize]; (last_row - first_row + 1) as usize];
    for cell in cells {
        let (row, col, json) = cell?;
        rows[(row - i64::from(first_row)) as usize][(col - 1) as usize] = serde_json::from_str(&json)?;
    }
    Ok(rows)
}

impl GridStore for SqliteGridStore {
    type Grid = SqliteGrid;

    fn resolve_table(&self, name: &str) -> Result<SqliteGrid> {
        let conn = self.lock();
        find_grid(&conn, name)?.ok_or_else(|| GridError::GridNotFound(name.to_string()))
    }

    fn read_header_row(&self, grid: &SqliteGrid) -> Result<Vec<CellValue>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT col, value FROM grid_cells WHERE grid_id = ?1 AND row = ?2 ORDER BY col",
        )?;
        let cells = stmt.query_map(params![grid.id, i64::from(HEADER_ROW)], |r| {
            Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?))
        })?;

        let mut header = Vec::new();
        for cell in cells {
            let (col, json) = cell?;
            header.resize(col as usize, CellValue::Empty);
            header[(col - 1) as usize] = serde_json::from_str(&json)?;
        }
        Ok(header)
    }

    fn read_all_data_rows(&self, grid: &SqliteGrid) -> Result<Vec<Record>> {
        let conn = self.lock();
        let last = last_used_row(&conn, grid.id)?;
        read_rows(&conn, grid.id, DATA_ROW_OFFSET, last)
    }

    fn append_row(&self, grid: &SqliteGrid, record: &[CellValue]) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let next = last_used_row(&tx, grid.id)? + 1;
        put_row(&tx, grid.id, next, record)?;
        tx.commit()?;
        Ok(())
    }

    fn write_row_block(&self, grid: &SqliteGrid, start_row: u32, records: &[Record]) -> Result<()> {
        check_block(start_row, records)?;
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        for (offset, record) in records.iter().enumerate() {
            put_row(&tx, grid.id, start_row + offset as u32, record)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn write_row(&self, grid: &SqliteGrid, row: u32, record: &[CellValue]) -> Result<()> {
        check_row(row, record)?;
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        put_row(&tx, grid.id, row, record)?;
        tx.commit()?;
        Ok(())
    }

    fn write_cell(&self, grid: &SqliteGrid, row: u32, col: u32, value: &CellValue) -> Result<()> {
        let conn = self.lock();
        put_cell(&conn, grid.id, row, col, value)
    }

    fn batch_write_cells(
        &self,
        grid: &SqliteGrid,
        cells: &BTreeMap<CellAddress, CellValue>,
    ) -> Result<()> {
        let mut conn = self.lock();
        // Dropping the transaction without commit rolls back any partial batch.
        let tx = conn.transaction()?;
        for (addr, value) in cells {
            put_cell(&tx, grid.id, addr.row, addr.col, value)?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::MAX_COLS;
    use pretty_assertions::assert_eq;

    #[test]
    fn sparse_rows_read_back_dense() {
        let store = SqliteGridStore::open_in_memory().unwrap();
        let grid = store.create_grid("People", ["id", "name", "age"]).unwrap();
        store
            .write_row(&grid, 3, &[CellValue::from(2), CellValue::Empty, CellValue::from(40)])
            .unwrap();

        assert_eq!(
            store.read_header_row(&grid).unwrap(),
            vec![
                CellValue::from("id"),
                CellValue::from("name"),
                CellValue::from("age"),
            ]
        );
        assert_eq!(
            store.read_all_data_rows(&grid).unwrap(),
            vec![
                vec![CellValue::Empty; 3],
                vec![CellValue::from(2), CellValue::Empty, CellValue::from(40)],
            ]
        );
    }

    #[test]
    fn failed_batch_rolls_back() {
        let store = SqliteGridStore::open_in_memory().unwrap();
        let grid = store.create_grid("T", ["a"]).unwrap();
        let mut cells = BTreeMap::new();
        cells.insert(CellAddress::new(2, 1), CellValue::from("ok"));
        cells.insert(CellAddress::new(3, 0), CellValue::from("bad"));

        assert!(matches!(
            store.batch_write_cells(&grid, &cells),
            Err(GridError::InvalidAddress { row: 3, col: 0 })
        ));
        assert!(store.read_all_data_rows(&grid).unwrap().is_empty());
    }

    #[test]
    fn out_of_range_cells_are_never_stored() {
        let store = SqliteGridStore::open_in_memory().unwrap();
        let grid = store.create_grid("T", ["a"]).unwrap();
        let mut cells = BTreeMap::new();
        cells.insert(CellAddress::new(2, 1), CellValue::from("ok"));
        cells.insert(CellAddress::new(4_000_000_000, 1), CellValue::from("far"));

        assert!(matches!(
            store.batch_write_cells(&grid, &cells),
            Err(GridError::InvalidAddress { row: 4_000_000_000, .. })
        ));
        assert!(store
            .write_cell(&grid, 2, MAX_COLS + 1, &CellValue::from(1))
            .is_err());
        assert!(store.read_all_data_rows(&grid).unwrap().is_empty());
        assert_eq!(store.read_header_row(&grid).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_grid_names_are_rejected() {
        let store = SqliteGridStore::open_in_memory().unwrap();
        store.create_grid("T", ["a"]).unwrap();
        assert!(matches!(
            store.create_grid("T", ["b"]),
            Err(GridError::DuplicateGrid(_))
        ));
        assert!(matches!(
            store.resolve_table("Nope"),
            Err(GridError::GridNotFound(_))
        ));
    }
}
