use rusqlite::Connection;

pub(crate) fn init(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS grids (
          id INTEGER PRIMARY KEY,
          name TEXT NOT NULL UNIQUE
        );

        -- Sparse cell storage: empty cells have no row here.
        CREATE TABLE IF NOT EXISTS grid_cells (
          grid_id INTEGER NOT NULL REFERENCES grids(id),
          row INTEGER NOT NULL,
          col INTEGER NOT NULL,
          value TEXT NOT NULL,
          PRIMARY KEY (grid_id, row, col)
        );

        CREATE INDEX IF NOT EXISTS idx_grid_cells_row ON grid_cells(grid_id, row);
        "#,
    )?;

    Ok(())
}
