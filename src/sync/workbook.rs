use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::Path;
use tracing::info;

use super::table::{overlay, Row, TableClient, TableError, TableHandle};

/// A local SQLite file standing in for a spreadsheet service.
///
/// Each titled table is a row in `sheets`; its cells are stored one JSON
/// array per row in `sheet_rows`, ordered by `position`. Useful offline and
/// for field laptops without Google credentials. Rows are only ever
/// appended or overwritten in place, so positions stay contiguous from 0.
pub struct WorkbookClient {
    conn: Connection,
}

impl WorkbookClient {
    /// Open or create the workbook at `path`
    pub fn open(path: &Path) -> Result<Self, TableError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TableError::Unexpected(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path).map_err(sql_error)?;
        info!("📁 Workbook opened at: {}", path.display());

        let client = Self { conn };
        client.init_schema().map_err(sql_error)?;
        Ok(client)
    }

    #[cfg(test)]
    fn in_memory() -> Result<Self, TableError> {
        let conn = Connection::open_in_memory().map_err(sql_error)?;
        let client = Self { conn };
        client.init_schema().map_err(sql_error)?;
        Ok(client)
    }

    fn init_schema(&self) -> SqlResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sheets (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL UNIQUE,
                created_at  TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sheet_rows (
                sheet_id    INTEGER NOT NULL,
                position    INTEGER NOT NULL,
                cells_json  TEXT NOT NULL,
                PRIMARY KEY (sheet_id, position),
                FOREIGN KEY(sheet_id) REFERENCES sheets(id) ON DELETE CASCADE
            );",
        )
    }

    fn sheet_id(table: &TableHandle) -> Result<i64, TableError> {
        table
            .id
            .parse()
            .map_err(|_| TableError::Unexpected(format!("Invalid workbook table id '{}'", table.id)))
    }

    fn insert_rows(
        tx: &rusqlite::Transaction<'_>,
        sheet_id: i64,
        first_position: i64,
        rows: &[Row],
    ) -> Result<(), TableError> {
        let mut stmt = tx
            .prepare("INSERT INTO sheet_rows (sheet_id, position, cells_json) VALUES (?1, ?2, ?3)")
            .map_err(sql_error)?;

        for (offset, row) in rows.iter().enumerate() {
            let cells = encode_row(row)?;
            stmt.execute(params![sheet_id, first_position + offset as i64, cells])
                .map_err(sql_error)?;
        }
        Ok(())
    }
}

fn sql_error(err: rusqlite::Error) -> TableError {
    TableError::Unexpected(format!("Workbook error: {}", err))
}

fn encode_row(row: &[String]) -> Result<String, TableError> {
    serde_json::to_string(row).map_err(|e| TableError::Unexpected(format!("Cannot encode row: {}", e)))
}

fn decode_row(cells: &str) -> Result<Row, TableError> {
    serde_json::from_str(cells)
        .map_err(|e| TableError::Unexpected(format!("Corrupt workbook row: {}", e)))
}

impl TableClient for WorkbookClient {
    fn find(&mut self, title: &str) -> Result<Option<TableHandle>, TableError> {
        let id: Option<i64> = self
            .conn
            .query_row("SELECT id FROM sheets WHERE title = ?1", [title], |row| row.get(0))
            .optional()
            .map_err(sql_error)?;

        Ok(id.map(|id| TableHandle {
            id: id.to_string(),
            title: title.to_string(),
        }))
    }

    fn create(&mut self, title: &str) -> Result<TableHandle, TableError> {
        let now = chrono::Local::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO sheets (title, created_at) VALUES (?1, ?2)",
                params![title, now],
            )
            .map_err(sql_error)?;

        Ok(TableHandle {
            id: self.conn.last_insert_rowid().to_string(),
            title: title.to_string(),
        })
    }

    fn read_all(&mut self, table: &TableHandle) -> Result<Vec<Row>, TableError> {
        let sheet_id = Self::sheet_id(table)?;
        let mut stmt = self
            .conn
            .prepare("SELECT cells_json FROM sheet_rows WHERE sheet_id = ?1 ORDER BY position")
            .map_err(sql_error)?;

        let encoded: Vec<String> = stmt
            .query_map([sheet_id], |row| row.get(0))
            .map_err(sql_error)?
            .collect::<SqlResult<_>>()
            .map_err(sql_error)?;

        encoded.iter().map(|cells| decode_row(cells)).collect()
    }

    fn write_top(&mut self, table: &TableHandle, rows: &[Row]) -> Result<(), TableError> {
        let sheet_id = Self::sheet_id(table)?;
        let tx = self.conn.transaction().map_err(sql_error)?;

        {
            let mut current = tx
                .prepare("SELECT cells_json FROM sheet_rows WHERE sheet_id = ?1 AND position = ?2")
                .map_err(sql_error)?;
            let mut upsert = tx
                .prepare(
                    "INSERT OR REPLACE INTO sheet_rows (sheet_id, position, cells_json)
                     VALUES (?1, ?2, ?3)",
                )
                .map_err(sql_error)?;

            for (position, row) in rows.iter().enumerate() {
                let position = position as i64;
                let existing: Option<String> = current
                    .query_row(params![sheet_id, position], |r| r.get(0))
                    .optional()
                    .map_err(sql_error)?;
                let existing = match existing {
                    Some(cells) => decode_row(&cells)?,
                    None => Vec::new(),
                };

                let cells = encode_row(&overlay(&existing, row))?;
                upsert
                    .execute(params![sheet_id, position, cells])
                    .map_err(sql_error)?;
            }
        }

        tx.commit().map_err(sql_error)
    }

    fn append_rows(&mut self, table: &TableHandle, rows: &[Row]) -> Result<(), TableError> {
        let sheet_id = Self::sheet_id(table)?;
        let tx = self.conn.transaction().map_err(sql_error)?;

        let next: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM sheet_rows WHERE sheet_id = ?1",
                [sheet_id],
                |row| row.get(0),
            )
            .map_err(sql_error)?;
        Self::insert_rows(&tx, sheet_id, next, rows)?;

        tx.commit().map_err(sql_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_find_does_not_create() {
        let mut workbook = WorkbookClient::in_memory().unwrap();

        assert_eq!(workbook.find("Seabird Camera Assignments").unwrap(), None);
        let created = workbook.create("Seabird Camera Assignments").unwrap();
        assert_eq!(workbook.find("Seabird Camera Assignments").unwrap(), Some(created));
    }

    #[test]
    fn test_write_top_overlays_and_append_extends() {
        let mut workbook = WorkbookClient::in_memory().unwrap();
        let table = workbook.create("Bird monitoring data").unwrap();

        workbook
            .write_top(&table, &[row(&["A", "B"]), row(&["1", "2"])])
            .unwrap();
        workbook.write_top(&table, &[row(&["C"])]).unwrap();
        workbook
            .append_rows(&table, &[row(&["3"]), row(&["4", "with \"quotes\""])])
            .unwrap();

        assert_eq!(
            workbook.read_all(&table).unwrap(),
            vec![
                row(&["C", "B"]),
                row(&["1", "2"]),
                row(&["3"]),
                row(&["4", "with \"quotes\""])
            ]
        );
    }

    #[test]
    fn test_tables_are_separate() {
        let mut workbook = WorkbookClient::in_memory().unwrap();
        let first = workbook.create("first").unwrap();
        let second = workbook.create("second").unwrap();

        workbook.append_rows(&first, &[row(&["x"])]).unwrap();

        assert_eq!(workbook.read_all(&first).unwrap().len(), 1);
        assert!(workbook.read_all(&second).unwrap().is_empty());
    }

    #[test]
    fn test_workbook_persists_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("workbook.db");

        {
            let mut workbook = WorkbookClient::open(&path).unwrap();
            let table = workbook.create("t").unwrap();
            workbook.append_rows(&table, &[row(&["kept"])]).unwrap();
        }

        let mut workbook = WorkbookClient::open(&path).unwrap();
        let table = workbook.find("t").unwrap().unwrap();
        assert_eq!(workbook.read_all(&table).unwrap(), vec![row(&["kept"])]);
    }
}
