/// Capability-based access to a remote table
///
/// A remote table is a grid of text cells addressed by title. Backends only
/// need to find, create, read, write over the top rows and append; the
/// reconciliation logic is written against this trait. No capability ever
/// removes cells that are already there.

use thiserror::Error;

/// One row of text cells
pub type Row = Vec<String>;

/// Classification of a failed remote call, used for user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFailureKind {
    PermissionDenied,
    QuotaExceeded,
    NotFound,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("remote API error ({kind:?}): {detail}")]
    Api { kind: ApiFailureKind, detail: String },

    #[error("{0}")]
    Unexpected(String),
}

impl TableError {
    pub fn api(kind: ApiFailureKind, detail: impl Into<String>) -> Self {
        TableError::Api {
            kind,
            detail: detail.into(),
        }
    }
}

/// Opaque handle returned by `find`/`create`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    pub id: String,
    pub title: String,
}

pub trait TableClient {
    /// Look a table up by title without creating it
    fn find(&mut self, title: &str) -> Result<Option<TableHandle>, TableError>;

    /// Create an empty table
    fn create(&mut self, title: &str) -> Result<TableHandle, TableError>;

    /// Every row, header included, in order
    fn read_all(&mut self, table: &TableHandle) -> Result<Vec<Row>, TableError>;

    /// Overwrite cells starting at the first row and column. Cells past the
    /// end of each given row, and rows below the given ones, keep their values.
    fn write_top(&mut self, table: &TableHandle, rows: &[Row]) -> Result<(), TableError>;

    /// Add rows after the last one
    fn append_rows(&mut self, table: &TableHandle, rows: &[Row]) -> Result<(), TableError>;
}

impl<T: TableClient + ?Sized> TableClient for Box<T> {
    fn find(&mut self, title: &str) -> Result<Option<TableHandle>, TableError> {
        (**self).find(title)
    }

    fn create(&mut self, title: &str) -> Result<TableHandle, TableError> {
        (**self).create(title)
    }

    fn read_all(&mut self, table: &TableHandle) -> Result<Vec<Row>, TableError> {
        (**self).read_all(table)
    }

    fn write_top(&mut self, table: &TableHandle, rows: &[Row]) -> Result<(), TableError> {
        (**self).write_top(table, rows)
    }

    fn append_rows(&mut self, table: &TableHandle, rows: &[Row]) -> Result<(), TableError> {
        (**self).append_rows(table, rows)
    }
}

/// A row counts as empty when every cell is blank
pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// `written` laid over `existing` the way `write_top` lays a row over the
/// one already in place
pub fn overlay(existing: &[String], written: &[String]) -> Row {
    let mut row = written.to_vec();
    if existing.len() > written.len() {
        row.extend_from_slice(&existing[written.len()..]);
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_overlay_keeps_cells_past_the_written_ones() {
        assert_eq!(overlay(&row(&["", "", "=SUM(A:A)"]), &row(&["A", "B"])), row(&["A", "B", "=SUM(A:A)"]));
        assert_eq!(overlay(&row(&["x"]), &row(&["A", "B"])), row(&["A", "B"]));
        assert_eq!(overlay(&[], &row(&["A"])), row(&["A"]));
    }

    #[test]
    fn test_blank_rows() {
        assert!(is_blank_row(&row(&["", "  "])));
        assert!(is_blank_row(&[]));
        assert!(!is_blank_row(&row(&["", "x"])));
    }
}
