/// In-memory `TableClient` that records every call

use std::collections::BTreeMap;

use super::table::{overlay, Row, TableClient, TableError, TableHandle};

#[derive(Debug, Default)]
pub(crate) struct MemoryClient {
    pub tables: BTreeMap<String, Vec<Row>>,
    pub calls: Vec<&'static str>,
    pub fail_reads: Option<TableError>,
    pub fail_writes: Option<TableError>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, title: &str, rows: Vec<Vec<&str>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(str::to_string).collect())
            .collect();
        self.tables.insert(title.to_string(), rows);
        self
    }

    pub fn rows(&self, title: &str) -> &[Row] {
        self.tables.get(title).map(Vec::as_slice).unwrap_or(&[])
    }

    fn handle(title: &str) -> TableHandle {
        TableHandle {
            id: format!("mem:{}", title),
            title: title.to_string(),
        }
    }

    fn check_write(&self) -> Result<(), TableError> {
        match &self.fail_writes {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl TableClient for MemoryClient {
    fn find(&mut self, title: &str) -> Result<Option<TableHandle>, TableError> {
        self.calls.push("find");
        Ok(self.tables.contains_key(title).then(|| Self::handle(title)))
    }

    fn create(&mut self, title: &str) -> Result<TableHandle, TableError> {
        self.calls.push("create");
        self.tables.insert(title.to_string(), Vec::new());
        Ok(Self::handle(title))
    }

    fn read_all(&mut self, table: &TableHandle) -> Result<Vec<Row>, TableError> {
        self.calls.push("read_all");
        if let Some(err) = &self.fail_reads {
            return Err(err.clone());
        }
        Ok(self.rows(&table.title).to_vec())
    }

    fn write_top(&mut self, table: &TableHandle, rows: &[Row]) -> Result<(), TableError> {
        self.calls.push("write_top");
        self.check_write()?;
        let stored = self.tables.entry(table.title.clone()).or_default();
        for (i, row) in rows.iter().enumerate() {
            match stored.get_mut(i) {
                Some(existing) => *existing = overlay(existing, row),
                None => stored.push(row.clone()),
            }
        }
        Ok(())
    }

    fn append_rows(&mut self, table: &TableHandle, rows: &[Row]) -> Result<(), TableError> {
        self.calls.push("append_rows");
        self.check_write()?;
        self.tables
            .entry(table.title.clone())
            .or_default()
            .extend_from_slice(rows);
        Ok(())
    }
}
