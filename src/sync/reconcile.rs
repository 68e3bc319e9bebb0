/// Header reconciliation between local rows and a remote table
///
/// The remote table may have been created by hand, reordered, or extended
/// with extra columns. Local rows are always written under the remote
/// header as it exists; the remote header is only written when there is
/// none. Cells already in the table are never cleared or rewritten.

use std::collections::HashSet;
use tracing::{info, warn};

use super::table::{is_blank_row, ApiFailureKind, Row, TableClient, TableError};
use super::{SyncError, SyncLayout, SyncReport};

/// Merge `rows` (laid out as `expected`) into the table titled `title`.
///
/// - empty table: header and rows in one bulk write
/// - blank first row: header written into it, then append
/// - same column set: rows reordered to the remote header, then append
/// - otherwise: only the common columns are written, the rest reported
pub fn reconcile_rows<C: TableClient + ?Sized>(
    client: &mut C,
    title: &str,
    expected: &[String],
    rows: &[Row],
) -> Result<SyncReport, SyncError> {
    let (table, existing) = match client.find(title)? {
        Some(table) => {
            let existing = match client.read_all(&table) {
                Ok(existing) => existing,
                Err(TableError::Api {
                    kind: ApiFailureKind::NotFound,
                    detail,
                }) => {
                    warn!("⚠️  '{}' has no readable range, treating it as empty: {}", title, detail);
                    Vec::new()
                }
                Err(err) => {
                    warn!("⚠️  Could not read '{}', nothing written: {}", title, err);
                    return Err(err.into());
                }
            };
            (table, existing)
        }
        None => {
            info!("Table '{}' not found, creating it", title);
            (client.create(title)?, Vec::new())
        }
    };

    let Some(first_row) = existing.first() else {
        let mut all = Vec::with_capacity(rows.len() + 1);
        all.push(expected.to_vec());
        all.extend(rows.iter().cloned());
        client.write_top(&table, &all)?;

        info!("Wrote header and {} rows to empty table '{}'", rows.len(), title);
        return Ok(SyncReport::complete(rows.len(), SyncLayout::FreshTable));
    };

    if is_blank_row(first_row) {
        client.write_top(&table, &[expected.to_vec()])?;
        client.append_rows(&table, rows)?;

        info!("Wrote header into blank first row and appended {} rows to '{}'", rows.len(), title);
        return Ok(SyncReport::complete(rows.len(), SyncLayout::HeaderInserted));
    }

    let header: Vec<&str> = first_row.iter().map(|cell| cell.trim()).collect();
    let remote: HashSet<&str> = header.iter().copied().filter(|h| !h.is_empty()).collect();
    let local: HashSet<&str> = expected.iter().map(String::as_str).collect();

    if remote == local {
        client.append_rows(&table, &project(rows, expected, &header))?;

        info!("Headers match, appended {} rows to '{}'", rows.len(), title);
        return Ok(SyncReport::complete(rows.len(), SyncLayout::HeadersMatched));
    }

    warn!("⚠️  Header mismatch in '{}'", title);
    warn!("  Remote headers: {:?}", header);
    warn!("  Local headers:  {:?}", expected);

    if !header.iter().any(|h| local.contains(h)) {
        return Err(SyncError::NoCommonColumns);
    }

    let unsynced_columns: Vec<String> = expected
        .iter()
        .filter(|column| !remote.contains(column.as_str()))
        .cloned()
        .collect();
    let extra_remote_columns: Vec<String> = header
        .iter()
        .filter(|h| !h.is_empty() && !local.contains(*h))
        .map(|h| h.to_string())
        .collect();

    client.append_rows(&table, &project(rows, expected, &header))?;

    info!(
        "Appended {} rows to '{}' with common columns only; not synced: {:?}",
        rows.len(),
        title,
        unsynced_columns
    );
    Ok(SyncReport {
        rows_written: rows.len(),
        unsynced_columns,
        extra_remote_columns,
        layout: SyncLayout::CommonColumnsOnly,
    })
}

/// Lay each row out under the remote header. Remote columns the rows do not
/// have are left blank; the row stops at the last column it fills.
fn project(rows: &[Row], expected: &[String], header: &[&str]) -> Vec<Row> {
    let sources: Vec<Option<usize>> = header
        .iter()
        .map(|h| expected.iter().position(|column| column == h))
        .collect();
    let width = sources
        .iter()
        .rposition(Option::is_some)
        .map_or(0, |last| last + 1);

    rows.iter()
        .map(|row| {
            sources[..width]
                .iter()
                .map(|source| {
                    source
                        .and_then(|i| row.get(i))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect()
}
