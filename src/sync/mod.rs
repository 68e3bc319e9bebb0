/// Remote table synchronization
///
/// This module handles:
/// - The capability-based table client and its errors (table.rs)
/// - Merging local rows under an existing remote header (reconcile.rs)
/// - Backends: Google Sheets over REST (sheets.rs) and a SQLite workbook (workbook.rs)
/// - Reading the reviewer assignment roster (roster.rs)

pub mod reconcile;
pub mod roster;
pub mod sheets;
pub mod table;
pub mod workbook;

#[cfg(test)]
pub(crate) mod memory;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};

use crate::state::records::{AnnotationRecord, RecordSchema};
pub use reconcile::reconcile_rows;
use sheets::SheetsClient;
pub use table::{ApiFailureKind, TableClient, TableError};
use workbook::WorkbookClient;

/// Which branch of the reconciliation wrote the rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncLayout {
    /// The table had no rows; header and rows were written together
    FreshTable,
    /// The first row was blank; the header was written into it
    HeaderInserted,
    /// Same column set, rows reordered to the remote header
    HeadersMatched,
    /// Only columns present on both sides were written
    CommonColumnsOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub rows_written: usize,
    /// Local columns the remote table does not have
    pub unsynced_columns: Vec<String>,
    /// Remote columns left blank in the appended rows
    pub extra_remote_columns: Vec<String>,
    pub layout: SyncLayout,
}

impl SyncReport {
    pub fn complete(rows_written: usize, layout: SyncLayout) -> Self {
        Self {
            rows_written,
            unsynced_columns: Vec::new(),
            extra_remote_columns: Vec::new(),
            layout,
        }
    }

    /// Rows were written but some local columns were dropped
    pub fn is_partial(&self) -> bool {
        self.layout == SyncLayout::CommonColumnsOnly
    }

    /// Status line for the user
    pub fn summary(&self) -> String {
        if self.is_partial() {
            format!(
                "Synced {} annotations with a header mismatch. Columns not synced: {}",
                self.rows_written,
                self.unsynced_columns.join(", ")
            )
        } else {
            format!("Successfully synced {} annotations!", self.rows_written)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("No annotations to sync")]
    NothingToSync,

    #[error("Sync failed: credentials file missing ('{}')", .path.display())]
    CredentialsMissing { path: PathBuf },

    #[error("{}", remote_api_message(.kind, .detail))]
    RemoteApi { kind: ApiFailureKind, detail: String },

    #[error("Sync failed: no matching columns between the annotations and the remote table")]
    NoCommonColumns,

    #[error("Sync failed: unexpected error ({detail})")]
    Unexpected { detail: String },

    #[error("A sync is already in progress")]
    AlreadyInProgress,
}

fn remote_api_message(kind: &ApiFailureKind, detail: &str) -> String {
    match kind {
        ApiFailureKind::PermissionDenied => {
            "Sync failed: Permission denied. Check sharing settings and account permissions."
                .to_string()
        }
        ApiFailureKind::QuotaExceeded => {
            "Sync failed: API quota exceeded. Wait and try again later.".to_string()
        }
        _ => format!(
            "Sync failed: remote API error. Check permissions/quotas. Details: {}...",
            detail.chars().take(100).collect::<String>()
        ),
    }
}

impl From<TableError> for SyncError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::Api { kind, detail } => SyncError::RemoteApi { kind, detail },
            TableError::Unexpected(detail) => SyncError::Unexpected { detail },
        }
    }
}

/// What happens to local state after a sync that wrote rows
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SyncPolicy {
    /// Clear the records even when some columns could not be synced
    pub clear_after_partial_sync: bool,
    /// Drop the image set together with the synced records
    pub reset_images_after_sync: bool,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            clear_after_partial_sync: true,
            reset_images_after_sync: true,
        }
    }
}

/// Where remote tables live
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backend {
    /// Google Sheets, authorized with a bearer token read from a JSON file
    Sheets { credentials_path: PathBuf },
    /// Local SQLite file holding one table per title
    Workbook { path: PathBuf },
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Sheets {
            credentials_path: PathBuf::from("credentials.json"),
        }
    }
}

impl Backend {
    /// Build a client. Credentials are checked here, before any network call.
    pub fn connect(&self) -> Result<Box<dyn TableClient + Send>, SyncError> {
        match self {
            Backend::Sheets { credentials_path } => {
                let client = SheetsClient::from_credentials_file(credentials_path)?;
                Ok(Box::new(client))
            }
            Backend::Workbook { path } => {
                let client = WorkbookClient::open(path)?;
                Ok(Box::new(client))
            }
        }
    }
}

/// Serialize the records with `schema` and merge them into `title`
pub fn sync_records<C: TableClient + ?Sized>(
    client: &mut C,
    title: &str,
    schema: &RecordSchema,
    records: &[AnnotationRecord],
) -> Result<SyncReport, SyncError> {
    if records.is_empty() {
        return Err(SyncError::NothingToSync);
    }

    info!("🔄 Syncing {} annotations to '{}'", records.len(), title);
    let result = reconcile_rows(client, title, &schema.headers(), &schema.rows(records));

    if let Err(err) = &result {
        error!("❌ Sync to '{}' failed: {}", title, err);
    }
    result
}

/// Connect `backend` and sync. Nothing is contacted when there are no records.
pub fn run_sync(
    backend: &Backend,
    title: &str,
    schema: &RecordSchema,
    records: &[AnnotationRecord],
) -> Result<SyncReport, SyncError> {
    if records.is_empty() {
        return Err(SyncError::NothingToSync);
    }

    let mut client = backend.connect().map_err(|err| {
        error!("❌ Could not connect to the remote store: {}", err);
        err
    })?;
    sync_records(&mut client, title, schema, records)
}
