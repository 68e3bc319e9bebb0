/// Saved annotation rows for the current session
///
/// Records are immutable once built and live only in memory. The store is
/// append-only until it is cleared, either by the user or after a sync.
/// Records kept after a partial sync stay visible but are never handed out
/// for syncing again.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::form::{ValidatedForm, DATE_FORMAT};

/// Canonical column order of an annotation row
pub const COLUMNS: [&str; 12] = [
    "Start Filename",
    "End Filename",
    "Site",
    "Camera",
    "Retrieval Date",
    "Type",
    "Species",
    "Behavior",
    "Sequence Start Time",
    "Sequence End Time",
    "Is Single Image",
    "Reviewer Name",
];

/// Optional trailing column
pub const NOTES_COLUMN: &str = "Notes";

/// Text form of a boolean cell. Sheets would otherwise coerce native booleans.
pub fn bool_cell(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// One saved observation: a marked sequence (or single image) plus its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    start_filename: String,
    end_filename: String,
    metadata: ValidatedForm,
    sequence_start_time: String,
    sequence_end_time: String,
    is_single_image: bool,
}

impl AnnotationRecord {
    /// Only the marking engine builds records, after validation
    pub(crate) fn new(
        start_filename: String,
        end_filename: String,
        metadata: ValidatedForm,
        sequence_start_time: String,
        sequence_end_time: String,
        is_single_image: bool,
    ) -> Self {
        Self {
            start_filename,
            end_filename,
            metadata,
            sequence_start_time,
            sequence_end_time,
            is_single_image,
        }
    }

    pub fn start_filename(&self) -> &str {
        &self.start_filename
    }

    pub fn end_filename(&self) -> &str {
        &self.end_filename
    }

    pub fn metadata(&self) -> &ValidatedForm {
        &self.metadata
    }

    pub fn sequence_start_time(&self) -> &str {
        &self.sequence_start_time
    }

    pub fn sequence_end_time(&self) -> &str {
        &self.sequence_end_time
    }

    pub fn is_single_image(&self) -> bool {
        self.is_single_image
    }

    /// "Single Image" or "Sequence", for the saved annotations table
    pub fn kind_label(&self) -> &'static str {
        if self.is_single_image {
            "Single Image"
        } else {
            "Sequence"
        }
    }
}

/// Which columns a record is exported with
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RecordSchema {
    /// Append the free-text Notes column after the canonical ones
    pub include_notes: bool,
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            include_notes: true,
        }
    }
}

impl RecordSchema {
    /// Column names in canonical order
    pub fn headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
        if self.include_notes {
            headers.push(NOTES_COLUMN.to_string());
        }
        headers
    }

    /// A record as text cells, aligned with `headers()`
    pub fn row(&self, record: &AnnotationRecord) -> Vec<String> {
        let meta = record.metadata();
        let mut row = vec![
            record.start_filename().to_string(),
            record.end_filename().to_string(),
            meta.site.clone(),
            meta.camera.clone(),
            meta.retrieval_date.format(DATE_FORMAT).to_string(),
            meta.observation_type.to_string(),
            meta.species.clone(),
            meta.behavior.clone(),
            record.sequence_start_time().to_string(),
            record.sequence_end_time().to_string(),
            bool_cell(record.is_single_image()).to_string(),
            meta.reviewer_name.clone(),
        ];
        if self.include_notes {
            row.push(meta.notes.clone());
        }
        row
    }

    pub fn rows(&self, records: &[AnnotationRecord]) -> Vec<Vec<String>> {
        records.iter().map(|record| self.row(record)).collect()
    }
}

/// Returned by `append` while a sync holds the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("the record store is locked by an outstanding sync")]
pub struct StoreLocked;

/// Ordered records of the current session (insertion order = save order)
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<AnnotationRecord>,
    /// Records before this index were already written remotely
    synced: usize,
    locked: bool,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: AnnotationRecord) -> Result<(), StoreLocked> {
        if self.locked {
            return Err(StoreLocked);
        }
        self.records.push(record);
        Ok(())
    }

    pub fn all(&self) -> &[AnnotationRecord] {
        &self.records
    }

    /// Records not written remotely yet
    pub fn pending(&self) -> &[AnnotationRecord] {
        &self.records[self.synced..]
    }

    /// Keep every current record locally but never sync it again
    pub fn mark_synced(&mut self) {
        self.synced = self.records.len();
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.synced = 0;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hold the store for the duration of a sync
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

#[cfg(test)]
pub(crate) fn sample_record(start: &str, end: &str, single: bool) -> AnnotationRecord {
    use super::form::ObservationType;
    use chrono::NaiveDate;

    AnnotationRecord::new(
        start.to_string(),
        end.to_string(),
        ValidatedForm {
            site: "Location 1".to_string(),
            camera: "CAM002".to_string(),
            retrieval_date: NaiveDate::from_ymd_opt(2024, 4, 9).unwrap(),
            observation_type: ObservationType::Seabird,
            species: "Brown Booby (Sula leucogaster)".to_string(),
            behavior: "Resting".to_string(),
            reviewer_name: "Noe".to_string(),
            notes: "windy".to_string(),
        },
        "2024-04-01 06:00:00".to_string(),
        "2024-04-01 06:05:00".to_string(),
        single,
    )
}
