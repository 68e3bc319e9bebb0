/// One annotation session
///
/// Owns the image set, the marks, the saved records and the capture-time
/// source, and routes every user command through them so the invariants
/// between them (marks reset when the set changes, store locked while a
/// sync is outstanding) hold in one place.

use tracing::{info, warn};

use super::cursor::ImageSet;
use super::data::ImageRef;
use super::form::AnnotationForm;
use super::marks::{ActionRejected, MarkEngine, MarkOutcome, MarkState, ValidationError};
use super::records::{AnnotationRecord, RecordStore};
use crate::capture::CaptureTimeSource;
use crate::sync::{SyncError, SyncPolicy, SyncReport};

pub struct AnnotationSession {
    images: ImageSet,
    marks: MarkEngine,
    store: RecordStore,
    times: Box<dyn CaptureTimeSource + Send>,
}

impl AnnotationSession {
    pub fn new(times: Box<dyn CaptureTimeSource + Send>) -> Self {
        Self {
            images: ImageSet::new(),
            marks: MarkEngine::new(),
            store: RecordStore::new(),
            times,
        }
    }

    // ========== Images ==========

    /// Replace the image set; marks refer to the old set and are dropped.
    /// Rejected while a sync is outstanding, since its completion may reset
    /// the set.
    pub fn set_images(&mut self, images: Vec<ImageRef>) -> Result<(), ActionRejected> {
        if self.store.is_locked() {
            return Err(ActionRejected::SyncInProgress);
        }
        self.replace_images(images);
        Ok(())
    }

    fn replace_images(&mut self, images: Vec<ImageRef>) {
        self.images.set_images(images);
        self.marks.on_sequence_changed();
        info!("🖼️  {} images loaded", self.images.len());
    }

    pub fn next(&mut self) -> bool {
        self.images.next()
    }

    pub fn previous(&mut self) -> bool {
        self.images.previous()
    }

    // ========== Marks ==========

    pub fn set_single_image_mode(&mut self, on: bool) -> Result<MarkOutcome, ActionRejected> {
        self.marks
            .set_single_image_mode(on, &self.images, &*self.times)
    }

    pub fn mark_start(&mut self, on: bool) -> Result<MarkOutcome, ActionRejected> {
        self.marks.mark_start(on, &self.images, &*self.times)
    }

    pub fn mark_end(&mut self, on: bool) -> Result<MarkOutcome, ActionRejected> {
        self.marks.mark_end(on, &self.images, &*self.times)
    }

    pub fn save(&mut self, form: &AnnotationForm) -> Result<AnnotationRecord, ValidationError> {
        self.marks.save(&self.images, form, &mut self.store)
    }

    // ========== Sync ==========

    /// Lock the store and hand out the records not synced yet
    pub fn begin_sync(&mut self) -> Result<Vec<AnnotationRecord>, SyncError> {
        if self.store.is_locked() {
            return Err(SyncError::AlreadyInProgress);
        }
        let pending = self.store.pending().to_vec();
        if pending.is_empty() {
            return Err(SyncError::NothingToSync);
        }
        self.store.lock();
        info!("🔒 Syncing {} records", pending.len());
        Ok(pending)
    }

    /// Unlock the store. On success the synced records are cleared (and the
    /// image set too, if the policy says so); failures keep everything.
    pub fn finish_sync(&mut self, result: &Result<SyncReport, SyncError>, policy: &SyncPolicy) {
        self.store.unlock();

        let report = match result {
            Ok(report) => report,
            Err(err) => {
                warn!("Sync failed, keeping {} records: {}", self.store.len(), err);
                return;
            }
        };

        if report.is_partial() && !policy.clear_after_partial_sync {
            self.store.mark_synced();
            warn!(
                "Partial sync, keeping records locally for columns: {}",
                report.unsynced_columns.join(", ")
            );
            return;
        }

        self.store.clear();
        if policy.reset_images_after_sync {
            self.replace_images(Vec::new());
        }
        info!("✅ Sync finished, {} rows written", report.rows_written);
    }

    /// Drop every saved record and image
    pub fn clear_all(&mut self) -> Result<(), ActionRejected> {
        if self.store.is_locked() {
            return Err(ActionRejected::SyncInProgress);
        }
        self.store.clear();
        self.replace_images(Vec::new());
        Ok(())
    }

    // ========== Projections ==========

    pub fn current_image(&self) -> Option<&ImageRef> {
        self.images.current()
    }

    pub fn images(&self) -> &ImageSet {
        &self.images
    }

    pub fn counter_label(&self) -> String {
        self.images.counter_label()
    }

    pub fn is_start_checked(&self) -> bool {
        self.marks.is_start_marked(self.images.position())
    }

    pub fn is_end_checked(&self) -> bool {
        self.marks.is_end_marked(self.images.position())
    }

    pub fn is_single_checked(&self) -> bool {
        self.marks.is_single_marked(self.images.position())
    }

    pub fn marks(&self) -> &MarkState {
        self.marks.state()
    }

    pub fn start_label(&self) -> String {
        self.marks.start_label(&self.images)
    }

    pub fn end_label(&self) -> String {
        self.marks.end_label(&self.images)
    }

    pub fn end_before_start(&self) -> bool {
        self.marks.end_before_start()
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        self.store.all()
    }

    pub fn is_syncing(&self) -> bool {
        self.store.is_locked()
    }

    pub fn can_save(&self) -> bool {
        let state = self.marks.state();
        !self.is_syncing() && state.start_index.is_some() && state.end_index.is_some()
    }

    pub fn can_sync(&self) -> bool {
        !self.is_syncing() && !self.store.pending().is_empty()
    }
}
