/// Sequence marking engine
///
/// Tracks which images of the current set are marked as the start and end
/// of an observed sequence, or as a single-image observation, and turns a
/// complete set of marks plus the form into an `AnnotationRecord`.
///
/// Commands (`mark_start`, `mark_end`, `set_single_image_mode`) mutate the
/// marks and report what happened. Projections (`is_start_marked`, labels)
/// are pure reads for display and never feed back into the commands.

use thiserror::Error;
use tracing::{debug, info, warn};

use super::cursor::ImageSet;
use super::form::{AnnotationForm, RequiredField};
use super::records::{AnnotationRecord, RecordStore, StoreLocked};
use crate::capture::CaptureTimeSource;

/// Stored in place of a start time the resolver could not determine
pub const TIME_UNKNOWN: &str = "Time Unknown";

/// Raw mark values.
///
/// Invariants kept by `MarkEngine`:
/// - in single-image mode, `start_index == end_index`
/// - outside it, `start_index != end_index` whenever both are set
/// - a time is empty whenever its index is unset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkState {
    pub start_index: Option<usize>,
    pub end_index: Option<usize>,
    pub single_image_mode: bool,
    pub start_time: String,
    pub end_time: String,
}

/// Which marks are set, named the way the state machine is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkPhase {
    NoMarks,
    StartOnly,
    EndOnly,
    StartAndEnd { ordered: bool },
    SingleImage,
}

impl MarkState {
    pub fn phase(&self) -> MarkPhase {
        if self.single_image_mode {
            return MarkPhase::SingleImage;
        }
        match (self.start_index, self.end_index) {
            (None, None) => MarkPhase::NoMarks,
            (Some(_), None) => MarkPhase::StartOnly,
            (None, Some(_)) => MarkPhase::EndOnly,
            (Some(start), Some(end)) => MarkPhase::StartAndEnd {
                ordered: start < end,
            },
        }
    }
}

/// Result of a command that was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// A mark was placed on the current image. `end_before_start` is an
    /// advisory only; `save` is where ordering is enforced.
    Marked { end_before_start: bool },
    Unmarked,
    /// Nothing to do (e.g. unchecking a mark that belongs to another image)
    Unchanged,
    SingleImageOn,
    SingleImageOff { marks_reset: bool },
}

/// A user action that was refused; the marks are left as they were
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionRejected {
    #[error("No image is loaded")]
    NoImage,

    #[error("The same image cannot be both the start and the end of a sequence")]
    SameImageAsStartAndEnd,

    #[error("Start and end are locked while single image mode is on")]
    LockedBySingleImageMode,

    #[error("A sync is in progress")]
    SyncInProgress,
}

/// Why a save was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please mark both a start and an end image before saving")]
    MissingMarks,

    #[error("The marked images are no longer part of the current set; marks were reset")]
    StaleIndex,

    #[error("The end image comes before the start image")]
    OrderViolation,

    #[error("Please fill in all required fields: {}", join_labels(.0))]
    MissingFields(Vec<RequiredField>),

    #[error("Records cannot be saved while a sync is in progress")]
    StoreLocked,
}

impl From<StoreLocked> for ValidationError {
    fn from(_: StoreLocked) -> Self {
        ValidationError::StoreLocked
    }
}

fn join_labels(fields: &[RequiredField]) -> String {
    fields
        .iter()
        .map(RequiredField::label)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Owns the `MarkState` of one session
#[derive(Debug, Default)]
pub struct MarkEngine {
    state: MarkState,
}

impl MarkEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &MarkState {
        &self.state
    }

    // ========== Commands ==========

    /// Forget every mark. Called whenever the image set is replaced.
    pub fn on_sequence_changed(&mut self) {
        self.state = MarkState::default();
    }

    pub fn set_single_image_mode(
        &mut self,
        on: bool,
        images: &ImageSet,
        times: &dyn CaptureTimeSource,
    ) -> Result<MarkOutcome, ActionRejected> {
        if on {
            let image = images.current().ok_or(ActionRejected::NoImage)?;
            let cursor = images.position();
            let time = times.capture_time(image);

            self.state = MarkState {
                start_index: Some(cursor),
                end_index: Some(cursor),
                single_image_mode: true,
                start_time: time.clone(),
                end_time: time,
            };
            info!("📌 Single image mode on at {}", image.name);
            return Ok(MarkOutcome::SingleImageOn);
        }

        if !self.state.single_image_mode {
            return Ok(MarkOutcome::Unchanged);
        }

        // Marks that still coincide belong to the mode; keeping them would
        // leave start == end outside single-image mode.
        let mode_owned = self.state.start_index.is_some()
            && self.state.start_index == self.state.end_index;

        if mode_owned {
            self.on_sequence_changed();
        } else {
            self.state.single_image_mode = false;
        }
        info!("Single image mode off (marks reset: {})", mode_owned);
        Ok(MarkOutcome::SingleImageOff {
            marks_reset: mode_owned,
        })
    }

    pub fn mark_start(
        &mut self,
        on: bool,
        images: &ImageSet,
        times: &dyn CaptureTimeSource,
    ) -> Result<MarkOutcome, ActionRejected> {
        self.mark(Side::Start, on, images, times)
    }

    pub fn mark_end(
        &mut self,
        on: bool,
        images: &ImageSet,
        times: &dyn CaptureTimeSource,
    ) -> Result<MarkOutcome, ActionRejected> {
        self.mark(Side::End, on, images, times)
    }

    fn mark(
        &mut self,
        side: Side,
        on: bool,
        images: &ImageSet,
        times: &dyn CaptureTimeSource,
    ) -> Result<MarkOutcome, ActionRejected> {
        if self.state.single_image_mode {
            warn!("⚠️  {:?} mark ignored: single image mode is on", side);
            return Err(ActionRejected::LockedBySingleImageMode);
        }

        let cursor = images.position();

        if !on {
            let (index, time) = self.side_mut(side);
            if *index != Some(cursor) {
                return Ok(MarkOutcome::Unchanged);
            }
            *index = None;
            time.clear();
            debug!("{:?} mark cleared at {}", side, cursor);
            return Ok(MarkOutcome::Unmarked);
        }

        let image = images.current().ok_or(ActionRejected::NoImage)?;
        let other = match side {
            Side::Start => self.state.end_index,
            Side::End => self.state.start_index,
        };
        if other == Some(cursor) {
            warn!("⚠️  {} is already the other end of the sequence", image.name);
            return Err(ActionRejected::SameImageAsStartAndEnd);
        }

        let captured = times.capture_time(image);
        let (index, time) = self.side_mut(side);
        *index = Some(cursor);
        *time = captured;

        let end_before_start = self.end_before_start();
        if end_before_start {
            warn!("⚠️  End image is before the start image");
        }
        info!("📌 {:?} marked at {} ({})", side, image.name, cursor);
        Ok(MarkOutcome::Marked { end_before_start })
    }

    fn side_mut(&mut self, side: Side) -> (&mut Option<usize>, &mut String) {
        match side {
            Side::Start => (&mut self.state.start_index, &mut self.state.start_time),
            Side::End => (&mut self.state.end_index, &mut self.state.end_time),
        }
    }

    /// Validate the marks and form, append the record and reset the marks.
    ///
    /// Checks run in a fixed order: marks present, marks inside the current
    /// set (a stale mark forces a reset), ordering, then every required field
    /// at once. Nothing changes on failure except for `StaleIndex`.
    pub fn save(
        &mut self,
        images: &ImageSet,
        form: &AnnotationForm,
        store: &mut RecordStore,
    ) -> Result<AnnotationRecord, ValidationError> {
        let (start, end) = match (self.state.start_index, self.state.end_index) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(ValidationError::MissingMarks),
        };

        let (start_image, end_image) = match (images.get(start), images.get(end)) {
            (Some(start_image), Some(end_image)) => (start_image, end_image),
            _ => {
                warn!("⚠️  Marks {}..{} outside a set of {} images, resetting", start, end, images.len());
                self.on_sequence_changed();
                return Err(ValidationError::StaleIndex);
            }
        };

        if !self.state.single_image_mode && end < start {
            return Err(ValidationError::OrderViolation);
        }

        let metadata = form.validate().map_err(ValidationError::MissingFields)?;

        let start_time = if self.state.start_time.is_empty() {
            TIME_UNKNOWN.to_string()
        } else {
            self.state.start_time.clone()
        };
        let end_time = if self.state.end_time.is_empty() {
            start_time.clone()
        } else {
            self.state.end_time.clone()
        };

        let record = AnnotationRecord::new(
            start_image.name.clone(),
            end_image.name.clone(),
            metadata,
            start_time,
            end_time,
            self.state.single_image_mode,
        );

        store.append(record.clone())?;
        self.on_sequence_changed();

        info!(
            "✅ Saved {} {} → {}",
            record.kind_label(),
            record.start_filename(),
            record.end_filename()
        );
        Ok(record)
    }

    // ========== Projections ==========

    pub fn is_start_marked(&self, cursor: usize) -> bool {
        !self.state.single_image_mode && self.state.start_index == Some(cursor)
    }

    pub fn is_end_marked(&self, cursor: usize) -> bool {
        !self.state.single_image_mode && self.state.end_index == Some(cursor)
    }

    pub fn is_single_marked(&self, cursor: usize) -> bool {
        self.state.single_image_mode && self.state.start_index == Some(cursor)
    }

    /// Advisory: both marks set, outside single-image mode, end before start
    pub fn end_before_start(&self) -> bool {
        match (self.state.start_index, self.state.end_index) {
            (Some(start), Some(end)) => !self.state.single_image_mode && end < start,
            _ => false,
        }
    }

    pub fn start_label(&self, images: &ImageSet) -> String {
        index_label(self.state.start_index, images)
    }

    pub fn end_label(&self, images: &ImageSet) -> String {
        index_label(self.state.end_index, images)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Start,
    End,
}

fn index_label(index: Option<usize>, images: &ImageSet) -> String {
    match index {
        None => "None".to_string(),
        Some(i) => images
            .get(i)
            .map(|image| image.name.clone())
            .unwrap_or_else(|| "(Invalid Index)".to_string()),
    }
}

/// Capture times keyed by file name, for tests
#[cfg(test)]
pub(crate) struct FixedTimes(pub std::collections::HashMap<String, String>);

#[cfg(test)]
impl FixedTimes {
    /// `IMG_000i.JPG` captured at `2024-04-01 06:0i:00`
    pub(crate) fn numbered(count: usize) -> Self {
        Self(
            (0..count)
                .map(|i| (image_name(i), format!("2024-04-01 06:{:02}:00", i)))
                .collect(),
        )
    }
}

#[cfg(test)]
impl CaptureTimeSource for FixedTimes {
    fn capture_time(&self, image: &crate::state::data::ImageRef) -> String {
        self.0.get(&image.name).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) fn image_name(i: usize) -> String {
    format!("IMG_{:04}.JPG", i)
}

#[cfg(test)]
pub(crate) fn image_set(count: usize) -> ImageSet {
    use crate::state::data::ImageRef;

    let mut set = ImageSet::new();
    set.set_images(
        (0..count)
            .map(|i| ImageRef::from_path(format!("/traps/{}", image_name(i))))
            .collect(),
    );
    set
}

#[cfg(test)]
pub(crate) fn filled_form() -> AnnotationForm {
    use super::form::ObservationType;
    use chrono::NaiveDate;

    AnnotationForm {
        site: "Location 3".to_string(),
        camera: "CAM005".to_string(),
        retrieval_date: NaiveDate::from_ymd_opt(2024, 4, 10),
        observation_type: Some(ObservationType::Seabird),
        species: "Wedge-tailed Shearwater (Ardenna pacifica)".to_string(),
        behavior: "Nesting".to_string(),
        reviewer_name: "Leilani".to_string(),
        notes: "burrow entrance".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn go_to(images: &mut ImageSet, index: usize) {
        while images.position() < index && images.next() {}
        while images.position() > index && images.previous() {}
    }

    fn check_invariants(state: &MarkState) {
        if state.single_image_mode {
            assert!(state.start_index.is_some());
            assert_eq!(state.start_index, state.end_index, "{:?}", state);
            assert_eq!(state.start_time, state.end_time);
        } else if let (Some(start), Some(end)) = (state.start_index, state.end_index) {
            assert_ne!(start, end, "{:?}", state);
        }
        if state.start_index.is_none() {
            assert!(state.start_time.is_empty());
        }
        if state.end_index.is_none() {
            assert!(state.end_time.is_empty());
        }
    }

    #[test]
    fn test_scenario_start_then_end_saves_sequence() {
        let mut images = image_set(5);
        let times = FixedTimes::numbered(5);
        let mut engine = MarkEngine::new();
        let mut store = RecordStore::new();

        go_to(&mut images, 1);
        assert_eq!(
            engine.mark_start(true, &images, &times),
            Ok(MarkOutcome::Marked { end_before_start: false })
        );
        go_to(&mut images, 3);
        assert_eq!(
            engine.mark_end(true, &images, &times),
            Ok(MarkOutcome::Marked { end_before_start: false })
        );
        assert_eq!(engine.state().phase(), MarkPhase::StartAndEnd { ordered: true });

        let record = engine.save(&images, &filled_form(), &mut store).unwrap();

        assert_eq!(record.start_filename(), image_name(1));
        assert_eq!(record.end_filename(), image_name(3));
        assert!(!record.is_single_image());
        assert_eq!(record.sequence_start_time(), "2024-04-01 06:01:00");
        assert_eq!(record.sequence_end_time(), "2024-04-01 06:03:00");
        assert_eq!(store.len(), 1);
        assert_eq!(engine.state(), &MarkState::default());
    }

    #[test]
    fn test_scenario_same_image_as_start_and_end_is_rejected() {
        let mut images = image_set(5);
        let times = FixedTimes::numbered(5);
        let mut engine = MarkEngine::new();

        go_to(&mut images, 2);
        engine.mark_start(true, &images, &times).unwrap();
        let before = engine.state().clone();

        assert_eq!(
            engine.mark_end(true, &images, &times),
            Err(ActionRejected::SameImageAsStartAndEnd)
        );
        assert_eq!(engine.state(), &before);
        assert_eq!(engine.state().end_index, None);
    }

    #[test]
    fn test_scenario_single_image_mode_saves_single_record() {
        let mut images = image_set(5);
        let times = FixedTimes::numbered(5);
        let mut engine = MarkEngine::new();
        let mut store = RecordStore::new();

        go_to(&mut images, 4);
        assert_eq!(
            engine.set_single_image_mode(true, &images, &times),
            Ok(MarkOutcome::SingleImageOn)
        );

        let state = engine.state();
        assert_eq!(state.start_index, Some(4));
        assert_eq!(state.end_index, Some(4));
        assert_eq!(state.start_time, state.end_time);
        assert!(engine.is_single_marked(4));
        assert!(!engine.is_start_marked(4));

        let record = engine.save(&images, &filled_form(), &mut store).unwrap();
        assert!(record.is_single_image());
        assert_eq!(record.start_filename(), record.end_filename());
        assert!(!engine.state().single_image_mode);
    }

    #[test]
    fn test_scenario_end_before_start_is_advisory_then_blocks_save() {
        let mut images = image_set(5);
        let times = FixedTimes::numbered(5);
        let mut engine = MarkEngine::new();
        let mut store = RecordStore::new();

        go_to(&mut images, 3);
        engine.mark_start(true, &images, &times).unwrap();
        go_to(&mut images, 1);
        assert_eq!(
            engine.mark_end(true, &images, &times),
            Ok(MarkOutcome::Marked { end_before_start: true })
        );
        assert!(engine.end_before_start());

        let before = engine.state().clone();
        assert_eq!(
            engine.save(&images, &filled_form(), &mut store),
            Err(ValidationError::OrderViolation)
        );
        assert_eq!(engine.state(), &before);
        assert!(store.is_empty());
    }

    #[test]
    fn test_uncheck_only_clears_mark_on_current_image() {
        let mut images = image_set(4);
        let times = FixedTimes::numbered(4);
        let mut engine = MarkEngine::new();

        engine.mark_start(true, &images, &times).unwrap();
        go_to(&mut images, 2);

        assert_eq!(engine.mark_start(false, &images, &times), Ok(MarkOutcome::Unchanged));
        assert_eq!(engine.state().start_index, Some(0));

        go_to(&mut images, 0);
        assert_eq!(engine.mark_start(false, &images, &times), Ok(MarkOutcome::Unmarked));
        assert_eq!(engine.state(), &MarkState::default());
    }

    #[test]
    fn test_manual_marks_locked_in_single_image_mode() {
        let mut images = image_set(3);
        let times = FixedTimes::numbered(3);
        let mut engine = MarkEngine::new();

        go_to(&mut images, 1);
        engine.set_single_image_mode(true, &images, &times).unwrap();
        let before = engine.state().clone();

        assert_eq!(
            engine.mark_start(false, &images, &times),
            Err(ActionRejected::LockedBySingleImageMode)
        );
        assert_eq!(
            engine.mark_end(true, &images, &times),
            Err(ActionRejected::LockedBySingleImageMode)
        );
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_single_image_mode_off_resets_its_own_marks() {
        let mut images = image_set(3);
        let times = FixedTimes::numbered(3);
        let mut engine = MarkEngine::new();

        go_to(&mut images, 2);
        engine.set_single_image_mode(true, &images, &times).unwrap();
        assert_eq!(
            engine.set_single_image_mode(false, &images, &times),
            Ok(MarkOutcome::SingleImageOff { marks_reset: true })
        );
        assert_eq!(engine.state(), &MarkState::default());

        assert_eq!(
            engine.set_single_image_mode(false, &images, &times),
            Ok(MarkOutcome::Unchanged)
        );
    }

    #[test]
    fn test_single_image_mode_needs_an_image() {
        let images = ImageSet::new();
        let times = FixedTimes::numbered(0);
        let mut engine = MarkEngine::new();

        assert_eq!(
            engine.set_single_image_mode(true, &images, &times),
            Err(ActionRejected::NoImage)
        );
        assert_eq!(engine.mark_start(true, &images, &times), Err(ActionRejected::NoImage));
        assert_eq!(engine.mark_end(false, &images, &times), Ok(MarkOutcome::Unchanged));
        assert_eq!(engine.state(), &MarkState::default());
    }

    #[test]
    fn test_save_requires_both_marks() {
        let images = image_set(3);
        let times = FixedTimes::numbered(3);
        let mut engine = MarkEngine::new();
        let mut store = RecordStore::new();

        assert_eq!(
            engine.save(&images, &filled_form(), &mut store),
            Err(ValidationError::MissingMarks)
        );
        engine.mark_start(true, &images, &times).unwrap();
        assert_eq!(
            engine.save(&images, &filled_form(), &mut store),
            Err(ValidationError::MissingMarks)
        );
    }

    #[test]
    fn test_stale_marks_are_reset_on_save() {
        let mut images = image_set(5);
        let times = FixedTimes::numbered(5);
        let mut engine = MarkEngine::new();
        let mut store = RecordStore::new();

        go_to(&mut images, 1);
        engine.mark_start(true, &images, &times).unwrap();
        go_to(&mut images, 4);
        engine.mark_end(true, &images, &times).unwrap();

        // Replaced behind the engine's back
        let shorter = image_set(2);

        assert_eq!(
            engine.save(&shorter, &filled_form(), &mut store),
            Err(ValidationError::StaleIndex)
        );
        assert_eq!(engine.state(), &MarkState::default());
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_fields_reported_together_and_marks_kept() {
        let mut images = image_set(3);
        let times = FixedTimes::numbered(3);
        let mut engine = MarkEngine::new();
        let mut store = RecordStore::new();

        engine.mark_start(true, &images, &times).unwrap();
        go_to(&mut images, 2);
        engine.mark_end(true, &images, &times).unwrap();

        let mut form = filled_form();
        form.species.clear();
        form.reviewer_name = " ".to_string();
        let before = engine.state().clone();

        let err = engine.save(&images, &form, &mut store).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingFields(vec![RequiredField::Species, RequiredField::ReviewerName])
        );
        assert_eq!(
            err.to_string(),
            "Please fill in all required fields: Species, Reviewer Name"
        );
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_unknown_times_are_substituted() {
        let mut images = image_set(3);
        let mut times = FixedTimes::numbered(3);
        times.0.clear();
        let mut engine = MarkEngine::new();
        let mut store = RecordStore::new();

        engine.mark_start(true, &images, &times).unwrap();
        go_to(&mut images, 1);
        engine.mark_end(true, &images, &times).unwrap();

        let record = engine.save(&images, &filled_form(), &mut store).unwrap();
        assert_eq!(record.sequence_start_time(), TIME_UNKNOWN);
        assert_eq!(record.sequence_end_time(), TIME_UNKNOWN);
    }

    #[test]
    fn test_missing_end_time_takes_start_time() {
        let mut images = image_set(3);
        let mut times = FixedTimes::numbered(3);
        times.0.remove(&image_name(2));
        let mut engine = MarkEngine::new();
        let mut store = RecordStore::new();

        engine.mark_start(true, &images, &times).unwrap();
        go_to(&mut images, 2);
        engine.mark_end(true, &images, &times).unwrap();

        let record = engine.save(&images, &filled_form(), &mut store).unwrap();
        assert_eq!(record.sequence_end_time(), "2024-04-01 06:00:00");
    }

    #[test]
    fn test_locked_store_keeps_marks() {
        let mut images = image_set(3);
        let times = FixedTimes::numbered(3);
        let mut engine = MarkEngine::new();
        let mut store = RecordStore::new();

        engine.mark_start(true, &images, &times).unwrap();
        go_to(&mut images, 1);
        engine.mark_end(true, &images, &times).unwrap();
        let before = engine.state().clone();

        store.lock();
        assert_eq!(
            engine.save(&images, &filled_form(), &mut store),
            Err(ValidationError::StoreLocked)
        );
        assert_eq!(engine.state(), &before);
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_round_trip_reproduces_inputs() {
        let mut images = image_set(6);
        let times = FixedTimes::numbered(6);
        let mut engine = MarkEngine::new();
        let mut store = RecordStore::new();
        let form = filled_form();

        go_to(&mut images, 2);
        engine.mark_start(true, &images, &times).unwrap();
        go_to(&mut images, 5);
        engine.mark_end(true, &images, &times).unwrap();
        engine.save(&images, &form, &mut store).unwrap();

        let last = store.all().last().unwrap();
        assert_eq!(last.metadata(), &form.validate().unwrap());
        assert_eq!(last.sequence_start_time(), "2024-04-01 06:02:00");
        assert_eq!(last.sequence_end_time(), "2024-04-01 06:05:00");
    }

    #[test]
    fn test_sequence_changed_is_idempotent() {
        let images = image_set(3);
        let times = FixedTimes::numbered(3);
        let mut engine = MarkEngine::new();

        engine.mark_start(true, &images, &times).unwrap();
        engine.on_sequence_changed();
        let once = engine.state().clone();
        engine.on_sequence_changed();

        assert_eq!(engine.state(), &once);
        assert_eq!(once, MarkState::default());
    }

    #[test]
    fn test_projections_follow_cursor_without_changing_marks() {
        let mut images = image_set(4);
        let times = FixedTimes::numbered(4);
        let mut engine = MarkEngine::new();

        go_to(&mut images, 1);
        engine.mark_start(true, &images, &times).unwrap();
        let before = engine.state().clone();

        for i in 0..4 {
            go_to(&mut images, i);
            assert_eq!(engine.is_start_marked(images.position()), i == 1);
            assert!(!engine.is_end_marked(images.position()));
        }
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_labels() {
        let mut images = image_set(3);
        let times = FixedTimes::numbered(3);
        let mut engine = MarkEngine::new();

        assert_eq!(engine.start_label(&images), "None");

        go_to(&mut images, 2);
        engine.mark_start(true, &images, &times).unwrap();
        assert_eq!(engine.start_label(&images), image_name(2));
        assert_eq!(engine.end_label(&images), "None");
        assert_eq!(engine.start_label(&image_set(1)), "(Invalid Index)");
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Next,
        Previous,
        Start(bool),
        End(bool),
        Single(bool),
        Save,
    }

    const OPS: [Op; 8] = [
        Op::Next,
        Op::Previous,
        Op::Start(true),
        Op::Start(false),
        Op::End(true),
        Op::End(false),
        Op::Single(true),
        Op::Single(false),
    ];

    fn apply(op: Op, engine: &mut MarkEngine, images: &mut ImageSet, times: &FixedTimes) {
        let before = engine.state().clone();
        let result = match op {
            Op::Next => {
                images.next();
                Ok(MarkOutcome::Unchanged)
            }
            Op::Previous => {
                images.previous();
                Ok(MarkOutcome::Unchanged)
            }
            Op::Start(on) => engine.mark_start(on, images, times),
            Op::End(on) => engine.mark_end(on, images, times),
            Op::Single(on) => engine.set_single_image_mode(on, images, times),
            Op::Save => {
                let _ = engine.save(images, &filled_form(), &mut RecordStore::new());
                Ok(MarkOutcome::Unchanged)
            }
        };
        if result.is_err() {
            assert_eq!(engine.state(), &before, "rejected {:?} changed state", op);
        }
    }

    #[test]
    fn test_invariants_hold_for_every_short_sequence() {
        let ops: Vec<Op> = OPS.iter().copied().chain(std::iter::once(Op::Save)).collect();
        let n = ops.len();

        for a in 0..n {
            for b in 0..n {
                for c in 0..n {
                    for d in 0..n {
                        let mut images = image_set(3);
                        let times = FixedTimes::numbered(3);
                        let mut engine = MarkEngine::new();

                        for &i in &[a, b, c, d] {
                            apply(ops[i], &mut engine, &mut images, &times);
                            check_invariants(engine.state());
                        }
                    }
                }
            }
        }
    }
}
