/// Ordered image set with a cursor on the current image

use super::data::ImageRef;

/// The images of the current upload batch and the index of the one on screen.
///
/// Invariant: `cursor < images.len()` whenever the set is non-empty, and
/// `cursor == 0` right after the set is replaced.
#[derive(Debug, Clone, Default)]
pub struct ImageSet {
    images: Vec<ImageRef>,
    cursor: usize,
}

impl ImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole set. Images are sorted by name and the cursor goes
    /// back to the first one.
    ///
    /// Marks refer to positions in the old set, so callers must reset them
    /// too (`AnnotationSession::set_images` does).
    pub fn set_images(&mut self, mut images: Vec<ImageRef>) {
        images.sort_by(|a, b| a.name.cmp(&b.name));
        self.images = images;
        self.cursor = 0;
    }

    /// Move to the next image. Returns false at the end of the set.
    pub fn next(&mut self) -> bool {
        if self.cursor + 1 < self.images.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Move to the previous image. Returns false at the start of the set.
    pub fn previous(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// The image under the cursor, if any
    pub fn current(&self) -> Option<&ImageRef> {
        self.images.get(self.cursor)
    }

    /// 0-based cursor position
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn get(&self, index: usize) -> Option<&ImageRef> {
        self.images.get(index)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// "3 / 12" style counter, "0 / 0" when empty
    pub fn counter_label(&self) -> String {
        if self.images.is_empty() {
            "0 / 0".to_string()
        } else {
            format!("{} / {}", self.cursor + 1, self.images.len())
        }
    }
}
