/// Shared data structures for the annotation session
///
/// These structs represent the image set that flows from the ingestion
/// boundary into the session and the UI layer.

use std::path::PathBuf;

/// Represents a single image in the current set
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    /// Filename only (e.g., "IMG_0001.JPG"); the set is sorted by this
    pub name: String,
    /// File on disk (picked directly or found by a folder scan)
    pub path: PathBuf,
}

impl ImageRef {
    /// Reference a file on disk, named after its file name
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Self { name, path }
    }
}
