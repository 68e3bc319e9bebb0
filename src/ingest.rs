/// Image ingestion
///
/// Turns picked files or a scanned folder into `ImageRef`s. Only JPEG and
/// PNG files are accepted; ordering is left to the session, which sorts by
/// name.

use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::state::data::ImageRef;

/// Accepted file extensions (case-insensitive)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Keep the supported files of a picked list
pub fn from_paths(paths: Vec<PathBuf>) -> Vec<ImageRef> {
    let total = paths.len();
    let images: Vec<ImageRef> = paths
        .into_iter()
        .filter(|path| is_supported(path))
        .map(ImageRef::from_path)
        .collect();

    if images.len() < total {
        warn!("Skipped {} unsupported files", total - images.len());
    }
    images
}

/// Every supported image below `folder`, following symlinks
pub fn scan_folder(folder: &Path) -> Vec<ImageRef> {
    info!("📂 Scanning {}", folder.display());

    let images: Vec<ImageRef> = WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("⚠️  Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_supported(entry.path()))
        .map(|entry| ImageRef::from_path(entry.into_path()))
        .collect();

    info!("Found {} images", images.len());
    images
}
