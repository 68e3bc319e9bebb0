/// Capture-time resolution
///
/// This module handles:
/// - Walking the embedded EXIF block for date/time tags (exif.rs)
/// - The ordered fallback chain down to the file modification time (resolver.rs)

pub mod exif;
pub mod resolver;

pub use resolver::{CaptureTimeResolver, CaptureTimeSource};
