/// Best-effort capture time for a camera-trap image
///
/// Camera EXIF in the field is unreliable, so resolution never fails:
/// every strategy returns an optional value and the first one that
/// produces something wins. Failure reasons are only logged.

use chrono::{DateTime, Local, NaiveDateTime};
use image::{ImageDecoder, ImageReader};
use std::io::{BufRead, Seek};
use std::time::SystemTime;
use tracing::{debug, warn};

use super::exif::{ExifBlock, TAG_DATE_TIME, TAG_DATE_TIME_ORIGINAL};
use crate::state::data::ImageRef;

/// Format of EXIF date/time tags
const EXIF_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Format of every resolved capture time
pub const CAPTURE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Anything that can produce a capture time for an image.
///
/// The marking engine only depends on this trait, so tests can hand it
/// fixed times instead of real files.
pub trait CaptureTimeSource {
    /// Capture time formatted as `YYYY-MM-DD HH:MM:SS`, or "" when unknown
    fn capture_time(&self, image: &ImageRef) -> String;
}

/// One step of the resolution chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    /// `DateTimeOriginal`, or `DateTime` when the original tag is absent
    Exif,
    /// Last-modification time of the file
    FileModified,
}

/// What was read from the image once, shared by all strategies
#[derive(Debug, Default)]
struct Probe {
    exif: Option<Vec<u8>>,
    modified: Option<SystemTime>,
}

impl TimeSource {
    fn read(self, probe: &Probe) -> Option<String> {
        match self {
            TimeSource::Exif => {
                let block = ExifBlock::parse(probe.exif.as_deref()?)?;
                // DateTime is only consulted when DateTimeOriginal is missing;
                // an unparseable original tag falls through to the next step
                let (tag, raw) = [TAG_DATE_TIME_ORIGINAL, TAG_DATE_TIME]
                    .into_iter()
                    .find_map(|tag| {
                        block
                            .ascii(tag)
                            .filter(|raw| !raw.trim().is_empty())
                            .map(|raw| (tag, raw))
                    })?;

                let parsed = parse_exif_time(&raw);
                if parsed.is_none() {
                    debug!("EXIF tag {:#06x} has unparseable value '{}'", tag, raw);
                }
                parsed
            }
            TimeSource::FileModified => probe.modified.map(format_system_time),
        }
    }
}

/// Resolves capture times with an ordered chain of strategies:
/// EXIF first, then the file's modification time.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureTimeResolver;

impl CaptureTimeResolver {
    const CHAIN: [TimeSource; 2] = [TimeSource::Exif, TimeSource::FileModified];

    /// Resolve the capture time of an image.
    ///
    /// Returns "" if the image cannot be opened or identified, or if no
    /// strategy produced a value.
    pub fn resolve(&self, image: &ImageRef) -> String {
        let probe = match probe_image(image) {
            Ok(probe) => probe,
            Err(reason) => {
                warn!("⚠️  Cannot read {}: {}", image.name, reason);
                return String::new();
            }
        };

        match self.resolve_probe(&probe) {
            Some((source, time)) => {
                debug!("Capture time for {} from {:?}: {}", image.name, source, time);
                time
            }
            None => {
                warn!("Could not determine a capture time for {}", image.name);
                String::new()
            }
        }
    }

    fn resolve_probe(&self, probe: &Probe) -> Option<(TimeSource, String)> {
        Self::CHAIN
            .iter()
            .find_map(|&source| source.read(probe).map(|time| (source, time)))
    }
}

impl CaptureTimeSource for CaptureTimeResolver {
    fn capture_time(&self, image: &ImageRef) -> String {
        self.resolve(image)
    }
}

/// Parse `YYYY:MM:DD HH:MM:SS[.fraction]` into the capture time format
pub fn parse_exif_time(raw: &str) -> Option<String> {
    let whole_seconds = raw.split('.').next().unwrap_or(raw).trim();
    NaiveDateTime::parse_from_str(whole_seconds, EXIF_FORMAT)
        .ok()
        .map(|dt| dt.format(CAPTURE_TIME_FORMAT).to_string())
}

fn format_system_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format(CAPTURE_TIME_FORMAT)
        .to_string()
}

/// Open the image once: identify its format, pull the EXIF block and stat the file
fn probe_image(image: &ImageRef) -> Result<Probe, String> {
    let reader = ImageReader::open(&image.path).map_err(|e| format!("open failed: {}", e))?;
    let exif = read_exif(reader)?;
    let modified = std::fs::metadata(&image.path)
        .and_then(|meta| meta.modified())
        .map_err(|e| debug!("No modification time for {}: {}", image.name, e))
        .ok();

    Ok(Probe { exif, modified })
}

fn read_exif<R: BufRead + Seek>(reader: ImageReader<R>) -> Result<Option<Vec<u8>>, String> {
    let mut decoder = reader
        .with_guessed_format()
        .map_err(|e| format!("format detection failed: {}", e))?
        .into_decoder()
        .map_err(|e| format!("not a readable image: {}", e))?;

    // A broken EXIF segment is not fatal; later strategies still apply
    match decoder.exif_metadata() {
        Ok(exif) => Ok(exif),
        Err(e) => {
            debug!("Minor EXIF extraction issue: {}", e);
            Ok(None)
        }
    }
}
