/// Annotation session state
///
/// This module handles all in-memory session state, including:
/// - Shared image data structures (data.rs)
/// - The ordered image set and its cursor (cursor.rs)
/// - Start/end/single-image marks and save validation (marks.rs)
/// - Saved annotation records (records.rs)
/// - The metadata form and its vocabulary (form.rs)
/// - The session object tying them together (session.rs)

pub mod cursor;
pub mod data;
pub mod form;
pub mod marks;
pub mod records;
pub mod session;

pub use session::AnnotationSession;
