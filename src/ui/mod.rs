/// View helpers
///
/// - Viewer, marking controls, form and action buttons (panels.rs)
/// - Canvas strip of cursor and mark positions (strip.rs)
/// - Saved annotations and roster grids (tables.rs)

pub mod panels;
pub mod strip;
pub mod tables;
