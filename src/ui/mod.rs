/// Custom widgets for the editor window
///
/// - `overlay.rs` - drag-to-select layer drawn over the edited image

pub mod overlay;
