//! Draft editing
//!
//! Local overlays, the merge that turns base + overlay into the editable
//! view, required-field validation and the commit pipeline.

pub mod commit;
pub mod debounce;
pub mod form;
pub mod merge;
pub mod overlay;
pub mod session;
pub mod validate;

pub use commit::DraftContext;
pub use overlay::{FileOverlayBackend, OverlayStore};
pub use session::{EditSession, ExitDecision, PresetAnswer, Selection};
