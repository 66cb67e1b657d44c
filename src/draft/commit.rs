//! Commit pipeline
//!
//! A commit is durable once the overlay is written locally. Pushing the
//! snapshot to the system of record happens afterwards on its own task and
//! can fail without undoing anything.

use crate::draft::form::DivisionForm;
use crate::draft::overlay::{DraftOverlay, OverlayStore};
use crate::error::AppError;
use crate::models::Snapshot;
use crate::record::SharedRecord;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Collaborators shared by every edit session
#[derive(Clone)]
pub struct DraftContext {
    pub overlays: Arc<OverlayStore>,
    pub record: SharedRecord,
}

impl DraftContext {
    pub fn new(overlays: Arc<OverlayStore>, record: SharedRecord) -> Self {
        Self { overlays, record }
    }
}

/// Result of a commit: the stored overlay and the in-flight push
pub struct Committed {
    pub overlay: DraftOverlay,
    /// Resolves to the appended snapshot, or `None` when the push failed
    pub push: JoinHandle<Option<Snapshot>>,
}

/// Write the form's overlay under both of its keys without pushing
pub fn save_local(ctx: &DraftContext, form: &DivisionForm) -> Result<DraftOverlay, AppError> {
    let overlay = form.to_overlay();
    ctx.overlays
        .put(form.id, form.name_key(), &overlay)
        .map_err(|e| AppError::Internal(format!("Failed to persist draft locally: {}", e)))?;
    Ok(overlay)
}

pub fn commit_draft(ctx: &DraftContext, form: &DivisionForm) -> Result<Committed, AppError> {
    let overlay = save_local(ctx, form)?;
    info!("Committed draft for division {:?} ({})", form.id, form.name_key());

    let record = Arc::clone(&ctx.record);
    let division = form.to_division();
    let push = tokio::spawn(async move {
        match record.append_snapshot(&division).await {
            Ok(snapshot) => {
                info!("Pushed snapshot {} for {}", snapshot.id, division.division_name);
                Some(snapshot)
            }
            Err(e) => {
                warn!(
                    "Snapshot push for {} failed, local draft kept: {}",
                    division.division_name, e
                );
                None
            }
        }
    });

    Ok(Committed { overlay, push })
}
