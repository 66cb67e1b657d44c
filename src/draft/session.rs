//! Edit sessions
//!
//! A session owns one division's editable view, the dirty flag and the
//! autosave timer. Leaving it, including selecting another division, always
//! goes through [`EditSession::guarded_exit`].

use crate::draft::commit::{commit_draft, save_local, Committed, DraftContext};
use crate::draft::debounce::Debouncer;
use crate::draft::form::{DivisionForm, FormEdit};
use crate::draft::merge::merge;
use crate::draft::validate::{validate, ValidationReport};
use crate::error::AppError;
use crate::models::ScheduleEntry;
use crate::record::resolve_division;
use crate::schedule::ScheduleManager;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Asks the editor whether to fill placeholders and save anyway
#[async_trait]
pub trait RemediationPrompt: Send + Sync {
    async fn confirm(&self, issues: &[String]) -> bool;
}

/// Prompt answered ahead of time, the way an HTTP caller answers it.
/// No answer counts as declining.
pub struct PresetAnswer(pub Option<bool>);

#[async_trait]
impl RemediationPrompt for PresetAnswer {
    async fn confirm(&self, _issues: &[String]) -> bool {
        self.0.unwrap_or(false)
    }
}

/// Outcome of a guarded exit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum ExitDecision {
    Proceed,
    Cancelled { issues: Vec<String> },
}

/// Which division to open
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub id: Option<i64>,
    pub name: Option<String>,
}

pub struct EditSession {
    ctx: DraftContext,
    form: DivisionForm,
    dirty: bool,
    autosave: Debouncer,
}

impl EditSession {
    /// Resolve the division, lay its overlay over it and start editing
    pub async fn open(
        ctx: DraftContext,
        selection: &Selection,
        autosave_delay: Duration,
    ) -> Result<Self, AppError> {
        let form = Self::load(&ctx, selection).await?;
        Ok(Self {
            ctx,
            form,
            dirty: false,
            autosave: Debouncer::new(autosave_delay),
        })
    }

    async fn load(ctx: &DraftContext, selection: &Selection) -> Result<DivisionForm, AppError> {
        let base = resolve_division(ctx.record.as_ref(), selection.id, selection.name.as_deref()).await?;
        let overlay = ctx.overlays.get(base.id, &base.division_name);
        if overlay.is_some() {
            debug!("Found local draft for {}", base.division_name);
        }
        let effective = merge(&base, overlay.as_ref());
        Ok(DivisionForm::from_division(&effective))
    }

    pub fn form(&self) -> &DivisionForm {
        &self.form
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn autosave_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    pub fn validate(&self) -> ValidationReport {
        validate(&self.form)
    }

    /// Apply an edit, mark the session dirty and restart the autosave timer
    pub fn apply(&mut self, edit: FormEdit) -> Result<(), AppError> {
        self.apply_all(vec![edit])
    }

    /// Apply a batch of edits as one unit. If any edit fails, the form,
    /// the dirty flag and the autosave timer are left as they were.
    pub fn apply_all(&mut self, edits: Vec<FormEdit>) -> Result<(), AppError> {
        if edits.is_empty() {
            return Ok(());
        }
        let mut form = self.form.clone();
        for edit in edits {
            form.apply(edit)?;
        }
        self.form = form;
        self.dirty = true;

        let ctx = self.ctx.clone();
        let form = self.form.clone();
        self.autosave.schedule(async move {
            if let Err(e) = save_local(&ctx, &form) {
                warn!("Autosave for {} failed: {}", form.name_key(), e);
            }
        });
        Ok(())
    }

    /// Save button: blocked by issues unless `force`, which fills placeholders first
    pub fn save(&mut self, force: bool) -> Result<Committed, AppError> {
        let report = self.validate();
        if !report.is_clean() {
            if !force {
                return Err(AppError::RequiredFields(report.issues));
            }
            report.remediate(&mut self.form);
        }
        self.commit()
    }

    fn commit(&mut self) -> Result<Committed, AppError> {
        let committed = commit_draft(&self.ctx, &self.form)?;
        self.dirty = false;
        self.autosave.cancel();
        Ok(committed)
    }

    /// Drop local edits for this division and reload it from the system of record
    pub async fn reset(&mut self) -> Result<(), AppError> {
        // a pending autosave must not write the draft back after the clear
        self.autosave.cancel();
        let cleared = self
            .ctx
            .overlays
            .clear(self.form.id, self.form.name_key())
            .map_err(|e| AppError::Internal(format!("Failed to clear local draft: {}", e)))?;
        info!("Reset {} (local draft cleared: {})", self.form.name_key(), cleared);

        let selection = Selection {
            id: self.form.id,
            name: Some(self.form.division_name.clone()),
        };
        self.form = Self::load(&self.ctx, &selection).await?;
        self.dirty = false;
        Ok(())
    }

    /// Check run before leaving the session.
    ///
    /// The pending autosave is dropped only once the exit goes ahead; a
    /// cancelled exit leaves it running.
    pub async fn guarded_exit(&mut self, prompt: &dyn RemediationPrompt) -> Result<ExitDecision, AppError> {
        if !self.dirty {
            self.autosave.cancel();
            return Ok(ExitDecision::Proceed);
        }

        let report = self.validate();
        if report.is_clean() {
            save_local(&self.ctx, &self.form)?;
            self.autosave.cancel();
            return Ok(ExitDecision::Proceed);
        }

        if !prompt.confirm(&report.issues).await {
            debug!("Exit from {} cancelled with {} issues", self.form.name_key(), report.issues.len());
            return Ok(ExitDecision::Cancelled { issues: report.issues });
        }

        report.remediate(&mut self.form);
        self.commit()?;
        Ok(ExitDecision::Proceed)
    }

    /// Select another division; only happens if the guarded exit proceeds
    pub async fn switch_to(
        &mut self,
        selection: &Selection,
        prompt: &dyn RemediationPrompt,
    ) -> Result<ExitDecision, AppError> {
        let decision = self.guarded_exit(prompt).await?;
        if decision == ExitDecision::Proceed {
            self.form = Self::load(&self.ctx, selection).await?;
            self.dirty = false;
            info!("Switched editor to {}", self.form.name_key());
        }
        Ok(decision)
    }

    /// Mark a program of this division for improvement in the current year
    pub async fn toggle_improvement(
        &self,
        schedule: &ScheduleManager,
        program_index: usize,
        selected: bool,
    ) -> Result<ScheduleEntry, AppError> {
        let program = self
            .form
            .programs
            .get(program_index)
            .ok_or_else(|| AppError::BadRequest(format!("Program {} out of range", program_index + 1)))?;
        let program_id = program.id.ok_or_else(|| {
            AppError::BadRequest("Save this program to the database before marking it for improvement".to_string())
        })?;
        let year = schedule
            .current_year()
            .await?
            .ok_or_else(|| AppError::Conflict("No current academic year is set".to_string()))?;

        schedule.toggle_selection(year.id, program_id, selected).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::form::FormField;
    use crate::draft::overlay::OverlayStore;
    use crate::models::{Division, Payee, Program};
    use crate::record::{MemoryRecord, SystemOfRecord};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const DELAY: Duration = Duration::from_millis(700);

    fn arts() -> Division {
        Division {
            id: Some(1),
            division_name: "Arts".to_string(),
            dean_name: "A. Smith".to_string(),
            chair_name: "B. Jones".to_string(),
            pen_contact: "C. Lee".to_string(),
            loc_rep: "D. Kim".to_string(),
            program_list: vec![Program {
                id: Some(10),
                program_name: "Music".to_string(),
                payees: vec![Payee::new("Jo", 100.0)],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn context(record: Arc<MemoryRecord>) -> DraftContext {
        DraftContext::new(Arc::new(OverlayStore::in_memory()), record)
    }

    fn select_arts() -> Selection {
        Selection {
            id: Some(1),
            name: None,
        }
    }

    fn set_dean(value: &str) -> FormEdit {
        FormEdit::SetField {
            field: FormField::Dean,
            value: value.to_string(),
        }
    }

    /// Counts how often it is asked, answering with a fixed value
    struct CountingPrompt {
        answer: bool,
        asked: AtomicUsize,
    }

    #[async_trait]
    impl RemediationPrompt for CountingPrompt {
        async fn confirm(&self, _issues: &[String]) -> bool {
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    fn prompt(answer: bool) -> CountingPrompt {
        CountingPrompt {
            answer,
            asked: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_open_merges_local_draft() {
        let ctx = context(Arc::new(MemoryRecord::with_divisions(vec![arts()])));
        let mut draft = DivisionForm::from_division(&arts());
        draft.chair = "Z. New".to_string();
        save_local(&ctx, &draft).unwrap();

        let session = EditSession::open(ctx, &select_arts(), DELAY).await.unwrap();
        assert_eq!(session.form().chair, "Z. New");
        assert_eq!(session.form().programs[0].id, Some(10));
        assert!(!session.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_writes_overlay_after_quiet_period() {
        let ctx = context(Arc::new(MemoryRecord::with_divisions(vec![arts()])));
        let overlays = Arc::clone(&ctx.overlays);
        let mut session = EditSession::open(ctx, &select_arts(), DELAY).await.unwrap();

        session.apply(set_dean("First")).unwrap();
        session.apply(set_dean("Second")).unwrap();
        assert!(session.is_dirty());
        assert!(overlays.get(Some(1), "Arts").is_none());

        tokio::time::sleep(DELAY * 2).await;
        assert_eq!(overlays.get(Some(1), "Arts").unwrap().dean.as_deref(), Some("Second"));
        // autosave is not a commit
        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn test_save_blocked_until_forced() {
        let record = Arc::new(MemoryRecord::with_divisions(vec![arts()]));
        let mut session = EditSession::open(context(record.clone()), &select_arts(), DELAY)
            .await
            .unwrap();
        session.apply(set_dean("  ")).unwrap();

        match session.save(false) {
            Err(AppError::RequiredFields(issues)) => assert_eq!(issues, vec!["Dean"]),
            other => panic!("expected required fields, got {:?}", other.map(|c| c.overlay)),
        }
        assert!(session.is_dirty());

        let committed = session.save(true).unwrap();
        assert_eq!(committed.overlay.dean.as_deref(), Some("TBD"));
        assert!(!session.is_dirty());
        assert!(!session.autosave_pending());
        committed.push.await.unwrap();
        assert_eq!(record.list_snapshots(5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_guarded_exit_clean_session_never_prompts() {
        let ctx = context(Arc::new(MemoryRecord::with_divisions(vec![arts()])));
        let mut session = EditSession::open(ctx, &select_arts(), DELAY).await.unwrap();
        let asker = prompt(false);

        assert_eq!(session.guarded_exit(&asker).await.unwrap(), ExitDecision::Proceed);
        session.apply(set_dean("E. Fox")).unwrap();
        assert_eq!(session.guarded_exit(&asker).await.unwrap(), ExitDecision::Proceed);
        assert_eq!(asker.asked.load(Ordering::SeqCst), 0);
        assert!(!session.autosave_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_declined_exit_keeps_editing_and_timer() {
        let ctx = context(Arc::new(MemoryRecord::with_divisions(vec![arts()])));
        let mut session = EditSession::open(ctx, &select_arts(), DELAY).await.unwrap();
        session.apply(set_dean("")).unwrap();

        let decision = session.guarded_exit(&prompt(false)).await.unwrap();
        assert_eq!(
            decision,
            ExitDecision::Cancelled {
                issues: vec!["Dean".to_string()]
            }
        );
        assert!(session.is_dirty());
        assert!(session.autosave_pending());
    }

    #[tokio::test]
    async fn test_confirmed_exit_remediates_and_commits() {
        let record = Arc::new(MemoryRecord::with_divisions(vec![arts()]));
        let ctx = context(record.clone());
        let overlays = Arc::clone(&ctx.overlays);
        let mut session = EditSession::open(ctx, &select_arts(), DELAY).await.unwrap();
        session.apply(FormEdit::AddProgram).unwrap();

        let decision = session.guarded_exit(&prompt(true)).await.unwrap();
        assert_eq!(decision, ExitDecision::Proceed);
        assert!(!session.is_dirty());

        let stored = overlays.get(Some(1), "Arts").unwrap();
        let names: Vec<_> = stored
            .programs_data
            .unwrap()
            .into_iter()
            .filter_map(|p| p.program_name)
            .collect();
        assert_eq!(names, vec!["Music", "TBD Program"]);
    }

    #[tokio::test]
    async fn test_switch_routes_through_guarded_exit() {
        let science = Division {
            id: Some(2),
            division_name: "Science".to_string(),
            ..Default::default()
        };
        let ctx = context(Arc::new(MemoryRecord::with_divisions(vec![arts(), science])));
        let mut session = EditSession::open(ctx, &select_arts(), DELAY).await.unwrap();
        session.apply(set_dean("")).unwrap();

        let target = Selection {
            id: None,
            name: Some("science".to_string()),
        };
        let decision = session.switch_to(&target, &PresetAnswer(None)).await.unwrap();
        assert!(matches!(decision, ExitDecision::Cancelled { .. }));
        assert_eq!(session.form().division_name, "Arts");

        let decision = session.switch_to(&target, &PresetAnswer(Some(true))).await.unwrap();
        assert_eq!(decision, ExitDecision::Proceed);
        assert_eq!(session.form().division_name, "Science");
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn test_reset_discards_local_draft() {
        let ctx = context(Arc::new(MemoryRecord::with_divisions(vec![arts()])));
        let overlays = Arc::clone(&ctx.overlays);
        let mut session = EditSession::open(ctx, &select_arts(), DELAY).await.unwrap();
        session.apply(set_dean("Temp")).unwrap();
        session.save(false).unwrap();

        session.reset().await.unwrap();
        assert_eq!(session.form().dean, "A. Smith");
        assert!(overlays.get(Some(1), "Arts").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_drops_pending_autosave() {
        let ctx = context(Arc::new(MemoryRecord::with_divisions(vec![arts()])));
        let overlays = Arc::clone(&ctx.overlays);
        let mut session = EditSession::open(ctx, &select_arts(), DELAY).await.unwrap();
        session.apply(set_dean("Unsaved")).unwrap();
        assert!(session.autosave_pending());

        session.reset().await.unwrap();
        assert!(!session.autosave_pending());

        tokio::time::sleep(DELAY * 2).await;
        assert!(overlays.get(Some(1), "Arts").is_none());
        assert_eq!(session.form().dean, "A. Smith");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_batch_leaves_session_untouched() {
        let ctx = context(Arc::new(MemoryRecord::with_divisions(vec![arts()])));
        let overlays = Arc::clone(&ctx.overlays);
        let mut session = EditSession::open(ctx, &select_arts(), DELAY).await.unwrap();

        let batch = vec![
            set_dean("X. Partial"),
            FormEdit::SetPaid { index: 5, value: true },
        ];
        assert!(matches!(session.apply_all(batch), Err(AppError::BadRequest(_))));
        assert_eq!(session.form().dean, "A. Smith");
        assert!(!session.is_dirty());
        assert!(!session.autosave_pending());

        tokio::time::sleep(DELAY * 2).await;
        assert!(overlays.get(Some(1), "Arts").is_none());

        session
            .apply_all(vec![set_dean("X. Whole"), FormEdit::SetPaid { index: 0, value: true }])
            .unwrap();
        assert_eq!(session.form().dean, "X. Whole");
        assert!(session.form().programs[0].has_been_paid);
        assert!(session.is_dirty());
        assert!(session.autosave_pending());
    }

    #[tokio::test]
    async fn test_local_commit_survives_offline_record() {
        let record = Arc::new(MemoryRecord::with_divisions(vec![arts()]));
        let ctx = context(record.clone());
        let mut session = EditSession::open(ctx.clone(), &select_arts(), DELAY).await.unwrap();
        session.apply(set_dean("Offline Edit")).unwrap();

        record.set_offline(true);
        let committed = session.save(false).unwrap();
        assert!(committed.push.await.unwrap().is_none());
        record.set_offline(false);

        let reopened = EditSession::open(ctx, &select_arts(), DELAY).await.unwrap();
        assert_eq!(reopened.form().dean, "Offline Edit");
    }

    #[tokio::test]
    async fn test_improvement_needs_saved_program_and_current_year() {
        let record = Arc::new(MemoryRecord::with_divisions(vec![arts()]));
        let schedule = ScheduleManager::new(record.clone(), "2024-2025");
        let mut session = EditSession::open(context(record.clone()), &select_arts(), DELAY)
            .await
            .unwrap();

        let err = session.toggle_improvement(&schedule, 0, true).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let year = record.create_year("2024-2025").await.unwrap();
        record.set_current_year(year.id).await.unwrap();
        let entry = session.toggle_improvement(&schedule, 0, true).await.unwrap();
        assert_eq!((entry.program_id, entry.is_selected), (10, true));
        assert_eq!(entry.division_name, "Arts");

        session.apply(FormEdit::AddProgram).unwrap();
        let err = session.toggle_improvement(&schedule, 1, true).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
