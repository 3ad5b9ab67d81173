//! Operator session: snapshot, editors, remembered settings and the error
//! panel, wired to the sync engine.
//!
//! Every successful refetch replaces the snapshot. The editor of a submitted
//! form is re-seeded from it; any other editor is re-seeded only when its
//! form's name or questions changed remotely, so pending edits survive
//! unrelated writes.

use crate::auth::CredentialView;
use crate::editor::{DraftForm, FormEditor};
use crate::error::SyncError;
use crate::logging;
use crate::model::Snapshot;
use crate::panel::{ErrorPanel, ErrorSource};
use crate::settings::Settings;
use crate::store::RemoteStore;
use crate::sync::{BlockReason, Submission, SyncEngine};
use std::sync::Arc;

/// What happened to a submit, as seen by the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Blocked(BlockReason),
    /// The error is in the panel
    Failed,
}

pub struct AdminSession {
    engine: SyncEngine,
    settings: Settings,
    credential_view: CredentialView,
    snapshot: Snapshot,
    editors: Vec<FormEditor>,
    draft: DraftForm,
    errors: ErrorPanel,
}

impl AdminSession {
    pub fn new(store: Arc<dyn RemoteStore>, settings: Settings) -> Self {
        Self {
            engine: SyncEngine::new(store),
            settings,
            credential_view: CredentialView::new(),
            snapshot: Snapshot::default(),
            editors: Vec::new(),
            draft: DraftForm::default(),
            errors: ErrorPanel::new(),
        }
    }

    /// Load the snapshot (initial load or manual refresh)
    pub async fn refresh(&mut self) -> Result<(), SyncError> {
        let snapshot = self.engine.fetch_snapshot().await?;
        self.apply_snapshot(snapshot, None);
        Ok(())
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot, submitted: Option<&str>) {
        let previous = std::mem::take(&mut self.editors);
        let mut editors = Vec::with_capacity(snapshot.forms.len());
        for form in &snapshot.forms {
            let fresh = FormEditor::seed(form, &snapshot);
            let kept = previous.iter().find(|e| e.form_id() == form.id).filter(|_| {
                submitted != Some(form.id.as_str())
                    && self
                        .snapshot
                        .form(&form.id)
                        .is_some_and(|old| FormEditor::seed(old, &self.snapshot) == fresh)
            });
            editors.push(kept.cloned().unwrap_or(fresh));
        }
        self.editors = editors;
        self.snapshot = snapshot;
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn credential_view(&self) -> &CredentialView {
        &self.credential_view
    }

    pub fn credential_view_mut(&mut self) -> &mut CredentialView {
        &mut self.credential_view
    }

    /// Credential as the operator should see it right now
    pub fn rendered_credential(&self) -> String {
        self.credential_view.render(&self.settings.authorization())
    }

    pub fn errors(&self) -> &ErrorPanel {
        &self.errors
    }

    pub fn editors(&self) -> &[FormEditor] {
        &self.editors
    }

    pub fn editor(&self, form_id: &str) -> Option<&FormEditor> {
        self.editors.iter().find(|e| e.form_id() == form_id)
    }

    pub fn editor_mut(&mut self, form_id: &str) -> Option<&mut FormEditor> {
        self.editors.iter_mut().find(|e| e.form_id() == form_id)
    }

    pub fn draft(&self) -> &DraftForm {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut DraftForm {
        &mut self.draft
    }

    /// Submit the edits of one existing form
    pub async fn submit_update(&mut self, form_id: &str) -> Outcome {
        let Some(editor) = self.editor(form_id).cloned() else {
            return Outcome::Blocked(BlockReason::UnknownForm);
        };
        // Read at issue time; later changes do not affect this submit
        let auth = self.settings.authorization();
        let result = self.engine.update_form(&editor, &auth).await;
        self.finish(ErrorSource::UpdateForm, result, Some(form_id))
    }

    /// Submit the draft as a new form; the draft resets on success
    pub async fn submit_create(&mut self) -> Outcome {
        let auth = self.settings.authorization();
        let result = self.engine.create_form(&mut self.draft, &auth).await;
        let outcome = self.finish(ErrorSource::CreateForm, result, None);
        if outcome == Outcome::Completed {
            self.draft.reset();
        }
        outcome
    }

    /// Toggle the remembered target form
    pub async fn toggle_active(&mut self) -> Outcome {
        let auth = self.settings.authorization();
        let name = self.settings.toggle_target().to_string();
        let result = self.engine.toggle_active(&name, &auth).await;
        self.finish(ErrorSource::ToggleActive, result, None)
    }

    fn finish(
        &mut self,
        source: ErrorSource,
        result: Result<Submission, SyncError>,
        submitted: Option<&str>,
    ) -> Outcome {
        let outcome = match result {
            Ok(Submission::Completed(snapshot)) => {
                self.errors.clear(source);
                self.apply_snapshot(snapshot, submitted);
                Outcome::Completed
            }
            Ok(Submission::Blocked(reason)) => {
                logging::debug(&format!("{:?} blocked: {}", source, reason.as_str()));
                Outcome::Blocked(reason)
            }
            Err(e) => {
                self.errors.set(source, Some(e));
                Outcome::Failed
            }
        };
        outcome
    }
}
