//! Form synchronization engine.
//!
//! Every write is a small saga with explicit phases:
//!
//! 1. `questions`: upsert the referenced questions as one concurrent batch and
//!    wait until the whole batch has settled
//! 2. `form`: upsert the form referencing the question ids from phase 1
//! 3. `refetch`: pull a fresh snapshot
//!
//! A failing phase stops the saga. Writes that already succeeded stay
//! committed remotely; there is no compensation step.

use crate::auth::Credential;
use crate::editor::{DraftForm, FormEditor, normalize_alternatives};
use crate::error::{Phase, StoreError, SyncError};
use crate::logging;
use crate::model::{Form, FormUpsert, Question, QuestionUpsert, Snapshot};
use crate::store::RemoteStore;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Logical write operations that may not overlap with themselves
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WriteKind {
    /// Update of the form with this id
    Update(String),
    Create,
    Toggle,
}

/// Why a submit was not attempted. Not an error: the action is just unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// A required name is empty
    EmptyName,
    /// The same operation is already in flight
    InFlight,
    /// No editor is loaded for the requested form
    UnknownForm,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::EmptyName => "name is empty",
            BlockReason::InFlight => "a write is already in flight",
            BlockReason::UnknownForm => "form is not loaded",
        }
    }
}

/// Result of a submit that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// All phases ran; carries the refetched snapshot
    Completed(Snapshot),
    Blocked(BlockReason),
}

/// Marks a write kind busy until dropped; dropping also ends the
/// operation's log context
struct InFlight<'a> {
    writes: &'a Mutex<HashSet<WriteKind>>,
    kind: WriteKind,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut writes = self.writes.lock().unwrap_or_else(|e| e.into_inner());
        writes.remove(&self.kind);
        logging::clear_context();
    }
}

pub struct SyncEngine {
    store: Arc<dyn RemoteStore>,
    writes: Mutex<HashSet<WriteKind>>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            writes: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub fn is_in_flight(&self, kind: &WriteKind) -> bool {
        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(kind)
    }

    fn begin(&self, kind: WriteKind) -> Option<InFlight<'_>> {
        let mut writes = self.writes.lock().unwrap_or_else(|e| e.into_inner());
        if !writes.insert(kind.clone()) {
            return None;
        }
        Some(InFlight {
            writes: &self.writes,
            kind,
        })
    }

    /// Fetch forms and questions together
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, SyncError> {
        let (forms, questions) =
            futures::try_join!(self.store.list_forms(), self.store.list_questions())
                .map_err(|e| fail(Phase::Refetch, e))?;

        let snapshot = Snapshot { forms, questions };
        for (form, question) in snapshot.dangling_references() {
            logging::warn(&format!(
                "Snapshot: form {} references missing question {}",
                form, question
            ));
        }
        logging::debug(&format!(
            "Snapshot: {} forms, {} questions",
            snapshot.forms.len(),
            snapshot.questions.len()
        ));
        Ok(snapshot)
    }

    /// Push an edited existing form: its questions first, then the form with
    /// exactly the editor's question keys as references, then refetch.
    pub async fn update_form(
        &self,
        editor: &FormEditor,
        auth: &Credential,
    ) -> Result<Submission, SyncError> {
        let Some(_guard) = self.begin(WriteKind::Update(editor.form_id().to_string())) else {
            return Ok(Submission::Blocked(BlockReason::InFlight));
        };
        logging::set_operation("update");
        logging::set_form(editor.name());
        logging::info(&format!(
            "Updating form {} with {} questions via {}",
            editor.form_id(),
            editor.question_ids().len(),
            self.store.name()
        ));

        let batch = editor
            .questions()
            .map(|(id, edit)| QuestionUpsert {
                id: Some(id.to_string()),
                text: edit.text.clone(),
                alternatives: normalize_alternatives(&edit.alternatives),
            })
            .collect();
        self.upsert_questions(batch, auth).await?;

        self.upsert_form(
            FormUpsert {
                id: Some(editor.form_id().to_string()),
                name: editor.name().to_string(),
                questions: editor.question_ids(),
            },
            auth,
        )
        .await?;

        let snapshot = self.fetch_snapshot().await?;
        logging::info("Form updated");
        Ok(Submission::Completed(snapshot))
    }

    /// Create a new form from a draft. The draft is re-normalized first, so
    /// blank entries never reach the store.
    pub async fn create_form(
        &self,
        draft: &mut DraftForm,
        auth: &Credential,
    ) -> Result<Submission, SyncError> {
        if draft.name().is_empty() {
            return Ok(Submission::Blocked(BlockReason::EmptyName));
        }
        let Some(_guard) = self.begin(WriteKind::Create) else {
            return Ok(Submission::Blocked(BlockReason::InFlight));
        };

        let (name, texts) = draft.submission();
        logging::set_operation("create");
        logging::set_form(&name);
        logging::info(&format!(
            "Creating form with {} questions via {}",
            texts.len(),
            self.store.name()
        ));

        let batch = texts
            .into_iter()
            .map(|text| QuestionUpsert {
                id: None,
                text,
                alternatives: None,
            })
            .collect();
        let created = self.upsert_questions(batch, auth).await?;

        // Input order is kept; a create that reported no id contributes nothing
        let question_ids: Vec<String> = created
            .into_iter()
            .map(|q| q.id)
            .filter(|id| !id.is_empty())
            .collect();

        let form = self
            .upsert_form(
                FormUpsert {
                    id: None,
                    name,
                    questions: question_ids,
                },
                auth,
            )
            .await?;
        logging::info(&format!("Created form {}", form.id));

        let snapshot = self.fetch_snapshot().await?;
        Ok(Submission::Completed(snapshot))
    }

    /// Flip the active flag of the form called `name`. Nothing changes
    /// locally until the refetch comes back.
    pub async fn toggle_active(
        &self,
        name: &str,
        auth: &Credential,
    ) -> Result<Submission, SyncError> {
        if name.is_empty() {
            return Ok(Submission::Blocked(BlockReason::EmptyName));
        }
        let Some(_guard) = self.begin(WriteKind::Toggle) else {
            return Ok(Submission::Blocked(BlockReason::InFlight));
        };
        logging::set_operation("toggle");
        logging::set_form(name);

        let form = self
            .store
            .toggle_form_active(name, auth)
            .await
            .map_err(|e| fail(Phase::Toggle, e))?;
        logging::info(&format!(
            "Form {} is now {}",
            form.id,
            if form.active { "active" } else { "inactive" }
        ));

        let snapshot = self.fetch_snapshot().await?;
        Ok(Submission::Completed(snapshot))
    }

    /// Phase 1: issue every upsert at once and wait for all of them to settle.
    /// Results come back in input order. The first failure (in input order)
    /// fails the phase; every failure is logged.
    async fn upsert_questions(
        &self,
        batch: Vec<QuestionUpsert>,
        auth: &Credential,
    ) -> Result<Vec<Question>, SyncError> {
        let total = batch.len();
        let results = join_all(
            batch
                .into_iter()
                .map(|data| self.store.upsert_question(data, auth)),
        )
        .await;

        let mut questions = Vec::with_capacity(total);
        let mut first_error: Option<StoreError> = None;
        for result in results {
            match result {
                Ok(question) => questions.push(question),
                Err(e) => {
                    logging::error(&format!("Question upsert failed: {}", e.log_detail()));
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            logging::warn(&format!(
                "{} of {} question upserts committed before the failure",
                questions.len(),
                total
            ));
            return Err(fail(Phase::Questions, e));
        }
        Ok(questions)
    }

    /// Phase 2
    async fn upsert_form(&self, data: FormUpsert, auth: &Credential) -> Result<Form, SyncError> {
        self.store
            .upsert_form(data, auth)
            .await
            .map_err(|e| fail(Phase::Form, e))
    }
}

fn fail(phase: Phase, source: StoreError) -> SyncError {
    logging::error(&format!("Sync failed in {} phase: {}", phase, source.log_detail()));
    SyncError::new(phase, source)
}
