//! In-process survey store.
//!
//! Behaves like the remote backend (assigns ids, rejects unknown references,
//! enforces an optional credential) and can be told to fail specific writes.

use super::RemoteStore;
use crate::auth::Credential;
use crate::error::StoreError;
use crate::model::{Form, FormUpsert, Question, QuestionUpsert};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct State {
    questions: Vec<Question>,
    forms: Vec<Form>,
    next_id: u64,
    required_credential: Option<String>,
    question_failures: HashMap<String, StoreError>,
    form_failure: Option<StoreError>,
    anonymous_texts: HashSet<String>,
}

impl State {
    fn assign_id(&mut self) -> String {
        self.next_id += 1;
        // Same shape as the backend's document ids
        format!("{:024x}", self.next_id)
    }

    fn authorize(&self, auth: &Credential) -> Result<(), StoreError> {
        match &self.required_credential {
            Some(expected) if expected != auth.as_str() => {
                Err(StoreError::rejected("Unauthorized"))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every write whose credential differs from `token`
    pub fn with_credential(token: &str) -> Self {
        let store = Self::new();
        store.lock().required_credential = Some(token.to_string());
        store
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert_question(&self, text: &str, alternatives: Option<&[&str]>) -> String {
        let mut state = self.lock();
        let id = state.assign_id();
        state.questions.push(Question {
            id: id.clone(),
            text: text.to_string(),
            alternatives: alternatives.map(|alts| alts.iter().map(|a| a.to_string()).collect()),
        });
        id
    }

    pub fn insert_form(&self, name: &str, questions: &[String], active: bool) -> String {
        let mut state = self.lock();
        let id = state.assign_id();
        state.forms.push(Form {
            id: id.clone(),
            name: name.to_string(),
            active,
            questions: questions.to_vec(),
        });
        id
    }

    /// Make upserts of a question with this text fail
    pub fn fail_question(&self, text: &str, error: StoreError) {
        self.lock().question_failures.insert(text.to_string(), error);
    }

    /// Make every form upsert fail
    pub fn fail_forms(&self, error: StoreError) {
        self.lock().form_failure = Some(error);
    }

    /// Creating a question with this text succeeds but reports no identifier
    pub fn withhold_id_for(&self, text: &str) {
        self.lock().anonymous_texts.insert(text.to_string());
    }

    pub fn questions(&self) -> Vec<Question> {
        self.lock().questions.clone()
    }

    pub fn forms(&self) -> Vec<Form> {
        self.lock().forms.clone()
    }

    pub fn form_by_name(&self, name: &str) -> Option<Form> {
        self.lock().forms.iter().find(|f| f.name == name).cloned()
    }

    pub fn question(&self, id: &str) -> Option<Question> {
        self.lock().questions.iter().find(|q| q.id == id).cloned()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        Ok(self.questions())
    }

    async fn list_forms(&self) -> Result<Vec<Form>, StoreError> {
        Ok(self.forms())
    }

    async fn upsert_question(
        &self,
        data: QuestionUpsert,
        auth: &Credential,
    ) -> Result<Question, StoreError> {
        // Let sibling upserts of the same batch interleave
        tokio::task::yield_now().await;

        let mut state = self.lock();
        state.authorize(auth)?;
        if let Some(error) = state.question_failures.get(&data.text) {
            return Err(error.clone());
        }
        if data.alternatives.as_ref().is_some_and(|alts| alts.is_empty()) {
            return Err(StoreError::rejected("alternatives must not be empty"));
        }

        match data.id {
            Some(id) => {
                let question = state
                    .questions
                    .iter_mut()
                    .find(|q| q.id == id)
                    .ok_or_else(|| StoreError::rejected(format!("Question {} not found", id)))?;
                question.text = data.text;
                question.alternatives = data.alternatives;
                Ok(question.clone())
            }
            None => {
                let id = state.assign_id();
                let question = Question {
                    id,
                    text: data.text,
                    alternatives: data.alternatives,
                };
                state.questions.push(question.clone());
                if state.anonymous_texts.contains(&question.text) {
                    return Ok(Question {
                        id: String::new(),
                        ..question
                    });
                }
                Ok(question)
            }
        }
    }

    async fn upsert_form(&self, data: FormUpsert, auth: &Credential) -> Result<Form, StoreError> {
        tokio::task::yield_now().await;

        let mut state = self.lock();
        state.authorize(auth)?;
        if let Some(error) = &state.form_failure {
            return Err(error.clone());
        }
        if let Some(missing) = data
            .questions
            .iter()
            .find(|id| !state.questions.iter().any(|q| &q.id == *id))
        {
            return Err(StoreError::rejected(format!("Question {} not found", missing)));
        }

        match data.id {
            Some(id) => {
                let form = state
                    .forms
                    .iter_mut()
                    .find(|f| f.id == id)
                    .ok_or_else(|| StoreError::rejected(format!("Form {} not found", id)))?;
                form.name = data.name;
                form.questions = data.questions;
                Ok(form.clone())
            }
            None => {
                let id = state.assign_id();
                let form = Form {
                    id,
                    name: data.name,
                    active: true,
                    questions: data.questions,
                };
                state.forms.push(form.clone());
                Ok(form)
            }
        }
    }

    async fn toggle_form_active(&self, name: &str, auth: &Credential) -> Result<Form, StoreError> {
        tokio::task::yield_now().await;

        let mut state = self.lock();
        state.authorize(auth)?;
        let form = state
            .forms
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| StoreError::rejected(format!("Form \"{}\" not found", name)))?;
        form.active = !form.active;
        Ok(form.clone())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
