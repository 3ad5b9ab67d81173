//! Recording store for e2e tests
//!
//! Wraps the in-process store and records every call in the order it was
//! issued, so tests can assert on what reached the backend.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use surveyctl::auth::Credential;
use surveyctl::error::StoreError;
use surveyctl::model::{Form, FormUpsert, Question, QuestionUpsert};
use surveyctl::store::RemoteStore;
use surveyctl::store::memory::MemoryStore;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListQuestions,
    ListForms,
    UpsertQuestion { data: QuestionUpsert, auth: String },
    UpsertForm { data: FormUpsert, auth: String },
    ToggleActive { name: String, auth: String },
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::ListQuestions | Call::ListForms)
    }
}

pub struct RecordingStore {
    inner: Arc<MemoryStore>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn forget(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RemoteStore for RecordingStore {
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        self.record(Call::ListQuestions);
        self.inner.list_questions().await
    }

    async fn list_forms(&self) -> Result<Vec<Form>, StoreError> {
        self.record(Call::ListForms);
        self.inner.list_forms().await
    }

    async fn upsert_question(
        &self,
        data: QuestionUpsert,
        auth: &Credential,
    ) -> Result<Question, StoreError> {
        self.record(Call::UpsertQuestion {
            data: data.clone(),
            auth: auth.as_str().to_string(),
        });
        self.inner.upsert_question(data, auth).await
    }

    async fn upsert_form(&self, data: FormUpsert, auth: &Credential) -> Result<Form, StoreError> {
        self.record(Call::UpsertForm {
            data: data.clone(),
            auth: auth.as_str().to_string(),
        });
        self.inner.upsert_form(data, auth).await
    }

    async fn toggle_form_active(&self, name: &str, auth: &Credential) -> Result<Form, StoreError> {
        self.record(Call::ToggleActive {
            name: name.to_string(),
            auth: auth.as_str().to_string(),
        });
        self.inner.toggle_form_active(name, auth).await
    }

    fn name(&self) -> &str {
        "recording"
    }
}
