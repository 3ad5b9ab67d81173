//! GraphQL-over-HTTP client for the survey backend.

use super::RemoteStore;
use crate::auth::Credential;
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::logging;
use crate::model::{Form, FormUpsert, Question, QuestionUpsert};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

const GET_QUESTIONS: &str = "query { questions { _id text alternatives } }";

const GET_FORMS: &str = "query { forms { _id name active questions { _id } } }";

const UPSERT_QUESTION: &str = "mutation($data: UpsertQuestion!) { \
     upsertQuestion(data: $data) { _id text alternatives } }";

const UPSERT_FORM: &str = "mutation($data: UpsertForm!) { \
     upsertForm(data: $data) { _id name active questions { _id } } }";

const TOGGLE_ACTIVE_FORM: &str = "mutation($form_name: String!) { \
     toggleActiveForm(form_name: $form_name) { _id name active questions { _id } } }";

pub struct GraphqlStore {
    client: Client,
    endpoint: String,
}

impl GraphqlStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
        auth: Option<&Credential>,
    ) -> Result<T, StoreError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&GraphqlRequest { query, variables });
        if let Some(auth) = auth {
            request = request.header("authorization", auth.as_str());
        }

        let resp = request
            .send()
            .await
            .map_err(|e| StoreError::transport(format!("POST {} failed: {}", self.endpoint, e)))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| StoreError::transport(format!("Failed to read response body: {}", e)))?;

        logging::debug(&format!("graphql HTTP {} ({} bytes)", status, body.len()));
        decode_response(status, &body)
    }
}

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    // Absent and explicit null both mean no errors
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

/// Turn an HTTP status and body into data or a store error.
///
/// GraphQL errors win over the HTTP status: a 400 carrying `errors` is a
/// rejection with the store's messages, not a transport problem.
fn decode_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, StoreError> {
    let parsed: Option<GraphqlResponse<T>> = serde_json::from_str(body).ok();

    if let Some(resp) = parsed {
        let errors = resp.errors.unwrap_or_default();
        if let Some(first) = errors.first() {
            return Err(StoreError::ValidationRejected {
                message: first.message.clone(),
                errors: errors.iter().map(|e| e.message.clone()).collect(),
            });
        }
        if (200..300).contains(&status) {
            if let Some(data) = resp.data {
                return Ok(data);
            }
        }
    }

    if !(200..300).contains(&status) {
        return Err(StoreError::transport(format!(
            "HTTP {}: {}",
            status,
            snippet(body)
        )));
    }
    Err(StoreError::transport(format!(
        "Unexpected response: {}",
        snippet(body)
    )))
}

/// First few hundred bytes of a body, cut on a char boundary
fn snippet(body: &str) -> &str {
    const MAX: usize = 300;
    if body.len() <= MAX {
        return body;
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Form as the backend returns it, with references as objects
#[derive(Deserialize)]
struct FormDoc {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    questions: Vec<IdRef>,
}

#[derive(Deserialize)]
struct IdRef {
    #[serde(rename = "_id")]
    id: String,
}

impl From<FormDoc> for Form {
    fn from(doc: FormDoc) -> Self {
        Form {
            id: doc.id,
            name: doc.name,
            active: doc.active,
            questions: doc.questions.into_iter().map(|q| q.id).collect(),
        }
    }
}

#[derive(Deserialize)]
struct QuestionsData {
    questions: Vec<Question>,
}

#[derive(Deserialize)]
struct FormsData {
    forms: Vec<FormDoc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertQuestionData {
    upsert_question: Option<Question>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertFormData {
    upsert_form: FormDoc,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleActiveFormData {
    toggle_active_form: FormDoc,
}

#[async_trait]
impl RemoteStore for GraphqlStore {
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        let data: QuestionsData = self.execute(GET_QUESTIONS, json!({}), None).await?;
        Ok(data.questions)
    }

    async fn list_forms(&self) -> Result<Vec<Form>, StoreError> {
        let data: FormsData = self.execute(GET_FORMS, json!({}), None).await?;
        Ok(data.forms.into_iter().map(Form::from).collect())
    }

    async fn upsert_question(
        &self,
        data: QuestionUpsert,
        auth: &Credential,
    ) -> Result<Question, StoreError> {
        let text = data.text.clone();
        let resp: UpsertQuestionData = self
            .execute(UPSERT_QUESTION, json!({ "data": data }), Some(auth))
            .await?;
        // A null result still counts as a write; the caller drops the missing id
        Ok(resp.upsert_question.unwrap_or(Question {
            id: String::new(),
            text,
            alternatives: None,
        }))
    }

    async fn upsert_form(&self, data: FormUpsert, auth: &Credential) -> Result<Form, StoreError> {
        let resp: UpsertFormData = self
            .execute(UPSERT_FORM, json!({ "data": data }), Some(auth))
            .await?;
        Ok(resp.upsert_form.into())
    }

    async fn toggle_form_active(&self, name: &str, auth: &Credential) -> Result<Form, StoreError> {
        let resp: ToggleActiveFormData = self
            .execute(TOGGLE_ACTIVE_FORM, json!({ "form_name": name }), Some(auth))
            .await?;
        Ok(resp.toggle_active_form.into())
    }

    fn name(&self) -> &str {
        "graphql"
    }
}
