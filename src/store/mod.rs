pub mod graphql;
pub mod memory;

use crate::auth::Credential;
use crate::error::StoreError;
use crate::model::{Form, FormUpsert, Question, QuestionUpsert};
use async_trait::async_trait;

/// Remote survey store.
///
/// Reads are unauthenticated; every write carries the credential current at
/// the moment the call is issued. Authorization is enforced by the store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_questions(&self) -> Result<Vec<Question>, StoreError>;

    /// Forms with their active flag and ordered question references
    async fn list_forms(&self) -> Result<Vec<Form>, StoreError>;

    /// Create (no id) or update a question. The returned question carries
    /// the identifier assigned by the store, which may be empty.
    async fn upsert_question(
        &self,
        data: QuestionUpsert,
        auth: &Credential,
    ) -> Result<Question, StoreError>;

    async fn upsert_form(&self, data: FormUpsert, auth: &Credential) -> Result<Form, StoreError>;

    /// Flip the active flag of the form with this name
    async fn toggle_form_active(&self, name: &str, auth: &Credential) -> Result<Form, StoreError>;

    /// Short label for logs
    fn name(&self) -> &str;
}
