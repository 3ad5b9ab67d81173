use serde::{Deserialize, Serialize};

/// A question as stored remotely.
///
/// `alternatives: None` means free response; the store never holds an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub alternatives: Option<Vec<String>>,
}

/// A form: a named, ordered list of question references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub questions: Vec<String>,
}

/// Create-or-update payload for a question. `id: None` creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionUpsert {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    pub alternatives: Option<Vec<String>>,
}

/// Create-or-update payload for a form. `id: None` creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormUpsert {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub questions: Vec<String>,
}

/// Forms and questions as last fetched from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub forms: Vec<Form>,
    pub questions: Vec<Question>,
}

impl Snapshot {
    pub fn form(&self, id: &str) -> Option<&Form> {
        self.forms.iter().find(|form| form.id == id)
    }

    pub fn form_by_name(&self, name: &str) -> Option<&Form> {
        self.forms.iter().find(|form| form.name == name)
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    /// Resolve a form's references in order, skipping any that do not resolve.
    pub fn form_questions<'a>(&'a self, form: &'a Form) -> impl Iterator<Item = &'a Question> + 'a {
        form.questions.iter().filter_map(|id| self.question(id))
    }

    /// References that do not resolve to a known question.
    pub fn dangling_references(&self) -> Vec<(&str, &str)> {
        self.forms
            .iter()
            .flat_map(|form| {
                form.questions
                    .iter()
                    .filter(|id| self.question(id).is_none())
                    .map(move |id| (form.id.as_str(), id.as_str()))
            })
            .collect()
    }
}
