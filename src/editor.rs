//! Local edit state for forms and questions.
//!
//! `FormEditor` holds pending patches for an existing form, seeded from a
//! snapshot. `DraftForm` holds the scratch list for a form that does not exist
//! remotely yet and keeps it free of blank entries.

use crate::logging;
use crate::model::{Form, Snapshot};
use thiserror::Error;

pub const DEFAULT_DRAFT_NAME: &str = "New Survey";

/// Separator between alternatives in their edited (single string) form
pub const ALTERNATIVES_DELIMITER: char = '|';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("Question {0} is not part of this form")]
    UnknownQuestion(String),
    #[error("Question slot {index} does not exist (form has {len} slots)")]
    SlotOutOfRange { index: usize, len: usize },
}

/// Split edited alternatives into the stored shape.
///
/// `"a | b |  "` becomes `["a", "b"]`; anything with no non-blank part is `None`.
pub fn normalize_alternatives(raw: &str) -> Option<Vec<String>> {
    let parts: Vec<String> = raw
        .split(ALTERNATIVES_DELIMITER)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();
    if parts.is_empty() { None } else { Some(parts) }
}

/// Inverse of `normalize_alternatives` for seeding an editor
pub fn join_alternatives(alternatives: Option<&[String]>) -> String {
    alternatives
        .map(|alts| alts.join(&ALTERNATIVES_DELIMITER.to_string()))
        .unwrap_or_default()
}

/// Pending patch for one question
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionEdit {
    pub text: String,
    pub alternatives: String,
}

/// Edit set for an existing form.
///
/// The question keys and their order come from the snapshot and never change
/// through editing; they become the form's reference list on submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormEditor {
    form_id: String,
    name: String,
    questions: Vec<(String, QuestionEdit)>,
}

impl FormEditor {
    /// Seed from the authoritative state. References that do not resolve are
    /// left out, so the next submit drops them from the form. A question
    /// referenced twice is keyed once, at its first position.
    pub fn seed(form: &Form, snapshot: &Snapshot) -> Self {
        let mut questions: Vec<(String, QuestionEdit)> = Vec::with_capacity(form.questions.len());
        for id in &form.questions {
            if questions.iter().any(|(seen, _)| seen == id) {
                logging::debug(&format!(
                    "Form {} references question {} more than once",
                    form.id, id
                ));
                continue;
            }
            match snapshot.question(id) {
                Some(question) => questions.push((
                    id.clone(),
                    QuestionEdit {
                        text: question.text.clone(),
                        alternatives: join_alternatives(question.alternatives.as_deref()),
                    },
                )),
                None => logging::warn(&format!(
                    "Form {} references unknown question {}",
                    form.id, id
                )),
            }
        }

        Self {
            form_id: form.id.clone(),
            name: form.name.clone(),
            questions,
        }
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn questions(&self) -> impl Iterator<Item = (&str, &QuestionEdit)> {
        self.questions.iter().map(|(id, edit)| (id.as_str(), edit))
    }

    pub fn question_ids(&self) -> Vec<String> {
        self.questions.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn question(&self, id: &str) -> Option<&QuestionEdit> {
        self.questions
            .iter()
            .find(|(qid, _)| qid == id)
            .map(|(_, edit)| edit)
    }

    fn question_mut(&mut self, id: &str) -> Result<&mut QuestionEdit, EditError> {
        self.questions
            .iter_mut()
            .find(|(qid, _)| qid == id)
            .map(|(_, edit)| edit)
            .ok_or_else(|| EditError::UnknownQuestion(id.to_string()))
    }

    pub fn set_text(&mut self, id: &str, text: &str) -> Result<(), EditError> {
        self.question_mut(id)?.text = text.to_string();
        Ok(())
    }

    pub fn set_alternatives(&mut self, id: &str, alternatives: &str) -> Result<(), EditError> {
        self.question_mut(id)?.alternatives = alternatives.to_string();
        Ok(())
    }
}

/// Scratch state for a form that has not been created yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftForm {
    name: String,
    questions: Vec<String>,
}

impl Default for DraftForm {
    fn default() -> Self {
        Self {
            name: DEFAULT_DRAFT_NAME.to_string(),
            questions: Vec::new(),
        }
    }
}

impl DraftForm {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Stored question texts (never includes the trailing blank slot)
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    /// What the operator sees: the stored texts plus one empty slot to type into
    pub fn slots(&self) -> Vec<&str> {
        self.questions
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(""))
            .collect()
    }

    /// Write into a rendered slot, then reconcile.
    ///
    /// Writing the trailing slot appends a new entry. Returns whether
    /// reconciliation had to drop blank entries.
    pub fn set_slot(&mut self, index: usize, value: &str) -> Result<bool, EditError> {
        let len = self.questions.len();
        match index.cmp(&len) {
            std::cmp::Ordering::Less => self.questions[index] = value.to_string(),
            std::cmp::Ordering::Equal => self.questions.push(value.to_string()),
            std::cmp::Ordering::Greater => {
                return Err(EditError::SlotOutOfRange {
                    index,
                    len: len + 1,
                });
            }
        }
        Ok(self.reconcile())
    }

    /// Stored texts with blank entries removed
    pub fn normalized(&self) -> Vec<String> {
        self.questions
            .iter()
            .filter(|text| !text.is_empty())
            .cloned()
            .collect()
    }

    /// Replace the stored list by its normalized form, only if they differ.
    /// Returns whether anything changed; a second call without edits is a no-op.
    pub fn reconcile(&mut self) -> bool {
        let normalized = self.normalized();
        if normalized == self.questions {
            return false;
        }
        self.questions = normalized;
        true
    }

    /// Re-normalize and hand out what should be submitted
    pub fn submission(&mut self) -> (String, Vec<String>) {
        self.reconcile();
        (self.name.clone(), self.questions.clone())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
