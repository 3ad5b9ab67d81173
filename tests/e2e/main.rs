//! End-to-end tests for surveyctl using a recording store
//!
//! These tests drive a full operator session against the in-process store
//! and check exactly which calls reached the backend.

mod mock_store;

use anyhow::Result;
use mock_store::{Call, RecordingStore};
use std::sync::Arc;
use surveyctl::admin::{AdminSession, Outcome};
use surveyctl::error::{Phase, StoreError};
use surveyctl::model::QuestionUpsert;
use surveyctl::panel::ErrorSource;
use surveyctl::settings::Settings;
use surveyctl::store::memory::MemoryStore;
use surveyctl::sync::BlockReason;

async fn session_over(store: &Arc<MemoryStore>) -> Result<(AdminSession, Arc<RecordingStore>)> {
    let recorder = Arc::new(RecordingStore::new(store.clone()));
    let mut session = AdminSession::new(recorder.clone(), Settings::in_memory());
    session.refresh().await?;
    recorder.forget();
    Ok((session, recorder))
}

/// A draft without a name never reaches the store
#[tokio::test]
async fn test_create_without_name_issues_no_call() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let (mut session, recorder) = session_over(&store).await?;

    session.draft_mut().set_name("");
    session.draft_mut().set_slot(0, "Q1")?;

    assert_eq!(
        session.submit_create().await,
        Outcome::Blocked(BlockReason::EmptyName)
    );
    assert!(recorder.calls().is_empty());
    assert!(session.errors().is_empty());
    Ok(())
}

/// Alternatives typed as a delimited string are sent as a cleaned list
#[tokio::test]
async fn test_update_sends_normalized_alternatives() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let q = store.insert_question("Color", None);
    let form = store.insert_form("Gustos", &[q.clone()], true);
    let (mut session, recorder) = session_over(&store).await?;
    session.settings_mut().set_authorization("tok")?;

    let editor = session.editor_mut(&form).expect("form is seeded");
    editor.set_alternatives(&q, " a | | b ")?;

    assert_eq!(session.submit_update(&form).await, Outcome::Completed);
    assert_eq!(
        recorder.writes()[0],
        Call::UpsertQuestion {
            data: QuestionUpsert {
                id: Some(q.clone()),
                text: "Color".to_string(),
                alternatives: Some(vec!["a".to_string(), "b".to_string()]),
            },
            auth: "tok".to_string(),
        }
    );
    assert_eq!(
        store.question(&q).and_then(|q| q.alternatives),
        Some(vec!["a".to_string(), "b".to_string()])
    );
    Ok(())
}

/// Clearing the alternatives turns the question back into free response
#[tokio::test]
async fn test_update_with_blank_alternatives_sends_none() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let q = store.insert_question("Comentarios", Some(&["si", "no"]));
    let form = store.insert_form("Cierre", &[q.clone()], true);
    let (mut session, _recorder) = session_over(&store).await?;

    session
        .editor_mut(&form)
        .expect("form is seeded")
        .set_alternatives(&q, " | ")?;

    assert_eq!(session.submit_update(&form).await, Outcome::Completed);
    assert_eq!(store.question(&q).and_then(|q| q.alternatives), None);
    Ok(())
}

/// One failed question upsert stops the saga before the form write
#[tokio::test]
async fn test_failed_question_skips_form_write() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let q1 = store.insert_question("Uno", None);
    let q2 = store.insert_question("Dos", None);
    let form = store.insert_form("Par", &[q1.clone(), q2.clone()], true);
    store.fail_question("Dos (rota)", StoreError::rejected("text too long"));
    let (mut session, recorder) = session_over(&store).await?;

    let editor = session.editor_mut(&form).expect("form is seeded");
    editor.set_text(&q1, "Uno (nueva)")?;
    editor.set_text(&q2, "Dos (rota)")?;
    editor.set_name("Par renombrado");

    assert_eq!(session.submit_update(&form).await, Outcome::Failed);

    let writes = recorder.writes();
    assert_eq!(writes.len(), 2);
    assert!(writes.iter().all(|c| matches!(c, Call::UpsertQuestion { .. })));
    assert!(!recorder.calls().contains(&Call::ListForms));

    let error = session
        .errors()
        .get(ErrorSource::UpdateForm)
        .expect("error recorded");
    assert_eq!(error.phase, Phase::Questions);
    assert_eq!(session.errors().headline().as_deref(), Some("text too long"));

    // The sibling upsert already committed; the form itself is untouched
    assert_eq!(store.question(&q1).map(|q| q.text).as_deref(), Some("Uno (nueva)"));
    assert_eq!(store.form_by_name("Par").map(|f| f.id), Some(form));
    Ok(())
}

/// A rejected form write leaves the questions committed and skips the refetch
#[tokio::test]
async fn test_failed_form_write_skips_refetch() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let q1 = store.insert_question("Uno", None);
    let q2 = store.insert_question("Dos", None);
    let form = store.insert_form("Par", &[q1.clone(), q2.clone()], true);
    let (mut session, recorder) = session_over(&store).await?;
    store.fail_forms(StoreError::rejected("name already taken"));

    let editor = session.editor_mut(&form).expect("form is seeded");
    editor.set_text(&q1, "Uno (nueva)")?;
    editor.set_text(&q2, "Dos (nueva)")?;
    editor.set_name("Otro nombre");

    assert_eq!(session.submit_update(&form).await, Outcome::Failed);

    let error = session
        .errors()
        .get(ErrorSource::UpdateForm)
        .expect("error recorded");
    assert_eq!(error.phase, Phase::Form);
    assert_eq!(error.to_string(), "name already taken");

    let calls = recorder.calls();
    let form_write = calls
        .iter()
        .position(|c| matches!(c, Call::UpsertForm { .. }))
        .expect("form write issued");
    assert_eq!(form_write, calls.len() - 1);
    assert!(!calls.contains(&Call::ListForms));
    assert!(!calls.contains(&Call::ListQuestions));

    assert_eq!(store.question(&q1).map(|q| q.text).as_deref(), Some("Uno (nueva)"));
    assert_eq!(store.question(&q2).map(|q| q.text).as_deref(), Some("Dos (nueva)"));
    assert!(store.form_by_name("Otro nombre").is_none());
    Ok(())
}

/// Blank draft slots are dropped and the form references the new questions in order
#[tokio::test]
async fn test_create_skips_blank_entries() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let (mut session, recorder) = session_over(&store).await?;

    let draft = session.draft_mut();
    draft.set_name("Nueva");
    draft.set_slot(0, "Q1")?;
    draft.set_slot(1, "")?;
    draft.set_slot(1, "Q2")?;

    assert_eq!(session.submit_create().await, Outcome::Completed);

    let question_writes = recorder
        .writes()
        .into_iter()
        .filter(|c| matches!(c, Call::UpsertQuestion { .. }))
        .count();
    assert_eq!(question_writes, 2);

    let created = store.form_by_name("Nueva").expect("form created");
    assert!(created.active);
    let texts: Vec<String> = created
        .questions
        .iter()
        .filter_map(|id| store.question(id))
        .map(|q| q.text)
        .collect();
    assert_eq!(texts, vec!["Q1", "Q2"]);
    assert_eq!(session.draft().questions(), &[] as &[String]);
    Ok(())
}

/// A question the store created without reporting an id is not referenced
#[tokio::test]
async fn test_create_drops_questions_without_id() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.withhold_id_for("Q2");
    let (mut session, _recorder) = session_over(&store).await?;

    let draft = session.draft_mut();
    draft.set_name("Parcial");
    for text in ["Q1", "Q2", "Q3"] {
        draft.set_slot(draft.questions().len(), text)?;
    }

    assert_eq!(session.submit_create().await, Outcome::Completed);
    let created = store.form_by_name("Parcial").expect("form created");
    assert_eq!(created.questions.len(), 2);
    Ok(())
}

/// Toggling a name the store does not know changes nothing
#[tokio::test]
async fn test_toggle_unknown_name_reports_error() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.insert_form("Transporte", &[], true);
    let (mut session, recorder) = session_over(&store).await?;

    session.settings_mut().set_toggle_target("Transportes")?;
    assert_eq!(session.toggle_active().await, Outcome::Failed);

    assert_eq!(
        recorder.writes(),
        vec![Call::ToggleActive {
            name: "Transportes".to_string(),
            auth: String::new(),
        }]
    );
    assert!(store.form_by_name("Transporte").is_some_and(|f| f.active));
    let rendered = session.errors().render().expect("panel shows the error");
    assert!(rendered.contains("Form \"Transportes\" not found"));
    Ok(())
}

/// Writes carry the credential stored at the time they are issued
#[tokio::test]
async fn test_writes_use_current_credential() -> Result<()> {
    let store = Arc::new(MemoryStore::with_credential("good"));
    store.insert_form("Salud", &[], false);
    let (mut session, recorder) = session_over(&store).await?;
    session.settings_mut().set_toggle_target("Salud")?;

    session.settings_mut().set_authorization("bad")?;
    assert_eq!(session.toggle_active().await, Outcome::Failed);
    assert_eq!(session.errors().headline().as_deref(), Some("Unauthorized"));

    session.settings_mut().set_authorization("good")?;
    assert_eq!(session.toggle_active().await, Outcome::Completed);
    assert!(session.errors().is_empty());
    assert!(session.snapshot().form_by_name("Salud").is_some_and(|f| f.active));

    let auths: Vec<String> = recorder
        .writes()
        .into_iter()
        .filter_map(|c| match c {
            Call::ToggleActive { auth, .. } => Some(auth),
            _ => None,
        })
        .collect();
    assert_eq!(auths, vec!["bad", "good"]);
    Ok(())
}

/// The credential and toggle target survive a restart
#[tokio::test]
async fn test_settings_persist_across_sessions() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state.json");
    let store = Arc::new(MemoryStore::new());
    store.insert_form("Empleo", &[], true);

    {
        let mut session = AdminSession::new(store.clone(), Settings::load_from(&path));
        session.refresh().await?;
        session.settings_mut().set_authorization("secreto")?;
        session.settings_mut().set_toggle_target("Empleo")?;
    }

    let mut session = AdminSession::new(store.clone(), Settings::load_from(&path));
    session.refresh().await?;
    assert_eq!(session.settings().authorization().as_str(), "secreto");
    assert_eq!(session.settings().toggle_target(), "Empleo");
    assert_eq!(session.rendered_credential(), "*******");

    assert_eq!(session.toggle_active().await, Outcome::Completed);
    assert!(store.form_by_name("Empleo").is_some_and(|f| !f.active));
    Ok(())
}
