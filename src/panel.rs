use crate::error::SyncError;
use crate::logging;
use serde_json::json;

/// The three write paths whose failures are reported together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    UpdateForm,
    CreateForm,
    ToggleActive,
}

/// Aggregated error display for all write paths.
///
/// Each path owns one slot. The headline is the first present message in
/// slot order; the list joins every slot's structured errors.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorPanel {
    update_form: Option<SyncError>,
    create_form: Option<SyncError>,
    toggle_active: Option<SyncError>,
}

impl ErrorPanel {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, source: ErrorSource) -> &mut Option<SyncError> {
        match source {
            ErrorSource::UpdateForm => &mut self.update_form,
            ErrorSource::CreateForm => &mut self.create_form,
            ErrorSource::ToggleActive => &mut self.toggle_active,
        }
    }

    pub fn get(&self, source: ErrorSource) -> Option<&SyncError> {
        match source {
            ErrorSource::UpdateForm => self.update_form.as_ref(),
            ErrorSource::CreateForm => self.create_form.as_ref(),
            ErrorSource::ToggleActive => self.toggle_active.as_ref(),
        }
    }

    /// Replace one slot. Whenever any slot changes, the combined state is
    /// logged again. Returns whether the slot changed.
    pub fn set(&mut self, source: ErrorSource, error: Option<SyncError>) -> bool {
        let slot = self.slot_mut(source);
        if *slot == error {
            return false;
        }
        *slot = error;
        if !self.is_empty() {
            logging::error(&self.log_entry());
        }
        true
    }

    pub fn clear(&mut self, source: ErrorSource) -> bool {
        self.set(source, None)
    }

    fn slots(&self) -> [Option<&SyncError>; 3] {
        [
            self.update_form.as_ref(),
            self.create_form.as_ref(),
            self.toggle_active.as_ref(),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.slots().iter().all(Option::is_none)
    }

    pub fn headline(&self) -> Option<String> {
        self.slots().into_iter().flatten().next().map(|e| e.to_string())
    }

    pub fn details(&self) -> Vec<&str> {
        self.slots()
            .into_iter()
            .flatten()
            .flat_map(|e| e.errors().iter().map(String::as_str))
            .collect()
    }

    /// Text block for the operator, or `None` when there is nothing to show
    pub fn render(&self) -> Option<String> {
        let headline = self.headline()?;
        let mut out = format!("Error!\n{}\n", headline);
        for detail in self.details() {
            out.push_str("  - ");
            out.push_str(detail);
            out.push('\n');
        }
        Some(out)
    }

    fn log_entry(&self) -> String {
        let describe = |e: Option<&SyncError>| {
            e.map(|e| {
                json!({
                    "phase": e.phase.as_str(),
                    "message": e.to_string(),
                    "errors": e.errors(),
                    "detail": e.source.log_detail(),
                })
            })
        };
        let entry = json!({
            "errorUpdateForm": describe(self.update_form.as_ref()),
            "errorCreateForm": describe(self.create_form.as_ref()),
            "errorToggleActive": describe(self.toggle_active.as_ref()),
        });
        serde_json::to_string_pretty(&entry).unwrap_or_else(|_| entry.to_string())
    }
}
