//! Authorization context for write operations.
//!
//! The credential is opaque: it is never validated locally, only attached to
//! writes. An invalid token shows up as a rejection from the store.

use std::time::Duration;
use tokio::time::Instant;

/// How long a revealed credential stays visible
pub const REVEAL_WINDOW: Duration = Duration::from_millis(2000);

/// Credential attached as metadata to every write.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// One `*` per character
    pub fn masked(&self) -> String {
        "*".repeat(self.0.chars().count())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

/// Masked presentation of a credential with transient reveal.
#[derive(Debug, Default)]
pub struct CredentialView {
    revealed_at: Option<Instant>,
}

impl CredentialView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the credential; it re-masks itself after `REVEAL_WINDOW`.
    /// Revealing again restarts the window.
    pub fn reveal(&mut self) {
        self.revealed_at = Some(Instant::now());
    }

    pub fn hide(&mut self) {
        self.revealed_at = None;
    }

    /// Flip between masked and revealed
    pub fn toggle(&mut self) {
        if self.is_hidden() {
            self.reveal();
        } else {
            self.hide();
        }
    }

    pub fn is_hidden(&self) -> bool {
        match self.revealed_at {
            Some(at) => at.elapsed() >= REVEAL_WINDOW,
            None => true,
        }
    }

    /// Time left until the credential masks itself again
    pub fn remaining(&self) -> Option<Duration> {
        let at = self.revealed_at?;
        REVEAL_WINDOW.checked_sub(at.elapsed()).filter(|d| !d.is_zero())
    }

    pub fn render(&self, credential: &Credential) -> String {
        if self.is_hidden() {
            credential.masked()
        } else {
            credential.as_str().to_string()
        }
    }
}
