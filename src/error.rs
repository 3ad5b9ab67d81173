use thiserror::Error;

/// Failure reported by a remote store call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store rejected the request (schema, permission or lookup failure).
    /// `message` is the store's headline; `errors` holds every nested message.
    #[error("{message}")]
    ValidationRejected { message: String, errors: Vec<String> },

    /// The store could not be reached or answered with garbage.
    /// `detail` is for the log only.
    #[error("Network error: could not reach the survey store")]
    TransportFailure { detail: String },
}

impl StoreError {
    pub fn rejected(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::ValidationRejected {
            errors: vec![message.clone()],
            message,
        }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self::TransportFailure {
            detail: detail.into(),
        }
    }

    /// Structured error list as provided by the store
    pub fn errors(&self) -> &[String] {
        match self {
            Self::ValidationRejected { errors, .. } => errors,
            Self::TransportFailure { .. } => &[],
        }
    }

    /// Everything worth writing to the log
    pub fn log_detail(&self) -> String {
        match self {
            Self::ValidationRejected { message, errors } => {
                format!("rejected: {} {:?}", message, errors)
            }
            Self::TransportFailure { detail } => format!("transport: {}", detail),
        }
    }
}

/// Step of a synchronization in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Batch of question upserts
    Questions,
    /// Upsert of the form referencing the questions
    Form,
    /// Snapshot refetch
    Refetch,
    /// Active-flag toggle
    Toggle,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Questions => "questions",
            Phase::Form => "form",
            Phase::Refetch => "refetch",
            Phase::Toggle => "toggle",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A store failure tagged with the phase it interrupted.
///
/// Displays as the store's message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{source}")]
pub struct SyncError {
    pub phase: Phase,
    #[source]
    pub source: StoreError,
}

impl SyncError {
    pub fn new(phase: Phase, source: StoreError) -> Self {
        Self { phase, source }
    }

    pub fn errors(&self) -> &[String] {
        self.source.errors()
    }
}
