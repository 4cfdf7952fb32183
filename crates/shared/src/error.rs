use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User-facing error taxonomy for the booth flows.
///
/// Every variant is recoverable: the flows return to an interactive state
/// with a message rather than terminating the process.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum BoothError {
    /// A required form field is missing or empty.
    #[error("missing required field: {0}")]
    Validation(String),
    /// The remote store rejected the insert on the email unique constraint.
    /// Distinct from the generic remote path so the UI can show
    /// "this email has already been entered".
    #[error("this email has already been entered")]
    DuplicateEntry,
    /// Any other store or network failure, surfaced verbatim.
    #[error("remote store error: {0}")]
    Remote(String),
    /// Admin secret mismatch; the gate simply re-prompts.
    #[error("incorrect PIN")]
    Auth,
}

impl BoothError {
    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation(field.into())
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }
}
