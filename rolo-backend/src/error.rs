//! Error taxonomy for the agent pipeline
//!
//! Provider failures degrade to empty results inside the clients and never
//! surface here. Everything that does reach a caller is one of these typed
//! variants, so the calling layer can decide between "retry", "fix your
//! configuration", and "give up" without parsing message strings.

use thiserror::Error;

/// A record failed schema validation. Carries every failing field so the
/// caller can see the full shape mismatch at once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed for fields: {}", fields.join(", "))]
pub struct ValidationError {
    pub fields: Vec<String>,
}

impl ValidationError {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

/// Failure modes of structured extraction. Parse and validation failures are
/// deliberately distinct: a parse failure means the model emitted broken JSON
/// even after repair, a validation failure means the JSON was well-formed but
/// the wrong shape.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("model response could not be parsed as JSON: {detail}")]
    Parse { detail: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("chat completion failed: {0}")]
    Generation(String),
}

/// Errors surfaced by the agents. Internal distinctions are preserved for
/// diagnostics; `user_message` collapses them into one readable line.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A required provider credential is not configured. Fatal to the call,
    /// raised before any HTTP request is issued, never retried.
    #[error("missing required credential: {0}")]
    MissingCredential(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The provider was reachable but the call failed outright (as opposed
    /// to the degrade-to-empty path the clients prefer).
    #[error("provider request failed: {0}")]
    Provider(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl AgentError {
    /// One human-readable line for the conversational boundary.
    pub fn user_message(&self) -> String {
        match self {
            AgentError::MissingCredential(what) => {
                format!("This feature is not configured yet ({} is not set).", what)
            }
            AgentError::InvalidArgument(msg) => format!("Invalid request: {}", msg),
            AgentError::Provider(_) => {
                "The data provider is currently unavailable. Please try again shortly.".to_string()
            }
            AgentError::Extract(ExtractError::Parse { .. }) => {
                "The response could not be parsed. Try again, perhaps with a different tone or purpose."
                    .to_string()
            }
            AgentError::Extract(ExtractError::Validation(_)) => {
                "The generated result was incomplete. Please try again.".to_string()
            }
            AgentError::Extract(ExtractError::Generation(_)) => {
                "The language model is currently unavailable. Please try again shortly.".to_string()
            }
        }
    }
}
