//! Provider-neutral text generation.
//!
//! Clients never retry. They report failures with an [`ErrorKind`] and the
//! engine decides what to do about them.

use async_trait::async_trait;
use reqwest::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// What the provider sees besides the persona.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationInput {
    /// Just the user's latest message.
    Message(String),
    /// Recent turns, oldest first.
    History(Vec<ConversationTurn>),
}

impl ConversationInput {
    /// Flatten into turns for providers that only take a turn list.
    pub fn turns(&self) -> Vec<ConversationTurn> {
        match self {
            Self::Message(text) => vec![ConversationTurn::user(text.clone())],
            Self::History(turns) => turns.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Provider is temporarily unavailable (HTTP 503). The only retryable kind.
    Overloaded,
    /// Credentials rejected.
    Unauthorized,
    /// Request rejected as malformed or unknown model.
    BadRequest,
    /// Quota or rate limit exhausted.
    Quota,
    /// Any other non-success status.
    Api,
    /// Request never got a response.
    Transport,
    /// Response body could not be understood.
    Parse,
    /// Provider answered without any text.
    Empty,
}

impl ErrorKind {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            503 => Self::Overloaded,
            401 | 403 => Self::Unauthorized,
            400 | 404 | 422 => Self::BadRequest,
            429 => Self::Quota,
            _ => Self::Api,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationError {
    pub kind: ErrorKind,
    pub provider: &'static str,
    pub detail: String,
}

impl GenerationError {
    pub fn new(kind: ErrorKind, provider: &'static str, detail: impl Into<String>) -> Self {
        Self { kind, provider, detail: detail.into() }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Overloaded
    }
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:?}: {}", self.provider, self.kind, self.detail)
    }
}

impl std::error::Error for GenerationError {}

/// A text-generation backend.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Produce a reply for `input` under the `persona` system instruction.
    /// An empty string means the provider answered with no text.
    async fn generate(&self, persona: &str, input: &ConversationInput) -> Result<String, GenerationError>;
}
