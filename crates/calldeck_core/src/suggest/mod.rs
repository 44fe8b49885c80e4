//! External text-generation collaborator.
//!
//! # Responsibility
//! - Define the JSON-in/JSON-out contract for script drafting and queue
//!   prioritization.
//! - Provide an HTTP client for an OpenAI-compatible chat completions API.
//!
//! # Invariants
//! - Suggestions are advisory: callers degrade on every `SuggestError`.
//! - Failed and timed-out requests are reported the same way and never
//!   retried automatically.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod openrouter;

pub use openrouter::OpenRouterClient;

/// Contact fields sent for script drafting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptContact {
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRequest {
    pub contact: ScriptContact,
    /// Recent notes, newest first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<String>>,
}

/// Drafted call opening and a paste-ready chat message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSuggestion {
    #[serde(default)]
    pub call_script: String,
    #[serde(default)]
    pub whatsapp_message: String,
}

/// One contact as seen by the ranking model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCandidate {
    pub id: String,
    pub full_name: String,
    /// RFC 3339 timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_engaged_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactions_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioritizeRequest {
    pub contacts: Vec<PriorityCandidate>,
}

/// Suggested call order; identifiers are untrusted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityResponse {
    #[serde(default)]
    pub ordered_ids: Vec<String>,
}

/// Advisory collaborator for scripts and ranking.
pub trait SuggestionClient {
    fn request_script(&self, request: &ScriptRequest) -> Result<ScriptSuggestion, SuggestError>;
    fn request_priority(
        &self,
        request: &PrioritizeRequest,
    ) -> Result<PriorityResponse, SuggestError>;
}

impl<T: SuggestionClient + ?Sized> SuggestionClient for &T {
    fn request_script(&self, request: &ScriptRequest) -> Result<ScriptSuggestion, SuggestError> {
        (**self).request_script(request)
    }

    fn request_priority(
        &self,
        request: &PrioritizeRequest,
    ) -> Result<PriorityResponse, SuggestError> {
        (**self).request_priority(request)
    }
}

#[derive(Debug)]
pub enum SuggestError {
    /// No API key configured.
    NotConfigured,
    /// Connection failure or timeout.
    Transport(String),
    /// Non-success HTTP status.
    Status { code: u16, body: String },
    /// Response body or model output did not match the expected shape.
    Parse(String),
}

impl Display for SuggestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "suggestion service is not configured"),
            Self::Transport(message) => write!(f, "suggestion request failed: {message}"),
            Self::Status { code, .. } => {
                write!(f, "suggestion service responded with status {code}")
            }
            Self::Parse(message) => write!(f, "unusable suggestion response: {message}"),
        }
    }
}

impl Error for SuggestError {}

impl From<reqwest::Error> for SuggestError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Parse(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

impl From<serde_json::Error> for SuggestError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}
