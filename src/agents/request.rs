//! Inbound request shapes.
//!
//! A [`Request`] is whatever JSON object the caller sent. It is turned into a
//! [`RequestKind`] exactly once, at the top of
//! [`AgentsSubsystem::invoke`](super::AgentsSubsystem::invoke); agents only
//! ever see the typed kind.

use serde_json::{Map, Value};
use uuid::Uuid;

/// Raw invocation payload.
pub type Request = Map<String, Value>;

pub const DEFAULT_PROMPT: &str = "Hello!";
pub const DEFAULT_QUESTION: &str = "What is this website about?";

/// Request-scoped metadata supplied by the host, not the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    pub request_id: String,
    /// Session id from the transport (e.g. the `X-Session-Id` header).
    pub session_id: Option<String>,
}

impl InvocationContext {
    pub fn new(session_id: Option<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            session_id: session_id.filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Free-text conversation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub prompt: String,
    pub actor_id: String,
    /// Unresolved until an agent that needs a session picks a fallback.
    pub session_id: Option<String>,
}

/// Shape of request an agent works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindTag {
    Prompt,
    Contacts,
    Research,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// Tabular text to extract contacts from. Empty when the caller
    /// addressed the `contacts` agent without supplying any.
    Contacts { csv: String },
    /// Page to load and a question about it. `url` is empty when missing.
    Research { url: String, question: String },
    Prompt(PromptRequest),
}

impl RequestKind {
    /// Classify by field presence: `csv`, then `url`, then plain prompt.
    pub fn parse(request: &Request, default_actor: &str) -> Self {
        if string_field(request, "csv").is_some() {
            Self::parse_as(KindTag::Contacts, request, default_actor)
        } else if string_field(request, "url").is_some() {
            Self::parse_as(KindTag::Research, request, default_actor)
        } else {
            Self::parse_as(KindTag::Prompt, request, default_actor)
        }
    }

    /// Read `request` as the given kind, defaulting whatever is missing.
    pub fn parse_as(tag: KindTag, request: &Request, default_actor: &str) -> Self {
        match tag {
            KindTag::Contacts => Self::Contacts {
                csv: string_field(request, "csv").unwrap_or_default(),
            },
            KindTag::Research => Self::Research {
                url: string_field(request, "url")
                    .map(|u| u.trim().to_string())
                    .unwrap_or_default(),
                question: string_field(request, "question")
                    .unwrap_or_else(|| DEFAULT_QUESTION.to_string()),
            },
            KindTag::Prompt => Self::Prompt(PromptRequest {
                prompt: string_field(request, "prompt")
                    .unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
                actor_id: string_field(request, "actor_id")
                    .map(|a| a.trim().to_string())
                    .unwrap_or_else(|| default_actor.to_string()),
                session_id: string_field(request, "session_id").map(|s| s.trim().to_string()),
            }),
        }
    }

    pub fn tag(&self) -> KindTag {
        match self {
            Self::Contacts { .. } => KindTag::Contacts,
            Self::Research { .. } => KindTag::Research,
            Self::Prompt(_) => KindTag::Prompt,
        }
    }

    /// Agent that serves this kind when the caller names none.
    pub fn routed_agent(&self) -> Option<&'static str> {
        match self {
            Self::Contacts { .. } => Some("contacts"),
            Self::Research { .. } => Some("research"),
            Self::Prompt(_) => None,
        }
    }
}

/// A string field that is present and not blank.
pub fn string_field(request: &Request, key: &str) -> Option<String> {
    request
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}
