//! Shared chat logic used by all chat-family agents.
//!
//! [`ChatCore`] provides composable building blocks so that the stateless
//! and memory-backed chat agents share behaviour without duplicating code.

use tracing::warn;

use crate::agents::{AgentsState, InvocationContext, PromptRequest, Response};
use crate::llm::{LlmResponse, ProviderError};
use crate::memory::{Role, SessionHandle, Turn};

/// Rendered in place of history when a session has no turns yet.
pub const NO_PREVIOUS_CONTEXT: &str = "No previous context";

pub struct ChatCore;

impl ChatCore {
    /// One-shot completion of an already composed prompt.
    pub async fn complete(state: &AgentsState, prompt: &str) -> Result<LlmResponse, ProviderError> {
        state.llm.complete(prompt, None).await
    }

    /// Open the session for this request.
    ///
    /// Session id: payload > transport context > configured default.
    pub fn open_session(state: &AgentsState, req: &PromptRequest, ctx: &InvocationContext) -> SessionHandle {
        let session_id = req
            .session_id
            .as_deref()
            .or(ctx.session_id.as_deref())
            .unwrap_or(&state.default_session_id);
        state.memory.session(&req.actor_id, session_id)
    }

    /// Record a turn. Failure is logged, never surfaced: the reply
    /// still goes out when history could not be saved.
    pub async fn remember(handle: &SessionHandle, role: Role, content: &str) {
        if let Err(e) = handle.append_turn(role, content).await {
            warn!(
                session_id = handle.session_id(),
                actor_id = handle.actor_id(),
                %role,
                "chat: append_turn failed: {e}"
            );
        }
    }

    /// `role: content` per line, oldest first.
    pub fn render_history(turns: &[Turn]) -> String {
        if turns.is_empty() {
            return NO_PREVIOUS_CONTEXT.to_string();
        }
        turns
            .iter()
            .map(|t| format!("{}: {}", t.role, t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Failed response for a model collaborator error.
    pub fn model_failure(state: &AgentsState, e: &ProviderError) -> Response {
        warn!(model = state.llm.model_label(), "chat: model call failed: {e}");
        Response::failure("Error calling the model. Check the provider configuration and credentials.")
            .with_error(e)
    }

    /// Failed response for a memory read error.
    pub fn memory_failure(handle: &SessionHandle, e: impl std::fmt::Display) -> Response {
        warn!(session_id = handle.session_id(), "chat: memory read failed: {e}");
        Response::failure("Error using memory. Check the memory store configuration.")
            .with_error(e)
            .with("session_id", handle.session_id())
            .with("actor_id", handle.actor_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{test_config, test_state};

    fn prompt_req(session_id: Option<&str>) -> PromptRequest {
        PromptRequest {
            prompt: "hi".into(),
            actor_id: "alice".into(),
            session_id: session_id.map(str::to_string),
        }
    }

    #[test]
    fn empty_history_renders_placeholder() {
        assert_eq!(ChatCore::render_history(&[]), "No previous context");
    }

    #[test]
    fn history_renders_role_lines() {
        let turns = vec![Turn::now(Role::User, "My name is Alice"), Turn::now(Role::Assistant, "Hi Alice")];
        assert_eq!(ChatCore::render_history(&turns), "user: My name is Alice\nassistant: Hi Alice");
    }

    #[test]
    fn session_resolution_order() {
        let state = test_state(&test_config());

        let ctx = InvocationContext::new(Some("from-header".into()));
        assert_eq!(ChatCore::open_session(&state, &prompt_req(Some("from-body")), &ctx).session_id(), "from-body");
        assert_eq!(ChatCore::open_session(&state, &prompt_req(None), &ctx).session_id(), "from-header");

        let ctx = InvocationContext::new(None);
        let handle = ChatCore::open_session(&state, &prompt_req(None), &ctx);
        assert_eq!(handle.session_id(), "default_session");
        assert_eq!(handle.actor_id(), "alice");
    }
}
