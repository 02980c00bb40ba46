//! `session_chat` agent — short-term memory chat built on [`ChatCore`].
//!
//! Fetches the last *k* turns of the session before anything is written,
//! records the user message, injects the history into the prompt and
//! records the assistant reply.

use std::sync::Arc;

use tracing::debug;

use super::core::ChatCore;
use crate::agents::prompt::PromptBuilder;
use crate::agents::{Agent, AgentFuture, AgentsState, InvocationContext, RequestKind, Response, mismatched};
use crate::memory::Role;

pub const MEMORY_TYPE: &str = "STM (Short-Term Memory)";

const TEMPLATE: &str = "session_chat.txt";
const FALLBACK: &str = "You are a helpful AI assistant with memory. You can remember the conversation.

Previous conversation:
{{history}}

Current user message: {{user_input}}

Respond naturally, referencing previous context when relevant.";

pub(crate) struct SessionChatAgent;

impl Agent for SessionChatAgent {
    fn id(&self) -> &str { "session_chat" }

    fn handle(&self, kind: RequestKind, ctx: InvocationContext, state: Arc<AgentsState>) -> AgentFuture {
        let RequestKind::Prompt(req) = kind else {
            return mismatched(self.id());
        };
        Box::pin(async move {
            let handle = ChatCore::open_session(&state, &req, &ctx);

            let turns = match handle.recent_turns(state.recent_turns).await {
                Ok(t) => t,
                Err(e) => return ChatCore::memory_failure(&handle, e),
            };
            debug!(session_id = handle.session_id(), turns = turns.len(), "session_chat: history loaded");

            ChatCore::remember(&handle, Role::User, &req.prompt).await;

            let prompt = PromptBuilder::new(&state.prompts_dir)
                .template(TEMPLATE, FALLBACK)
                .var("history", ChatCore::render_history(&turns))
                .var("user_input", &req.prompt)
                .build();

            let reply = match ChatCore::complete(&state, &prompt).await {
                Ok(r) => r,
                Err(e) => {
                    return ChatCore::model_failure(&state, &e)
                        .with("session_id", handle.session_id())
                        .with("actor_id", handle.actor_id());
                }
            };

            ChatCore::remember(&handle, Role::Assistant, &reply.text).await;

            Response::success(reply.text)
                .with("session_id", handle.session_id())
                .with("actor_id", handle.actor_id())
                .with("turns_retrieved", turns.len())
                .with("turns_in_memory", turns.len() + 2)
                .with("memory_type", MEMORY_TYPE)
                .with("model", state.llm.model_label())
                .with_usage(reply.usage)
        })
    }
}
