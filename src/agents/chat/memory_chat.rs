//! `memory_chat` agent — short-term history plus long-term fact recall.
//!
//! Same flow as `session_chat`, with a fact search over the actor's
//! namespace before the model call. The search never fails the request:
//! no hits and search errors both degrade to a fixed context line.

use std::sync::Arc;

use tracing::{debug, warn};

use super::core::ChatCore;
use crate::agents::prompt::PromptBuilder;
use crate::agents::{Agent, AgentFuture, AgentsState, InvocationContext, RequestKind, Response, mismatched};
use crate::memory::{Fact, Role};

pub const MEMORY_TYPE: &str = "LTM (Long-Term Memory)";

const NO_FACTS: &str = "No long-term memories yet";
const FACTS_UNAVAILABLE: &str = "Long-term memory search not available";

const TEMPLATE: &str = "memory_chat.txt";
const FALLBACK: &str = "You are a helpful AI assistant with long-term memory. You remember facts about users across conversations.

Long-term memories (facts/preferences from past sessions):
{{facts}}

Recent conversation (current session):
{{history}}

Current user message: {{user_input}}

Respond naturally, using both recent context and long-term memories when relevant.";

pub(crate) struct MemoryChatAgent;

impl Agent for MemoryChatAgent {
    fn id(&self) -> &str { "memory_chat" }

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

            let (facts, facts_context) = match handle.search_facts(&req.prompt, state.fact_top_k).await {
                Ok(facts) => {
                    let rendered = render_facts(&facts);
                    (facts, rendered)
                }
                Err(e) => {
                    warn!(actor_id = handle.actor_id(), "memory_chat: fact search failed: {e}");
                    (Vec::new(), FACTS_UNAVAILABLE.to_string())
                }
            };
            debug!(
                session_id = handle.session_id(),
                turns = turns.len(),
                facts = facts.len(),
                "memory_chat: context loaded"
            );

            ChatCore::remember(&handle, Role::User, &req.prompt).await;

            let prompt = PromptBuilder::new(&state.prompts_dir)
                .template(TEMPLATE, FALLBACK)
                .var("facts", facts_context)
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
                .with("long_term_memories_found", facts.len())
                .with("memory_type", MEMORY_TYPE)
                .with("model", state.llm.model_label())
                .with_usage(reply.usage)
        })
    }
}

fn render_facts(facts: &[Fact]) -> String {
    if facts.is_empty() {
        return NO_FACTS.to_string();
    }
    facts.iter().map(|f| format!("- {}", f.content)).collect::<Vec<_>>().join("\n")
}
