//! `chat` agent — stateless model pass-through with a fixed framing.

use std::sync::Arc;

use super::core::ChatCore;
use crate::agents::prompt::PromptBuilder;
use crate::agents::{Agent, AgentFuture, AgentsState, FRAMEWORK, InvocationContext, RequestKind, Response, mismatched};

const TEMPLATE: &str = "chat.txt";
const FALLBACK: &str = "You are a helpful AI assistant running on {{bot_name}}. Respond to: {{user_input}}";

pub(crate) struct BasicChatAgent;

impl Agent for BasicChatAgent {
    fn id(&self) -> &str { "chat" }

    fn handle(&self, kind: RequestKind, _ctx: InvocationContext, state: Arc<AgentsState>) -> AgentFuture {
        let RequestKind::Prompt(req) = kind else {
            return mismatched(self.id());
        };
        Box::pin(async move {
            let prompt = PromptBuilder::new(&state.prompts_dir)
                .template(TEMPLATE, FALLBACK)
                .var("bot_name", &state.bot_name)
                .var("user_input", &req.prompt)
                .build();

            match ChatCore::complete(&state, &prompt).await {
                Ok(reply) => Response::success(reply.text)
                    .with("model", state.llm.model_label())
                    .with("framework", FRAMEWORK)
                    .with_usage(reply.usage),
                Err(e) => ChatCore::model_failure(&state, &e),
            }
        })
    }
}
