//! `hello` agent — echoes the prompt back. No collaborators.

use std::sync::Arc;

use super::{Agent, AgentFuture, AgentsState, FRAMEWORK, InvocationContext, RequestKind, Response, mismatched};

pub(crate) struct HelloAgent;

impl Agent for HelloAgent {
    fn id(&self) -> &str { "hello" }

    fn handle(&self, kind: RequestKind, _ctx: InvocationContext, _state: Arc<AgentsState>) -> AgentFuture {
        let RequestKind::Prompt(req) = kind else {
            return mismatched(self.id());
        };
        let response = Response::success(format!("You said: '{}'", req.prompt))
            .with("agent", "Hello World")
            .with("framework", FRAMEWORK);
        Box::pin(std::future::ready(response))
    }
}
