//! `research` agent — loads a page with the browser tool and has the model
//! answer a question about it.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use super::chat::core::ChatCore;
use super::prompt::PromptBuilder;
use super::{Agent, AgentFuture, AgentsState, InvocationContext, KindTag, RequestKind, Response, mismatched};
use crate::tools::ToolError;

const PARADIGM: &str = "Give an Agent a Tool - browser automation without custom scraping logic!";

const TEMPLATE: &str = "research.txt";
const FALLBACK: &str = "I visited the website: {{url}}

Page Title: {{title}}

Page Content:
{{content}}

Question: {{question}}

Please provide a clear, concise answer based on the page content.";

pub(crate) struct ResearchAgent;

impl Agent for ResearchAgent {
    fn id(&self) -> &str { "research" }

    fn expects(&self) -> KindTag {
        KindTag::Research
    }

    fn handle(&self, kind: RequestKind, _ctx: InvocationContext, state: Arc<AgentsState>) -> AgentFuture {
        let RequestKind::Research { url, question } = kind else {
            return mismatched(self.id());
        };
        Box::pin(async move {
            if url.is_empty() {
                return Response::failure("Please provide a URL to research").with(
                    "example",
                    json!({ "url": "https://example.com", "question": "What is the main topic of this website?" }),
                );
            }

            let page = match state.tools.browser.fetch(&url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(%url, "research: page load failed: {e}");
                    let message = match &e {
                        ToolError::Timeout(_) => {
                            format!("Timeout loading {url}. The page took too long to load.")
                        }
                        other => format!("Error navigating to website: {other}"),
                    };
                    return Response::failure(message).with_error(&e).with("url", url.as_str());
                }
            };

            let prompt = PromptBuilder::new(&state.prompts_dir)
                .template(TEMPLATE, FALLBACK)
                .with_vars([
                    ("url", url.as_str()),
                    ("title", page.title.as_str()),
                    ("content", page.text.as_str()),
                    ("question", question.as_str()),
                ])
                .build();

            let reply = match ChatCore::complete(&state, &prompt).await {
                Ok(r) => r,
                Err(e) => return ChatCore::model_failure(&state, &e).with("url", url.as_str()),
            };

            Response::success(reply.text.as_str())
                .with("url", url.as_str())
                .with("page_title", page.title.as_str())
                .with("question", question.as_str())
                .with("answer", reply.text.as_str())
                .with("content_truncated", page.truncated)
                .with("paradigm", PARADIGM)
                .with("model", state.llm.model_label())
                .with_usage(reply.usage)
        })
    }
}
