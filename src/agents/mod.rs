//! Agents subsystem — turns one invocation payload into one response.
//!
//! [`Agent`] is the extension trait: each agent is a `Send + Sync` struct
//! registered in the subsystem by id. Agents hold no state of their own;
//! everything that outlives a call (conversation turns, facts) lives in the
//! memory collaborator reached through [`AgentsState`].
//!
//! [`AgentsSubsystem::invoke`] is the single outer boundary. It classifies
//! the request once into a [`RequestKind`], picks an agent, runs it on its own
//! task and always returns a well-formed [`Response`], unknown agents and
//! panics included.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::config::{AgentsConfig, Config};
use crate::error::AppError;
use crate::llm::LlmProvider;
use crate::memory::MemorySystem;
use crate::tools::Tools;

pub mod chat;
pub mod contacts;
pub mod hello;
pub mod prompt;
pub mod request;
pub mod research;
pub mod response;

pub use request::{InvocationContext, KindTag, PromptRequest, Request, RequestKind};
pub use response::Response;

/// Reported as `framework` by agents that label themselves.
pub const FRAMEWORK: &str = "entrybot";

/// Boxed future returned by [`Agent::handle`].
pub type AgentFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

// ── AgentsState ───────────────────────────────────────────────────────────────

/// Shared capability surface passed to agents.
///
/// Built once at start-up and never mutated; agents receive it behind an
/// `Arc` on every call.
pub struct AgentsState {
    pub bot_name: String,
    /// Model collaborator.
    pub llm: LlmProvider,
    /// Memory collaborator. Agents open a session handle per request.
    pub memory: MemorySystem,
    pub tools: Tools,
    pub prompts_dir: PathBuf,
    /// Actor used when the request names none.
    pub default_actor_id: String,
    /// Session used when neither the request nor the transport names one.
    pub default_session_id: String,
    /// How many recent turns session-aware agents fetch.
    pub recent_turns: usize,
    /// How many facts `memory_chat` asks for.
    pub fact_top_k: usize,
}

impl AgentsState {
    pub fn new(config: &Config, llm: LlmProvider, memory: MemorySystem, tools: Tools) -> Self {
        Self {
            bot_name: config.bot_name.clone(),
            llm,
            memory,
            tools,
            prompts_dir: config.agents.prompts_dir.clone(),
            default_actor_id: config.memory.default_actor_id.clone(),
            default_session_id: config.memory.default_session_id.clone(),
            recent_turns: config.memory.recent_turns,
            fact_top_k: config.memory.fact_top_k,
        }
    }
}

// ── Agent trait ───────────────────────────────────────────────────────────────

/// An agent registered with the agents subsystem.
///
/// `handle` must not borrow `self` in the returned future: the subsystem
/// spawns it on its own task.
pub trait Agent: Send + Sync {
    /// Unique agent identifier (matches config name, e.g. `"hello"`).
    fn id(&self) -> &str;

    /// Request shape this agent works on.
    fn expects(&self) -> KindTag {
        KindTag::Prompt
    }

    /// Handle one request.
    fn handle(&self, kind: RequestKind, ctx: InvocationContext, state: Arc<AgentsState>) -> AgentFuture;
}

/// Response for a request whose kind does not fit the agent.
pub(crate) fn mismatched(agent_id: &str) -> AgentFuture {
    let response = Response::failure(format!("Agent '{agent_id}' cannot handle this request"));
    Box::pin(std::future::ready(response))
}

// ── AgentsSubsystem ───────────────────────────────────────────────────────────

/// Agent registry and dispatch.
///
/// Agent selection, first match wins:
/// - explicit `agent` field in the payload
/// - the agent a request kind routes to (`csv` → `contacts`, `url` → `research`)
/// - the configured default agent
pub struct AgentsSubsystem {
    state: Arc<AgentsState>,
    agents: HashMap<String, Box<dyn Agent>>,
    default_agent: String,
}

impl AgentsSubsystem {
    pub fn new(config: &AgentsConfig, state: AgentsState) -> Result<Self, AppError> {
        // Uses agent.id() as the HashMap key so the trait method is the
        // single source of truth for each agent's identity.
        let builtin: Vec<Box<dyn Agent>> = vec![
            Box::new(hello::HelloAgent),
            Box::new(chat::BasicChatAgent),
            Box::new(chat::SessionChatAgent),
            Box::new(chat::MemoryChatAgent),
            Box::new(contacts::ContactsAgent),
            Box::new(research::ResearchAgent),
        ];

        let known: Vec<String> = builtin.iter().map(|a| a.id().to_string()).collect();
        let mut agents: HashMap<String, Box<dyn Agent>> = HashMap::new();
        for agent in builtin {
            if config.disabled.contains(agent.id()) {
                info!(agent = agent.id(), "agent disabled by config");
                continue;
            }
            agents.insert(agent.id().to_string(), agent);
        }

        for id in &config.disabled {
            if !known.contains(id) {
                warn!(agent = %id, "config disables an agent that does not exist");
            }
        }

        if !agents.contains_key(&config.default_agent) {
            return Err(AppError::Config(format!(
                "default agent '{}' is not registered or is disabled",
                config.default_agent
            )));
        }

        let subsystem = Self {
            state: Arc::new(state),
            agents,
            default_agent: config.default_agent.clone(),
        };
        info!(
            agents = ?subsystem.agent_ids(),
            default = %subsystem.default_agent,
            "agents subsystem ready"
        );
        Ok(subsystem)
    }

    /// Sorted ids of all enabled agents.
    pub fn agent_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.agents.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn default_agent(&self) -> &str {
        &self.default_agent
    }

    pub fn state(&self) -> &Arc<AgentsState> {
        &self.state
    }

    /// Handle one invocation. Never fails: every error path is a failed
    /// [`Response`].
    pub async fn invoke(&self, request: Request, ctx: InvocationContext) -> Response {
        let started = Instant::now();
        let request_id = ctx.request_id.clone();
        let default_actor = self.state.default_actor_id.as_str();

        let mut kind = RequestKind::parse(&request, default_actor);
        let agent_id = request::string_field(&request, "agent")
            .map(|a| a.trim().to_string())
            .or_else(|| kind.routed_agent().map(str::to_string))
            .unwrap_or_else(|| self.default_agent.clone());

        let Some(agent) = self.agents.get(&agent_id) else {
            warn!(%request_id, agent = %agent_id, "unknown agent requested");
            return Response::failure(format!("Unknown agent: {agent_id}"))
                .with("available", self.agent_ids());
        };

        if agent.expects() != kind.tag() {
            kind = RequestKind::parse_as(agent.expects(), &request, default_actor);
        }

        let fut = agent.handle(kind, ctx, self.state.clone());
        let mut response = match tokio::spawn(fut).await {
            Ok(response) => response,
            Err(e) => {
                error!(%request_id, agent = %agent_id, error = %e, "agent task failed");
                Response::failure("Internal error while handling request")
                    .with_error(format!("agent '{agent_id}' aborted: {e}"))
            }
        };
        response.set_if_absent("agent", agent_id.as_str());

        info!(
            %request_id,
            agent = %agent_id,
            success = response.is_success(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "invocation complete"
        );
        response
    }
}
