//! Shared fixtures for unit tests.

use axum::Router;
use tokio::net::TcpListener;

use crate::agents::AgentsState;
use crate::config::{self, Config, EnvOverrides};
use crate::llm::LlmProvider;
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::memory::MemorySystem;
use crate::tools::Tools;

/// Serve `router` on an ephemeral local port and return its base URL.
pub(crate) async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

/// Config with the dummy model, in-process memory and a shell interpreter.
pub(crate) fn test_config() -> Config {
    let prompts = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/prompts");
    let toml = format!(
        r#"
[supervisor]
bot_name = "entrybot-test"
work_dir = "{work_dir}"
log_level = "debug"

[agents]
prompts_dir = "{prompts}"

[memory]
store = "tmp"

[tools.browser]
timeout_seconds = 5

[tools.code_interpreter]
interpreter = "sh"
timeout_seconds = 5
"#,
        work_dir = std::env::temp_dir().join("entrybot-test").display(),
        prompts = prompts.display(),
    );
    config::parse(&toml, &EnvOverrides::default()).unwrap()
}

pub(crate) fn test_state(config: &Config) -> AgentsState {
    let llm = crate::llm::providers::build(&config.llm, None).unwrap();
    let memory = MemorySystem::new(&config.memory, &config.work_dir).unwrap();
    let tools = Tools::new(&config.tools).unwrap();
    AgentsState::new(config, llm, memory, tools)
}

/// A provider whose every call fails at connect time.
pub(crate) fn unreachable_llm() -> LlmProvider {
    LlmProvider::OpenAiCompatible(
        OpenAiCompatibleProvider::new(
            "http://127.0.0.1:1/v1/chat/completions".into(),
            "unreachable".into(),
            0.0,
            2,
            None,
        )
        .unwrap(),
    )
}
