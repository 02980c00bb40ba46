//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` (or the path given with `-f`), then applies
//! `ENTRYBOT_*` env overrides. The result is read once at process start and
//! never mutated afterwards.

use std::{
    collections::HashSet,
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// HTTP channel configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Socket address the invocation endpoint binds to.
    pub bind: String,
}

/// OpenAI / OpenAI-compatible provider configuration (`[llm.openai]`).
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    pub model: String,
    /// Sampling temperature (ignored for models that forbid it).
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// Anthropic Messages API provider configuration (`[llm.anthropic]`).
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// Full messages endpoint URL.
    pub api_base_url: String,
    pub model: String,
    pub max_tokens: u32,
    /// Value of the `anthropic-version` header.
    pub anthropic_version: String,
    pub timeout_seconds: u64,
}

/// Model collaborator configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"dummy"`, `"openai"`, `"anthropic"`).
    /// Maps to `default` in `[llm]`.
    pub provider: String,
    pub openai: OpenAiConfig,
    pub anthropic: AnthropicConfig,
}

/// Agents (request handler) configuration.
#[derive(Debug, Clone)]
pub struct AgentsConfig {
    /// Agent that handles plain prompt requests with no explicit `agent` field.
    pub default_agent: String,
    /// Agent ids whose `[agents.<id>]` section sets `enabled = false`.
    pub disabled: HashSet<String>,
    /// Directory holding prompt templates.
    pub prompts_dir: PathBuf,
}

/// Memory collaborator configuration.
///
/// `memory_id` and `region` are opaque labels: they select a namespace for
/// the store and are reported in logs, never parsed.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Store backend: `"tmp"` or `"basic_session"`.
    pub store: String,
    pub memory_id: String,
    pub region: String,
    pub default_session_id: String,
    pub default_actor_id: String,
    /// How many recent turns the session agents fetch.
    pub recent_turns: usize,
    /// How many long-term facts `memory_chat` asks for.
    pub fact_top_k: usize,
    pub transcript_cap: Option<usize>,
}

/// Browser tool configuration (`[tools.browser]`).
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub timeout_seconds: u64,
    /// Page text beyond this many characters is truncated.
    pub max_content_chars: usize,
    pub user_agent: String,
}

/// Code interpreter tool configuration (`[tools.code_interpreter]`).
#[derive(Debug, Clone)]
pub struct CodeInterpreterConfig {
    /// Program that runs generated code, e.g. `python3`.
    pub interpreter: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct ToolsConfig {
    pub browser: BrowserConfig,
    pub code_interpreter: CodeInterpreterConfig,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    /// Working directory for all persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    pub http: HttpConfig,
    pub agents: AgentsConfig,
    pub llm: LlmConfig,
    /// API key from `LLM_API_KEY`. Never sourced from TOML.
    pub llm_api_key: Option<String>,
    pub memory: MemoryConfig,
    pub tools: ToolsConfig,
}

/// Values taken from the environment that win over the TOML file.
///
/// Tests build this directly instead of mutating process env vars.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub work_dir: Option<String>,
    pub log_level: Option<String>,
    pub memory_id: Option<String>,
    pub region: Option<String>,
    pub default_session_id: Option<String>,
    pub llm_api_key: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            work_dir: env::var("ENTRYBOT_WORK_DIR").ok(),
            log_level: env::var("ENTRYBOT_LOG_LEVEL").ok(),
            memory_id: env::var("ENTRYBOT_MEMORY_ID").ok(),
            region: env::var("ENTRYBOT_REGION").ok(),
            default_session_id: env::var("ENTRYBOT_DEFAULT_SESSION_ID").ok(),
            llm_api_key: env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
        }
    }
}

// ── Raw TOML shape ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawConfig {
    supervisor: RawSupervisor,
    #[serde(default)]
    comms: RawComms,
    #[serde(default)]
    agents: RawAgents,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    memory: RawMemory,
    #[serde(default)]
    tools: RawTools,
}

#[derive(Deserialize)]
struct RawSupervisor {
    bot_name: String,
    work_dir: String,
    log_level: String,
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    http: RawHttp,
}

#[derive(Deserialize)]
struct RawHttp {
    #[serde(default = "default_http_bind")]
    bind: String,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self { bind: default_http_bind() }
    }
}

#[derive(Deserialize)]
struct RawAgents {
    /// `default = "..."` in `[agents]`.
    #[serde(rename = "default", default = "default_agent_name")]
    default_agent: String,
    #[serde(default = "default_prompts_dir")]
    prompts_dir: String,
    /// All `[agents.<id>]` subsections.
    #[serde(flatten)]
    entries: std::collections::HashMap<String, RawAgentEntry>,
}

impl Default for RawAgents {
    fn default() -> Self {
        Self {
            default_agent: default_agent_name(),
            prompts_dir: default_prompts_dir(),
            entries: Default::default(),
        }
    }
}

#[derive(Deserialize)]
struct RawAgentEntry {
    /// Set to `false` to disable an agent without removing its section.
    #[serde(default = "default_true")]
    enabled: bool,
}

#[derive(Deserialize)]
struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    openai: RawOpenAiConfig,
    #[serde(default)]
    anthropic: RawAnthropicConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            openai: RawOpenAiConfig::default(),
            anthropic: RawAnthropicConfig::default(),
        }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawAnthropicConfig {
    #[serde(default = "default_anthropic_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_anthropic_model")]
    model: String,
    #[serde(default = "default_anthropic_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_anthropic_version")]
    anthropic_version: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawAnthropicConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_anthropic_api_base_url(),
            model: default_anthropic_model(),
            max_tokens: default_anthropic_max_tokens(),
            anthropic_version: default_anthropic_version(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawMemory {
    #[serde(default = "default_memory_store")]
    store: String,
    #[serde(default = "default_memory_id")]
    memory_id: String,
    #[serde(default = "default_region")]
    region: String,
    #[serde(default = "default_session_id")]
    default_session_id: String,
    #[serde(default = "default_actor_id")]
    default_actor_id: String,
    #[serde(default = "default_recent_turns")]
    recent_turns: usize,
    #[serde(default = "default_fact_top_k")]
    fact_top_k: usize,
    #[serde(default)]
    transcript_cap: Option<usize>,
}

impl Default for RawMemory {
    fn default() -> Self {
        Self {
            store: default_memory_store(),
            memory_id: default_memory_id(),
            region: default_region(),
            default_session_id: default_session_id(),
            default_actor_id: default_actor_id(),
            recent_turns: default_recent_turns(),
            fact_top_k: default_fact_top_k(),
            transcript_cap: None,
        }
    }
}

#[derive(Deserialize, Default)]
struct RawTools {
    #[serde(default)]
    browser: RawBrowser,
    #[serde(default)]
    code_interpreter: RawCodeInterpreter,
}

#[derive(Deserialize)]
struct RawBrowser {
    #[serde(default = "default_browser_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default = "default_max_content_chars")]
    max_content_chars: usize,
    #[serde(default = "default_user_agent")]
    user_agent: String,
}

impl Default for RawBrowser {
    fn default() -> Self {
        Self {
            timeout_seconds: default_browser_timeout_seconds(),
            max_content_chars: default_max_content_chars(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Deserialize)]
struct RawCodeInterpreter {
    #[serde(default = "default_interpreter")]
    interpreter: String,
    #[serde(default = "default_sandbox_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawCodeInterpreter {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            timeout_seconds: default_sandbox_timeout_seconds(),
        }
    }
}

fn default_http_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_agent_name() -> String { "session_chat".to_string() }
fn default_prompts_dir() -> String { "config/prompts".to_string() }
fn default_llm_provider() -> String { "dummy".to_string() }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
fn default_openai_temperature() -> f32 { 0.2 }
fn default_timeout_seconds() -> u64 { 60 }
fn default_anthropic_api_base_url() -> String { "https://api.anthropic.com/v1/messages".to_string() }
fn default_anthropic_model() -> String { "claude-3-haiku-20240307".to_string() }
fn default_anthropic_max_tokens() -> u32 { 500 }
fn default_anthropic_version() -> String { "2023-06-01".to_string() }
fn default_memory_store() -> String { "tmp".to_string() }
fn default_memory_id() -> String { "local-memory".to_string() }
fn default_region() -> String { "local".to_string() }
fn default_session_id() -> String { "default_session".to_string() }
fn default_actor_id() -> String { "default_user".to_string() }
fn default_recent_turns() -> usize { 5 }
fn default_fact_top_k() -> usize { 3 }
fn default_browser_timeout_seconds() -> u64 { 30 }
fn default_max_content_chars() -> usize { 5000 }
fn default_user_agent() -> String { format!("entrybot/{}", env!("CARGO_PKG_VERSION")) }
fn default_interpreter() -> String { "python3".to_string() }
fn default_sandbox_timeout_seconds() -> u64 { 30 }
fn default_true() -> bool { true }

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load config from `path` (default `config/default.toml`), then apply
/// env-var overrides.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    load_from(
        Path::new(path.unwrap_or(DEFAULT_CONFIG_PATH)),
        &EnvOverrides::from_env(),
    )
}

/// Read and resolve the TOML file at `path` with explicit overrides.
pub fn load_from(path: &Path, overrides: &EnvOverrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
    parse(&raw, overrides).map_err(|e| match e {
        AppError::Config(msg) => AppError::Config(format!("{msg} in {}", path.display())),
        other => other,
    })
}

/// Resolve a TOML document held in memory.
pub fn parse(raw: &str, overrides: &EnvOverrides) -> Result<Config, AppError> {
    let parsed: RawConfig =
        toml::from_str(raw).map_err(|e| AppError::Config(format!("parse error: {e}")))?;

    let s = parsed.supervisor;
    let work_dir = expand_home(overrides.work_dir.as_deref().unwrap_or(&s.work_dir));
    let log_level = overrides.log_level.clone().unwrap_or(s.log_level);
    crate::logger::parse_level(&log_level)
        .map_err(|e| AppError::Config(format!("log_level: {e}")))?;

    let m = parsed.memory;
    if m.recent_turns == 0 {
        return Err(AppError::Config("memory.recent_turns must be at least 1".into()));
    }

    let prompts_dir = PathBuf::from(&parsed.agents.prompts_dir);

    Ok(Config {
        bot_name: s.bot_name,
        work_dir,
        log_level,
        http: HttpConfig { bind: parsed.comms.http.bind },
        agents: AgentsConfig {
            default_agent: parsed.agents.default_agent,
            disabled: parsed
                .agents
                .entries
                .into_iter()
                .filter(|(_, e)| !e.enabled)
                .map(|(id, _)| id)
                .collect(),
            prompts_dir,
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
            anthropic: AnthropicConfig {
                api_base_url: parsed.llm.anthropic.api_base_url,
                model: parsed.llm.anthropic.model,
                max_tokens: parsed.llm.anthropic.max_tokens,
                anthropic_version: parsed.llm.anthropic.anthropic_version,
                timeout_seconds: parsed.llm.anthropic.timeout_seconds,
            },
        },
        llm_api_key: overrides.llm_api_key.clone(),
        memory: MemoryConfig {
            store: m.store,
            memory_id: overrides.memory_id.clone().unwrap_or(m.memory_id),
            region: overrides.region.clone().unwrap_or(m.region),
            default_session_id: overrides
                .default_session_id
                .clone()
                .unwrap_or(m.default_session_id),
            default_actor_id: m.default_actor_id,
            recent_turns: m.recent_turns,
            fact_top_k: m.fact_top_k,
            transcript_cap: m.transcript_cap,
        },
        tools: ToolsConfig {
            browser: BrowserConfig {
                timeout_seconds: parsed.tools.browser.timeout_seconds,
                max_content_chars: parsed.tools.browser.max_content_chars,
                user_agent: parsed.tools.browser.user_agent,
            },
            code_interpreter: CodeInterpreterConfig {
                interpreter: parsed.tools.code_interpreter.interpreter,
                timeout_seconds: parsed.tools.code_interpreter.timeout_seconds,
            },
        },
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[supervisor]
bot_name = "test-bot"
work_dir = "~/.entrybot"
log_level = "info"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_minimal_config_fills_defaults() {
        let cfg = parse(MINIMAL_TOML, &EnvOverrides::default()).unwrap();
        assert_eq!(cfg.bot_name, "test-bot");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.http.bind, "127.0.0.1:8080");
        assert_eq!(cfg.llm.provider, "dummy");
        assert_eq!(cfg.agents.default_agent, "session_chat");
        assert_eq!(cfg.memory.store, "tmp");
        assert_eq!(cfg.memory.default_session_id, "default_session");
        assert_eq!(cfg.memory.default_actor_id, "default_user");
        assert_eq!(cfg.memory.recent_turns, 5);
        assert_eq!(cfg.memory.fact_top_k, 3);
        assert_eq!(cfg.tools.browser.max_content_chars, 5000);
        assert!(cfg.llm_api_key.is_none());
    }

    #[test]
    fn load_from_file() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), &EnvOverrides::default()).unwrap();
        assert_eq!(cfg.bot_name, "test-bot");
    }

    #[test]
    fn disabled_agents_collected() {
        let toml = format!(
            "{MINIMAL_TOML}\n[agents]\ndefault = \"chat\"\n[agents.research]\nenabled = false\n[agents.chat]\n"
        );
        let cfg = parse(&toml, &EnvOverrides::default()).unwrap();
        assert_eq!(cfg.agents.default_agent, "chat");
        assert!(cfg.agents.disabled.contains("research"));
        assert!(!cfg.agents.disabled.contains("chat"));
    }

    #[test]
    fn memory_overrides_win() {
        let overrides = EnvOverrides {
            memory_id: Some("mem-123".into()),
            region: Some("eu-central-1".into()),
            default_session_id: Some("s-env".into()),
            ..Default::default()
        };
        let cfg = parse(MINIMAL_TOML, &overrides).unwrap();
        assert_eq!(cfg.memory.memory_id, "mem-123");
        assert_eq!(cfg.memory.region, "eu-central-1");
        assert_eq!(cfg.memory.default_session_id, "s-env");
    }

    #[test]
    fn zero_recent_turns_rejected() {
        let toml = format!("{MINIMAL_TOML}\n[memory]\nrecent_turns = 0\n");
        let err = parse(&toml, &EnvOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("recent_turns"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/.entrybot");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with(".entrybot"));
    }

    #[test]
    fn absolute_path_unchanged() {
        assert_eq!(expand_home("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), &EnvOverrides::default());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn env_work_dir_override() {
        let overrides = EnvOverrides {
            work_dir: Some("/tmp/test-override".into()),
            ..Default::default()
        };
        let cfg = parse(MINIMAL_TOML, &overrides).unwrap();
        assert_eq!(cfg.work_dir, PathBuf::from("/tmp/test-override"));
    }

    #[test]
    fn env_log_level_override() {
        let overrides = EnvOverrides {
            log_level: Some("debug".into()),
            ..Default::default()
        };
        let cfg = parse(MINIMAL_TOML, &overrides).unwrap();
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let toml = MINIMAL_TOML.replace("log_level = \"info\"", "log_level = \"verbose\"");
        let err = parse(&toml, &EnvOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("log_level"), "{err}");

        let overrides = EnvOverrides { log_level: Some("loud".into()), ..Default::default() };
        assert!(parse(MINIMAL_TOML, &overrides).is_err());
    }

    #[test]
    fn shipped_default_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let cfg = load_from(&path, &EnvOverrides::default()).unwrap();
        assert_eq!(cfg.bot_name, "entrybot");
    }
}
