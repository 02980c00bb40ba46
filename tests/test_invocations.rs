//! End-to-end tests for the invocation endpoint, driven through the router
//! with `tower::ServiceExt::oneshot`.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use entrybot::agents::{AgentsState, AgentsSubsystem};
use entrybot::comms::build_router;
use entrybot::config::{self, Config, EnvOverrides};
use entrybot::llm::providers;
use entrybot::memory::MemorySystem;
use entrybot::tools::Tools;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn config(work_dir: &Path, store: &str, extra: &str) -> Config {
    let prompts = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/prompts");
    let toml = format!(
        r#"
[supervisor]
bot_name = "entrybot-it"
work_dir = "{work_dir}"
log_level = "warn"

[agents]
prompts_dir = "{prompts}"

[memory]
store = "{store}"

[tools.code_interpreter]
interpreter = "sh"
timeout_seconds = 5

{extra}
"#,
        work_dir = work_dir.display(),
        prompts = prompts.display(),
    );
    config::parse(&toml, &EnvOverrides::default()).unwrap()
}

fn app(config: &Config) -> Router {
    let llm = providers::build(&config.llm, None).unwrap();
    let memory = MemorySystem::new(&config.memory, &config.work_dir).unwrap();
    let tools = Tools::new(&config.tools).unwrap();
    let state = AgentsState::new(config, llm, memory, tools);
    build_router(Arc::new(AgentsSubsystem::new(&config.agents, state).unwrap()))
}

async fn post(router: &Router, body: impl Into<Body>, session: Option<&str>) -> Value {
    let mut req = Request::builder()
        .method("POST")
        .uri("/invocations")
        .header("content-type", "application/json");
    if let Some(session) = session {
        req = req.header("X-Session-Id", session);
    }
    let resp = router.clone().oneshot(req.body(body.into()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn post_json(router: &Router, body: Value) -> Value {
    post(router, body.to_string(), None).await
}

fn assert_well_formed(v: &Value) {
    let map = v.as_object().expect("response is a JSON object");
    assert!(map.get("success").map(Value::is_boolean).unwrap_or(false), "no success flag: {v}");
    let message = map.get("message").and_then(Value::as_str).unwrap_or("");
    assert!(!message.is_empty(), "empty message: {v}");
    for (key, field) in map {
        if field.is_object() {
            assert!(key == "usage" || key == "example", "nested field '{key}': {v}");
        }
    }
}

fn keys(v: &Value) -> Vec<String> {
    let mut keys: Vec<String> = v.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    keys
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn hello_prompt_gets_greeting_reply() {
    let dir = TempDir::new().unwrap();
    let router = app(&config(dir.path(), "tmp", ""));

    let r = post_json(&router, json!({ "prompt": "Hello!" })).await;
    assert_well_formed(&r);
    assert_eq!(r["success"], json!(true));
    assert!(r["message"].as_str().unwrap().contains("Hello!"), "{r}");
    assert_eq!(r["agent"], json!("session_chat"));
}

#[tokio::test]
async fn missing_prompt_falls_back_to_default() {
    let dir = TempDir::new().unwrap();
    let router = app(&config(dir.path(), "tmp", ""));

    let r = post_json(&router, json!({ "agent": "hello" })).await;
    assert_eq!(r["success"], json!(true));
    assert_eq!(r["message"], json!("You said: 'Hello!'"));

    let r = post_json(&router, json!({ "prompt": 42, "agent": "hello" })).await;
    assert_eq!(r["message"], json!("You said: 'Hello!'"));

    let r = post_json(&router, json!({})).await;
    assert_well_formed(&r);
    assert!(r["message"].as_str().unwrap().contains("Hello!"));
}

#[tokio::test]
async fn every_response_is_well_formed() {
    let dir = TempDir::new().unwrap();
    let router = app(&config(dir.path(), "tmp", ""));

    let bodies = [
        json!({}),
        json!({ "prompt": "hi", "agent": "chat" }),
        json!({ "prompt": "hi", "agent": "hello" }),
        json!({ "prompt": "hi", "agent": "memory_chat" }),
        json!({ "agent": "no_such_agent" }),
        json!({ "agent": "contacts" }),
        json!({ "agent": "research" }),
        json!({ "url": "ftp://example.com" }),
        json!({ "csv": "Name,Email\nAda,ada@example.com" }),
    ];
    for body in bodies {
        let r = post_json(&router, body.clone()).await;
        assert_well_formed(&r);
        if r["success"] == json!(false) {
            assert!(r["message"].as_str().is_some_and(|m| !m.is_empty()), "{body} → {r}");
        }
    }
}

#[tokio::test]
async fn unknown_agent_lists_available() {
    let dir = TempDir::new().unwrap();
    let router = app(&config(dir.path(), "tmp", ""));

    let r = post_json(&router, json!({ "agent": "nope" })).await;
    assert_eq!(r["success"], json!(false));
    assert_eq!(r["message"], json!("Unknown agent: nope"));
    let available = r["available"].as_array().unwrap();
    assert!(available.contains(&json!("hello")));
    assert!(available.contains(&json!("research")));
}

#[tokio::test]
async fn stateless_requests_keep_their_shape() {
    let dir = TempDir::new().unwrap();
    let router = app(&config(dir.path(), "tmp", ""));

    for agent in ["chat", "hello"] {
        let body = json!({ "prompt": "What is Rust?", "agent": agent });
        let first = post_json(&router, body.clone()).await;
        let second = post_json(&router, body).await;
        assert_eq!(keys(&first), keys(&second), "{agent}");
    }
}

#[tokio::test]
async fn same_session_sees_previous_exchange() {
    let dir = TempDir::new().unwrap();
    let router = app(&config(dir.path(), "tmp", ""));

    let first = post_json(&router, json!({ "prompt": "My name is Alice", "session_id": "s1" })).await;
    assert_eq!(first["success"], json!(true));
    assert_eq!(first["turns_retrieved"], json!(0));

    let second = post_json(&router, json!({ "prompt": "What is my name?", "session_id": "s1" })).await;
    assert_eq!(second["success"], json!(true));
    assert!(second["turns_retrieved"].as_u64().unwrap() >= 2, "{second}");
    assert!(second["message"].as_str().unwrap().contains("user: My name is Alice"));
    assert_eq!(second["session_id"], json!("s1"));
    assert_eq!(second["memory_type"], json!("STM (Short-Term Memory)"));

    let other = post_json(&router, json!({ "prompt": "Hi", "session_id": "s2" })).await;
    assert_eq!(other["turns_retrieved"], json!(0));
}

#[tokio::test]
async fn session_header_is_used_when_body_names_none() {
    let dir = TempDir::new().unwrap();
    let router = app(&config(dir.path(), "tmp", ""));

    let r = post(&router, json!({ "prompt": "hi" }).to_string(), Some("from-header")).await;
    assert_eq!(r["session_id"], json!("from-header"));

    let r = post(&router, json!({ "prompt": "hi", "session_id": "from-body" }).to_string(), Some("from-header")).await;
    assert_eq!(r["session_id"], json!("from-body"));

    let r = post_json(&router, json!({ "prompt": "hi" })).await;
    assert_eq!(r["session_id"], json!("default_session"));
}

#[tokio::test]
async fn model_failure_is_reported_not_raised() {
    let dir = TempDir::new().unwrap();
    let router = app(&config(
        dir.path(),
        "tmp",
        r#"
[llm]
default = "openai"

[llm.openai]
api_base_url = "http://127.0.0.1:1/v1/chat/completions"
timeout_seconds = 2
"#,
    ));

    for agent in ["chat", "session_chat", "memory_chat"] {
        let r = post_json(&router, json!({ "prompt": "Hello!", "agent": agent })).await;
        assert_well_formed(&r);
        assert_eq!(r["success"], json!(false), "{agent}");
        assert!(r["error"].as_str().is_some_and(|e| !e.is_empty()), "{agent}: {r}");
    }

    // Still serving afterwards.
    let r = post_json(&router, json!({ "agent": "hello" })).await;
    assert_eq!(r["success"], json!(true));
}

#[tokio::test]
async fn non_object_body_is_an_empty_request() {
    let dir = TempDir::new().unwrap();
    let router = app(&config(dir.path(), "tmp", ""));

    for body in ["[1, 2, 3]", "\"Hello\"", "not json", ""] {
        let r = post(&router, body, None).await;
        assert_eq!(r["success"], json!(true), "{body:?}: {r}");
        assert!(r["message"].as_str().unwrap().contains("Hello!"));
    }
}

#[tokio::test]
async fn facts_are_recalled_across_sessions() {
    let dir = TempDir::new().unwrap();
    let router = app(&config(dir.path(), "tmp", ""));

    post_json(
        &router,
        json!({ "prompt": "I love Python programming", "session_id": "monday", "actor_id": "bob" }),
    )
    .await;

    let r = post_json(
        &router,
        json!({
            "prompt": "Which programming language should I learn next?",
            "session_id": "tuesday",
            "actor_id": "bob",
            "agent": "memory_chat"
        }),
    )
    .await;
    assert_eq!(r["success"], json!(true));
    assert_eq!(r["turns_retrieved"], json!(0));
    assert_eq!(r["long_term_memories_found"], json!(1));
    assert!(r["message"].as_str().unwrap().contains("- I love Python programming"));

    // Another actor's facts stay invisible.
    let r = post_json(
        &router,
        json!({ "prompt": "Which programming language?", "actor_id": "carol", "agent": "memory_chat" }),
    )
    .await;
    assert_eq!(r["long_term_memories_found"], json!(0));
}

#[tokio::test]
async fn basic_session_store_survives_restart() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path(), "basic_session", "");

    let router = app(&cfg);
    post_json(&router, json!({ "prompt": "My name is Alice", "session_id": "s1" })).await;
    drop(router);

    let transcript = dir.path().join("memory/local-memory/default_user/s1/transcript.md");
    let text = std::fs::read_to_string(&transcript).unwrap();
    assert!(text.contains("### user"));
    assert!(text.contains("My name is Alice"));

    let router = app(&cfg);
    let r = post_json(&router, json!({ "prompt": "What is my name?", "session_id": "s1" })).await;
    assert_eq!(r["turns_retrieved"], json!(2));
    assert_eq!(r["turns_in_memory"], json!(4));
}

#[tokio::test]
async fn contacts_program_runs_in_sandbox() {
    let dir = TempDir::new().unwrap();
    let prompts = TempDir::new().unwrap();
    std::fs::write(
        prompts.path().join("contacts.txt"),
        "```sh\nprintf '[{\"name\": \"%s\", \"email\": \"%s\"}]' $(tail -n +2 input.csv | tr ',' ' ')\n```",
    )
    .unwrap();
    let mut cfg = config(dir.path(), "tmp", "");
    cfg.agents.prompts_dir = prompts.path().to_path_buf();
    let router = app(&cfg);

    let r = post_json(&router, json!({ "csv": "Name,Email\nAda,ada@example.com" })).await;
    assert_eq!(r["success"], json!(true), "{r}");
    assert_eq!(r["agent"], json!("contacts"));
    assert_eq!(r["contacts_found"], json!(1));
    assert_eq!(r["contacts"][0], json!({ "name": "Ada", "email": "ada@example.com" }));
}

// ── Routes ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ping_reports_healthy() {
    let dir = TempDir::new().unwrap();
    let router = app(&config(dir.path(), "tmp", ""));

    let resp = router
        .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&to_bytes(resp.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body, json!({ "status": "Healthy" }));
}

#[tokio::test]
async fn unknown_route_is_404() {
    let dir = TempDir::new().unwrap();
    let router = app(&config(dir.path(), "tmp", ""));

    let resp = router
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_on_invocations_is_rejected() {
    let dir = TempDir::new().unwrap();
    let router = app(&config(dir.path(), "tmp", ""));

    let resp = router
        .oneshot(Request::builder().uri("/invocations").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}
