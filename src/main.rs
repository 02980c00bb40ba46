//! entrybot — service entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Build model, memory and tool collaborators
//!   6. Register agents
//!   7. Spawn Ctrl-C → shutdown signal watcher
//!   8. Serve the invocation endpoint until shutdown

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use entrybot::agents::{AgentsState, AgentsSubsystem};
use entrybot::comms::HttpChannel;
use entrybot::config::{self, Config};
use entrybot::error::AppError;
use entrybot::llm;
use entrybot::logger;
use entrybot::memory::MemorySystem;
use entrybot::tools::Tools;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Optional file.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some())?;

    info!(
        bot_name = %config.bot_name,
        work_dir = %config.work_dir.display(),
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    std::fs::create_dir_all(&config.work_dir).map_err(|e| {
        AppError::Config(format!("cannot create work_dir {}: {e}", config.work_dir.display()))
    })?;

    let provider = llm::providers::build(&config.llm, config.llm_api_key.clone())
        .map_err(|e| AppError::Config(e.to_string()))?;
    let memory = MemorySystem::new(&config.memory, &config.work_dir)?;
    let tools = Tools::new(&config.tools).map_err(|e| AppError::Config(e.to_string()))?;

    let state = AgentsState::new(&config, provider, memory, tools);
    let agents = Arc::new(AgentsSubsystem::new(&config.agents, state)?);

    print_startup_summary(&config, &agents);

    // Shared shutdown token; Ctrl-C cancels it.
    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    HttpChannel::new("http", config.http.bind.clone(), agents)
        .run(shutdown)
        .await
}

fn print_startup_summary(config: &Config, agents: &AgentsSubsystem) {
    let state = agents.state();
    info!(
        llm_provider = %config.llm.provider,
        model = %state.llm.model_label(),
        "model ready"
    );
    info!(
        store = %state.memory.store_type(),
        memory_id = %state.memory.memory_id(),
        region = %state.memory.region(),
        "memory ready"
    );
    info!(
        interpreter = %config.tools.code_interpreter.interpreter,
        browser_timeout_s = config.tools.browser.timeout_seconds,
        "tools ready"
    );
    info!(
        agents = %agents.agent_ids().join(", "),
        default = %agents.default_agent(),
        "agents registered"
    );
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: entrybot [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    // -v warn, -vv info, -vvv debug, -vvvv+ trace.
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, config_path }
}
