//! Code interpreter tool: the model writes a program, we run it in a sandbox
//! directory with a wall-clock limit and hand back its stdout.
//!
//! The request's data is written to `input.csv` in a fresh temporary working
//! directory; the program is expected to read it from there. The directory
//! is removed when the run finishes.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use super::ToolError;
use crate::config::CodeInterpreterConfig;
use crate::llm::{LlmProvider, LlmUsage};

pub const INPUT_FILENAME: &str = "input.csv";
const SCRIPT_FILENAME: &str = "main.py";

/// Result of one interpreter run.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeOutput {
    /// Program stdout, or the model's reply when it answered without code.
    pub output: String,
    /// The program that was executed, if any.
    pub code: Option<String>,
    pub usage: Option<LlmUsage>,
}

#[derive(Debug, Clone)]
pub struct CodeInterpreterTool {
    interpreter: String,
    timeout_seconds: u64,
}

impl CodeInterpreterTool {
    pub fn new(config: &CodeInterpreterConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            timeout_seconds: config.timeout_seconds,
        }
    }

    /// Ask `llm` for a program solving `instruction` over `data`, then run it.
    pub async fn run(
        &self,
        llm: &LlmProvider,
        system: &str,
        instruction: &str,
        data: &str,
    ) -> Result<CodeOutput, ToolError> {
        let reply = llm
            .complete(instruction, Some(system))
            .await
            .map_err(|e| ToolError::Model(e.to_string()))?;

        let Some(code) = extract_code_block(&reply.text) else {
            debug!("code interpreter: model replied without code");
            return Ok(CodeOutput { output: reply.text, code: None, usage: reply.usage });
        };

        let output = self.execute(&code, data).await?;
        Ok(CodeOutput { output, code: Some(code), usage: reply.usage })
    }

    /// Run `code` with `data` available as [`INPUT_FILENAME`] in the working dir.
    pub async fn execute(&self, code: &str, data: &str) -> Result<String, ToolError> {
        let workdir = tempfile::Builder::new().prefix("entrybot-ci-").tempdir()?;
        tokio::fs::write(workdir.path().join(INPUT_FILENAME), data).await?;
        tokio::fs::write(workdir.path().join(SCRIPT_FILENAME), code).await?;

        info!(
            interpreter = %self.interpreter,
            code_len = code.len(),
            data_len = data.len(),
            "code interpreter: executing"
        );

        let child = Command::new(&self.interpreter)
            .arg(SCRIPT_FILENAME)
            .current_dir(workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let limit = Duration::from_secs(self.timeout_seconds);
        let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout_seconds = self.timeout_seconds, "code interpreter: timed out");
                return Err(ToolError::Timeout(self.timeout_seconds));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(status = %output.status, "code interpreter: program failed");
            return Err(ToolError::Execution(format!("{}: {stderr}", output.status)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Body of the first fenced code block in `text` (language tag dropped).
pub fn extract_code_block(text: &str) -> Option<String> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // The rest of the opening fence line is the language tag.
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    let code = body[..end].trim_end();
    (!code.trim().is_empty()).then(|| code.to_string())
}
