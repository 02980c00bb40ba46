//! Tool collaborators — opaque executors the agents delegate whole tasks to.
//!
//! - [`browser::BrowserTool`] loads a page and returns its title and text.
//! - [`code_interpreter::CodeInterpreterTool`] has the model write a program
//!   over the request's data and runs it in a scratch directory.

pub mod browser;
pub mod code_interpreter;

use thiserror::Error;

use crate::config::ToolsConfig;
use browser::BrowserTool;
use code_interpreter::CodeInterpreterTool;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("request failed: {0}")]
    Request(String),

    #[error("model call failed: {0}")]
    Model(String),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// All tools, built once at start-up.
#[derive(Debug, Clone)]
pub struct Tools {
    pub browser: BrowserTool,
    pub code_interpreter: CodeInterpreterTool,
}

impl Tools {
    pub fn new(config: &ToolsConfig) -> Result<Self, ToolError> {
        Ok(Self {
            browser: BrowserTool::new(&config.browser)?,
            code_interpreter: CodeInterpreterTool::new(&config.code_interpreter),
        })
    }
}
