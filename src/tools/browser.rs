//! Browser tool: fetch a page over HTTP(S) and extract what a reader sees.

use std::time::Duration;

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::ToolError;
use crate::config::BrowserConfig;

const TRUNCATION_MARKER: &str = "... (content truncated)";

/// Title and visible body text of a loaded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub url: String,
    pub title: String,
    pub text: String,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct BrowserTool {
    client: Client,
    timeout_seconds: u64,
    max_content_chars: usize,
}

impl BrowserTool {
    pub fn new(config: &BrowserConfig) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ToolError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_seconds: config.timeout_seconds,
            max_content_chars: config.max_content_chars,
        })
    }

    /// Load `url` and return its title and (capped) body text.
    pub async fn fetch(&self, url: &str) -> Result<PageContent, ToolError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ToolError::InvalidInput(format!("'{url}' is not a valid URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ToolError::InvalidInput(format!(
                "unsupported scheme '{}' (expected http or https)",
                parsed.scheme()
            )));
        }

        debug!(%url, "browser: loading page");

        let response = self.client.get(parsed).send().await.map_err(|e| self.map_err(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "browser: non-success status");
            return Err(ToolError::Request(format!("HTTP {status}")));
        }

        let html = response.text().await.map_err(|e| self.map_err(url, e))?;
        let document = Html::parse_document(&html);

        let title = page_title(&document);
        let (text, truncated) = truncate_chars(&visible_text(&document), self.max_content_chars);

        debug!(%url, title = %title, chars = text.chars().count(), truncated, "browser: page loaded");

        Ok(PageContent { url: url.to_string(), title, text, truncated })
    }

    fn map_err(&self, url: &str, e: reqwest::Error) -> ToolError {
        if e.is_timeout() {
            warn!(%url, timeout_seconds = self.timeout_seconds, "browser: page load timed out");
            ToolError::Timeout(self.timeout_seconds)
        } else {
            ToolError::Request(e.to_string())
        }
    }
}

fn page_title(document: &Html) -> String {
    Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next().map(|t| t.text().collect::<String>()))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

/// Whitespace-normalised text under `<body>`, skipping non-rendered elements.
fn visible_text(document: &Html) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .unwrap_or_else(|| document.root_element());

    let mut words: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else { continue };
        let hidden = node.ancestors().filter_map(ElementRef::wrap).any(|el| {
            matches!(el.value().name(), "script" | "style" | "noscript" | "template" | "head")
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

/// Cap `text` at `max` characters, appending the truncation marker when cut.
fn truncate_chars(text: &str, max: usize) -> (String, bool) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (format!("{}{TRUNCATION_MARKER}", &text[..idx]), true),
        None => (text.to_string(), false),
    }
}
