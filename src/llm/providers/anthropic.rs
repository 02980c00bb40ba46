//! Anthropic Messages API provider (`/v1/messages`).
//!
//! Sends a single user message with `max_tokens` and the optional system
//! prompt in the top-level `system` field. Only text content blocks are
//! read from the reply.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::check_status;
use crate::llm::{LlmResponse, LlmUsage, ProviderError};

#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: Client,
    api_base_url: String,
    model: String,
    max_tokens: u32,
    anthropic_version: String,
    api_key: Option<String>,
}

impl AnthropicProvider {
    pub fn new(
        api_base_url: String,
        model: String,
        max_tokens: u32,
        anthropic_version: String,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, max_tokens, anthropic_version, api_key })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn complete(&self, content: &str, system: Option<&str>) -> Result<LlmResponse, ProviderError> {
        let payload = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: vec![Message { role: "user", content }],
        };

        debug!(model = %self.model, max_tokens = self.max_tokens, content_len = content.len(), "sending LLM request");

        let mut req = self
            .client
            .post(&self.api_base_url)
            .header("anthropic-version", &self.anthropic_version)
            .json(&payload);
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.api_base_url, error = %e, timeout = e.is_timeout(), "LLM HTTP request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;

        let response = check_status(response).await?;

        let parsed = response.json::<MessagesResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize LLM response");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        let text = parsed
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("\n");
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(ProviderError::Request("empty or missing content in response".into()));
        }

        let usage = parsed.usage.map(|u| LlmUsage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
        });

        Ok(LlmResponse { text, usage })
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<UsageData>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageData {
    input_tokens: u64,
    output_tokens: u64,
}
