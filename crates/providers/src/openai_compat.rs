//! OpenAI-compatible adapter.
//!
//! Works with OpenAI, Azure-style proxies, Ollama, vLLM, and any other
//! endpoint that follows the OpenAI chat completions contract.

use serde_json::Value;

use qm_domain::config::LlmConfig;
use qm_domain::error::{Error, Result};

use crate::traits::CompletionClient;
use crate::util::from_reqwest;

/// A completion adapter for any OpenAI-compatible API endpoint.
pub struct OpenAiCompatClient {
    id: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Create a client from the deserialized config section.
    ///
    /// The API key is read once from the env var named in the config;
    /// a missing or empty key is a startup error, not a per-request one.
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::Config(format!("env var {} is not set", cfg.api_key_env))
            })?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: "openai_compat".into(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_output_tokens: cfg.max_output_tokens,
            client,
        })
    }

    fn build_body(&self, input: &str, instructions: &str) -> Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": instructions },
                { "role": "user", "content": input },
            ],
            "max_tokens": self.max_output_tokens,
            "temperature": self.temperature,
        })
    }
}

/// Pull the first choice's message content out of a chat completions body.
fn parse_completion(body: &Value, provider: &str) -> Result<String> {
    let message = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| Error::Provider {
            provider: provider.into(),
            message: "no choices in response".into(),
        })?;

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Provider {
            provider: provider.into(),
            message: "no content in message".into(),
        })?;

    Ok(content.to_string())
}

#[async_trait::async_trait]
impl CompletionClient for OpenAiCompatClient {
    async fn complete(&self, input: &str, instructions: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(input, instructions);

        tracing::debug!(provider = %self.id, url = %url, "chat completion request");

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_completion(&resp_json, &self.id)
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}
