use futures::future::BoxFuture;
use futures::FutureExt;

use crate::types::{ChatMessage, ChatRequest, ChatResponse};
use crate::{ModelError, ModelInvoker, Result};

// ─── ModelConfig ──────────────────────────────────────────────────────────

/// Connection settings for an OpenAI-compatible completions endpoint.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Bearer token for the endpoint.
    pub api_key: String,
    /// Base URL without the `/chat/completions` suffix
    /// (e.g. `https://api.openai.com/v1`).
    pub base_url: String,
    /// Model name (e.g. `gpt-4o-mini`).
    pub model: String,
    /// Sampling temperature; `None` uses the provider default.
    pub temperature: Option<f64>,
}

impl ModelConfig {
    /// Build a config from the conventional environment variables.
    ///
    /// `OOO_API_KEY` wins over `OPENAI_API_KEY`; `OOO_API_BASE` /
    /// `OPENAI_API_BASE` override the default endpoint. Returns
    /// [`ModelError::MissingCredentials`] if no key is set.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("OOO_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| ModelError::MissingCredentials)?;
        let base_url = std::env::var("OOO_API_BASE")
            .or_else(|_| std::env::var("OPENAI_API_BASE"))
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        Ok(ModelConfig {
            api_key,
            base_url,
            model: model.into(),
            temperature: Some(0.1),
        })
    }
}

// ─── ModelClient ──────────────────────────────────────────────────────────

/// HTTP client for one OpenAI-compatible model endpoint.
///
/// Cheap to clone; the inner `reqwest::Client` pools connections.
#[derive(Debug, Clone)]
pub struct ModelClient {
    http: reqwest::Client,
    config: ModelConfig,
}

impl ModelClient {
    pub fn new(config: ModelConfig) -> Self {
        ModelClient {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one user prompt and return the assistant's raw text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: self.config.temperature,
        };

        tracing::debug!(model = %self.config.model, prompt_len = prompt.len(), "model invocation");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp.json().await?;
        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "model invocation complete"
            );
        }

        parsed
            .first_text()
            .map(str::to_owned)
            .ok_or(ModelError::EmptyResponse)
    }
}

impl ModelInvoker for ModelClient {
    fn invoke<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        self.complete(prompt).boxed()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
