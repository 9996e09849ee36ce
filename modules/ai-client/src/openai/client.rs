use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::types::{ApiErrorBody, ChatRequest, ChatResponse};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Thin transport over `/chat/completions`. One instance per completion call.
pub(crate) struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building OpenAI HTTP client")?;
        let base = base_url.unwrap_or(OPENAI_API_URL).trim_end_matches('/');
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            endpoint: format!("{base}/chat/completions"),
        })
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!(model = %request.model, messages = request.messages.len(), "OpenAI chat request");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .context("sending OpenAI chat request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(model = %request.model, "OpenAI rate limited the request");
            }
            bail!("OpenAI API error ({status}): {message}");
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("decoding OpenAI chat response")?;
        if let Some(usage) = &parsed.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI token usage"
            );
        }
        Ok(parsed)
    }
}

/// `error.message` from an OpenAI error body, or the raw body when it isn't JSON.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
