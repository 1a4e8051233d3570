//! Cloudflare Workers AI text generation (streamed).
//!
//! Streaming runs return `text/event-stream` with one
//! `data: {"response": "..."}` event per delta and a closing `data: [DONE]`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::base::{BaseLLM, DeltaStream, GenerationRequest, LLMConfig, LLMError, LLMResult};
use super::sse;
use crate::core::cloudflare;

/// Default Workers AI instruction-tuned model
pub const DEFAULT_WORKERS_AI_LLM_MODEL: &str = "@cf/meta/llama-3.1-8b-instruct";

#[derive(Debug, Serialize)]
struct RunMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    messages: Vec<RunMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct RunDelta {
    #[serde(default)]
    response: Option<String>,
}

fn extract_delta(event: &str) -> Result<Option<String>, LLMError> {
    let delta: RunDelta = serde_json::from_str(event)
        .map_err(|e| LLMError::StreamError(format!("{e}: {event}")))?;
    Ok(delta.response.filter(|text| !text.is_empty()))
}

/// Workers AI streaming chat client
pub struct WorkersAiLLM {
    http_client: Client,
    url: String,
    api_token: String,
}

impl WorkersAiLLM {
    pub fn new(config: LLMConfig) -> LLMResult<Self> {
        let account_id = config
            .account_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                LLMError::InvalidConfiguration("Workers AI account id is required".to_string())
            })?;
        if config.api_key.is_empty() {
            return Err(LLMError::InvalidConfiguration(
                "Workers AI API token is required".to_string(),
            ));
        }
        let model = if config.model.is_empty() {
            DEFAULT_WORKERS_AI_LLM_MODEL
        } else {
            config.model.as_str()
        };

        let http_client = Client::builder()
            .pool_max_idle_per_host(8)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                LLMError::InvalidConfiguration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            http_client,
            url: cloudflare::run_url(config.base_url.as_deref(), account_id, model),
            api_token: config.api_key,
        })
    }
}

#[async_trait]
impl BaseLLM for WorkersAiLLM {
    async fn generate_stream(&self, request: GenerationRequest) -> LLMResult<DeltaStream> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(RunMessage {
            role: "system",
            content: &request.system_prompt,
        });
        messages.extend(request.messages.iter().map(|m| RunMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));

        debug!(
            messages = messages.len(),
            max_tokens = request.max_tokens,
            "Opening Workers AI generation stream"
        );

        let body = RunRequest {
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
        };

        let response = self
            .http_client
            .post(&self.url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = cloudflare::describe_failure(status, &text);
            return Err(if status.as_u16() == 401 || status.as_u16() == 403 {
                LLMError::AuthenticationFailed(message)
            } else {
                LLMError::ProviderError(message)
            });
        }

        Ok(sse::response_deltas(response, extract_delta))
    }

    fn provider_name(&self) -> &'static str {
        "workers-ai"
    }
}
