//! OpenAI chat completions with `stream: true`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::base::{BaseLLM, DeltaStream, GenerationRequest, LLMConfig, LLMError, LLMResult};
use super::sse;

/// Default OpenAI REST base URL
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model
pub const DEFAULT_OPENAI_LLM_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

fn extract_delta(event: &str) -> Result<Option<String>, LLMError> {
    let chunk: CompletionChunk = serde_json::from_str(event)
        .map_err(|e| LLMError::StreamError(format!("{e}: {event}")))?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|text| !text.is_empty()))
}

pub struct OpenAILLM {
    http_client: Client,
    url: String,
    api_key: String,
    model: String,
}

impl OpenAILLM {
    pub fn new(config: LLMConfig) -> LLMResult<Self> {
        if config.api_key.is_empty() {
            return Err(LLMError::InvalidConfiguration(
                "OpenAI API key is required".to_string(),
            ));
        }

        let http_client = Client::builder()
            .pool_max_idle_per_host(8)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                LLMError::InvalidConfiguration(format!("Failed to create HTTP client: {e}"))
            })?;

        let base = config
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_API_BASE_URL)
            .trim_end_matches('/');

        Ok(Self {
            http_client,
            url: format!("{base}/chat/completions"),
            api_key: config.api_key,
            model: if config.model.is_empty() {
                DEFAULT_OPENAI_LLM_MODEL.to_string()
            } else {
                config.model
            },
        })
    }
}

#[async_trait]
impl BaseLLM for OpenAILLM {
    async fn generate_stream(&self, request: GenerationRequest) -> LLMResult<DeltaStream> {
        let mut messages = vec![json!({"role": "system", "content": request.system_prompt})];
        messages.extend(
            request
                .messages
                .iter()
                .map(|m| json!({"role": m.role.as_str(), "content": m.content})),
        );

        debug!(model = %self.model, messages = messages.len(), "Opening OpenAI chat stream");

        let response = self
            .http_client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": messages,
                "max_tokens": request.max_tokens,
                "temperature": request.temperature,
                "stream": true,
            }))
            .send()
            .await
            .map_err(|e| LLMError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = format!("OpenAI chat request failed ({status}): {text}");
            return Err(if status.as_u16() == 401 {
                LLMError::AuthenticationFailed(message)
            } else {
                LLMError::ProviderError(message)
            });
        }

        Ok(sse::response_deltas(response, extract_delta))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversation::ChatMessage;
    use futures::StreamExt;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_extract_delta() {
        assert_eq!(
            extract_delta(r#"{"choices":[{"index":0,"delta":{"content":"Hi"}}]}"#).unwrap(),
            Some("Hi".to_string())
        );
        assert_eq!(
            extract_delta(r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#).unwrap(),
            None
        );
        assert_eq!(extract_delta(r#"{"choices":[]}"#).unwrap(), None);
    }

    #[tokio::test]
    async fn test_generate_stream() {
        let server = MockServer::start().await;
        let body = "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"Sure.\"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\" Done!\"}}]}\n\n\
                    data: [DONE]\n\n";
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini", "stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let llm = OpenAILLM::new(LLMConfig {
            api_key: "sk-test".to_string(),
            base_url: Some(server.uri()),
            ..Default::default()
        })
        .unwrap();
        let request = GenerationRequest {
            system_prompt: "Be brief".to_string(),
            messages: vec![ChatMessage::user("Can you help?")],
            max_tokens: 32,
            temperature: 0.2,
        };
        let deltas: Vec<String> = llm
            .generate_stream(request)
            .await
            .unwrap()
            .map(|d| d.unwrap())
            .collect()
            .await;
        assert_eq!(deltas, vec!["Sure.", " Done!"]);
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            OpenAILLM::new(LLMConfig::default()),
            Err(LLMError::InvalidConfiguration(_))
        ));
    }
}
