use crate::traits::LanguageModel;
use crate::AnswerError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CHAT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_CHAT_MODEL: &str = "llama3-8b-8192";

#[derive(Debug, Clone)]
pub struct LlmEndpointConfig {
    pub endpoint: Url,
    pub api_key: String,
    pub model: String,
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let value = value.trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

impl LlmEndpointConfig {
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, AnswerError> {
        let endpoint = Url::parse(endpoint).map_err(|error| {
            AnswerError::Config(format!("invalid llm endpoint {endpoint}: {error}"))
        })?;
        Ok(Self {
            endpoint,
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Reads `GROQ_API_KEY` (required), `DOCBOT_LLM_ENDPOINT` and `DOCBOT_LLM_MODEL`.
    pub fn from_env() -> Result<Self, AnswerError> {
        let api_key = non_empty_env("GROQ_API_KEY")
            .ok_or_else(|| AnswerError::Config("GROQ_API_KEY is not set".to_string()))?;
        let endpoint = non_empty_env("DOCBOT_LLM_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_CHAT_ENDPOINT.to_string());
        let model =
            non_empty_env("DOCBOT_LLM_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string());

        Self::new(&endpoint, api_key, model)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions client (Groq by default).
pub struct ChatCompletionsClient {
    client: Client,
    config: LlmEndpointConfig,
}

impl ChatCompletionsClient {
    pub fn new(config: LlmEndpointConfig, timeout: Duration) -> Result<Self, AnswerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| AnswerError::Config(format!("failed to build http client: {error}")))?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

fn reply_text(response: ChatResponse) -> Result<String, AnswerError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AnswerError::Upstream("llm response had no choices".to_string()))
}

#[async_trait]
impl LanguageModel for ChatCompletionsClient {
    async fn complete(&self, prompt: &str) -> Result<String, AnswerError> {
        let payload = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.config.endpoint.clone())
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| AnswerError::Upstream(error.to_string()))?;

        if !response.status().is_success() {
            return Err(AnswerError::Upstream(format!(
                "chat completion request to {} returned {}",
                self.config.endpoint,
                response.status()
            )));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|error| AnswerError::Upstream(format!("invalid llm response: {error}")))?;
        reply_text(payload)
    }
}

/// Stands in for a client that could not be configured; every call fails
/// with the configuration problem instead of reaching the network.
pub struct UnconfiguredModel {
    reason: String,
}

impl UnconfiguredModel {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl LanguageModel for UnconfiguredModel {
    async fn complete(&self, _prompt: &str) -> Result<String, AnswerError> {
        Err(AnswerError::Config(self.reason.clone()))
    }
}
