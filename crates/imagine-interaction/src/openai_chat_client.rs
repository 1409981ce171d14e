//! OpenAiChatClient - Direct REST client for the OpenAI Chat Completions API.
//!
//! Serves both collaborators of a group chat: character replies
//! ([`ResponseGenerator`]) and character suggestions
//! ([`CharacterSuggestionService`]).
//! Configuration priority: ~/.config/imagine-chat/secret.json > environment variables

use async_trait::async_trait;
use imagine_core::agent::ResponseGenerator;
use imagine_core::config::{AppConfig, DEFAULT_OPENAI_BASE_URL};
use imagine_core::error::{ImagineError, Result};
use imagine_core::persona::{CharacterSuggestionService, parse_character_list};
use imagine_core::session::TranscriptLine;
use imagine_infrastructure::storage::SecretStorage;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const SUGGESTION_SYSTEM_PROMPT: &str = "Generate lists of characters.";

/// Client for the OpenAI HTTP API.
///
/// Every request is bounded by the configured timeout and fails once it
/// elapses.
#[derive(Clone)]
pub struct OpenAiChatClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    suggestion_model: String,
    suggestion_max_tokens: Option<u32>,
    timeout: Duration,
}

impl OpenAiChatClient {
    /// Creates a client with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            suggestion_model: model.clone(),
            model,
            max_tokens: None,
            temperature: None,
            suggestion_max_tokens: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Creates a client using the generation and suggestion settings of `config`.
    pub fn from_config(api_key: impl Into<String>, config: &AppConfig) -> Self {
        let generation = &config.generation;
        Self::new(api_key, generation.model.clone())
            .with_base_url(generation.base_url.clone())
            .with_max_tokens(generation.max_tokens)
            .with_temperature(generation.temperature)
            .with_timeout(generation.request_timeout())
            .with_suggestion_model(config.suggestion.model.clone())
            .with_suggestion_max_tokens(config.suggestion.max_tokens)
    }

    /// Loads the API key from ~/.config/imagine-chat/secret.json or environment variables.
    ///
    /// Priority:
    /// 1. ~/.config/imagine-chat/secret.json
    /// 2. Environment variables (OPENAI_API_KEY, OPENAI_MODEL_NAME)
    ///
    /// A model name found next to the key overrides the configured reply model.
    pub fn try_from_env(config: &AppConfig) -> Result<Self> {
        if let Ok(storage) = SecretStorage::new() {
            if let Ok(secret_config) = storage.load() {
                if let Some(openai) = secret_config.openai.filter(|o| !o.api_key.is_empty()) {
                    let client = Self::from_config(openai.api_key, config);
                    return Ok(match openai.model_name {
                        Some(model) => client.with_model(model),
                        None => client,
                    });
                }
            }
        }

        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            ImagineError::config(
                "OPENAI_API_KEY not found in ~/.config/imagine-chat/secret.json or environment variables",
            )
        })?;

        let client = Self::from_config(api_key, config);
        Ok(match env::var("OPENAI_MODEL_NAME") {
            Ok(model) => client.with_model(model),
            Err(_) => client,
        })
    }

    /// Overrides the reply model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the maximum number of tokens per reply.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Points the client at another OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_suggestion_model(mut self, model: impl Into<String>) -> Self {
        self.suggestion_model = model.into();
        self
    }

    pub fn with_suggestion_max_tokens(mut self, max_tokens: u32) -> Self {
        self.suggestion_max_tokens = Some(max_tokens);
        self
    }

    async fn send_request(
        &self,
        body: &ChatCompletionRequest,
    ) -> std::result::Result<Vec<String>, UpstreamError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| UpstreamError {
                status: None,
                message: if err.is_timeout() {
                    format!("OpenAI API request timed out after {}s", self.timeout.as_secs())
                } else {
                    format!("OpenAI API request failed: {err}")
                },
                is_retryable: err.is_connect() || err.is_timeout(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read OpenAI error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| UpstreamError {
            status: None,
            message: format!("Failed to parse OpenAI response: {err}"),
            is_retryable: false,
        })?;

        Ok(extract_candidates(parsed))
    }
}

#[async_trait]
impl ResponseGenerator for OpenAiChatClient {
    async fn generate(
        &self,
        system_prompt: &str,
        transcript: &[TranscriptLine],
    ) -> Result<Vec<String>> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: build_messages(system_prompt, transcript),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(model = %request.model, lines = transcript.len(), "Requesting reply");
        self.send_request(&request)
            .await
            .map_err(|err| ImagineError::generation(err.to_string()))
    }
}

#[async_trait]
impl CharacterSuggestionService for OpenAiChatClient {
    async fn suggest(&self, context: &str) -> Result<Vec<String>> {
        let request = ChatCompletionRequest {
            model: self.suggestion_model.clone(),
            messages: vec![
                ChatMessage::new("system", SUGGESTION_SYSTEM_PROMPT),
                ChatMessage::new("user", suggestion_prompt(context)),
            ],
            max_tokens: self.suggestion_max_tokens,
            temperature: self.temperature,
        };

        let candidates = self
            .send_request(&request)
            .await
            .map_err(|err| ImagineError::suggestion(err.to_string()))?;

        candidates
            .first()
            .map(|list| parse_character_list(list))
            .ok_or_else(|| ImagineError::suggestion("OpenAI API returned no content in the response"))
    }
}

fn suggestion_prompt(context: &str) -> String {
    format!(
        "Return the top potential characters from {context}. Respond with just a sequential \
         list of their names, separated by semi colons. No other text before or after."
    )
}

/// System message first, then one user message per transcript line.
fn build_messages(system_prompt: &str, transcript: &[TranscriptLine]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(transcript.len() + 1);
    messages.push(ChatMessage::new("system", system_prompt));
    messages.extend(
        transcript
            .iter()
            .map(|line| ChatMessage::new("user", line.render())),
    );
    messages
}

#[derive(Debug)]
struct UpstreamError {
    status: Option<u16>,
    message: String,
    is_retryable: bool,
}

impl std::fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {status}: {}", self.message)?,
            None => write!(f, "{}", self.message)?,
        }
        if self.is_retryable {
            write!(f, " (retryable)")?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl ChatMessage {
    fn new(role: &'static str, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_candidates(response: ChatCompletionResponse) -> Vec<String> {
    response
        .choices
        .into_iter()
        .filter_map(|choice| choice.message.content)
        .collect()
}

fn map_http_error(status: StatusCode, body: String) -> UpstreamError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    UpstreamError {
        status: Some(status.as_u16()),
        message,
        is_retryable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagine_core::config::DEFAULT_CHAT_MODEL as DEFAULT_MODEL;

    #[test]
    fn test_build_messages_puts_persona_first() {
        let transcript = vec![
            TranscriptLine::new("", "📢 Elaine has joined the chat."),
            TranscriptLine::new("Jerry", "Elaine, what do you think?"),
        ];
        let messages = build_messages("Your name is Elaine.", &transcript);

        let json = serde_json::to_value(&messages).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "role": "system", "content": "Your name is Elaine." },
                { "role": "user", "content": ": 📢 Elaine has joined the chat." },
                { "role": "user", "content": "Jerry: Elaine, what do you think?" },
            ])
        );
    }

    #[test]
    fn test_request_omits_unset_options() {
        let request = ChatCompletionRequest {
            model: DEFAULT_MODEL.to_string(),
            messages: Vec::new(),
            max_tokens: None,
            temperature: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_extract_candidates_skips_empty_choices() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{ "choices": [
                { "message": { "content": null } },
                { "message": { "content": "Hello, Newman." } }
            ] }"#,
        )
        .unwrap();

        assert_eq!(extract_candidates(response), vec!["Hello, Newman."]);
    }

    #[test]
    fn test_map_http_error_reads_error_body() {
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{ "error": { "message": "Rate limit reached", "type": "requests" } }"#.to_string(),
        );
        assert_eq!(err.status, Some(429));
        assert_eq!(err.message, "Rate limit reached");
        assert!(err.is_retryable);
        assert_eq!(err.to_string(), "HTTP 429: Rate limit reached (retryable)");

        let err = map_http_error(StatusCode::UNAUTHORIZED, "bad key".to_string());
        assert_eq!(err.message, "bad key");
        assert!(!err.is_retryable);
    }

    #[test]
    fn test_from_config_applies_settings() {
        let mut config = AppConfig::default();
        config.generation.base_url = "http://localhost:8080/v1/".to_string();
        config.suggestion.model = "gpt-4o-mini".to_string();

        let client = OpenAiChatClient::from_config("sk-test", &config);
        assert_eq!(client.base_url, "http://localhost:8080/v1");
        assert_eq!(client.model, DEFAULT_MODEL);
        assert_eq!(client.max_tokens, Some(50));
        assert_eq!(client.suggestion_model, "gpt-4o-mini");
        assert_eq!(client.suggestion_max_tokens, Some(100));
        assert_eq!(client.timeout, Duration::from_secs(60));
    }
}
