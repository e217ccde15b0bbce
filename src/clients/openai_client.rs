use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::BotError;
use crate::models::chat::{ChatMessage, Role};

/// One chat-completion call: system instructions plus the conversation so far.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            system: system.into(),
            messages,
            temperature: 0.7,
            max_tokens: 500,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

pub struct LlmEndpoint {
    pub url: String,
    pub api_key: String,
    pub model: String,
}

pub async fn query_openai(
    http: &reqwest::Client,
    endpoint: &LlmEndpoint,
    request: &CompletionRequest,
) -> Result<String, BotError> {
    let mut messages = vec![OpenAIMessage {
        role: Role::System,
        content: &request.system,
    }];
    messages.extend(request.messages.iter().map(|m| OpenAIMessage {
        role: m.role,
        content: &m.content,
    }));

    let body = OpenAIRequest {
        model: &endpoint.model,
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    };

    let response = http
        .post(&endpoint.url)
        .bearer_auth(&endpoint.api_key)
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        warn!(%status, body = %text, "completion request failed");
        return Err(BotError::Llm(format!("Request failed with status {}", status)));
    }

    let parsed: OpenAIResponse = serde_json::from_str(&text)?;
    match parsed.choices.into_iter().next().and_then(|c| c.message.content) {
        Some(content) => {
            debug!(chars = content.len(), "completion received");
            Ok(content.trim().to_string())
        }
        None => Err(BotError::Llm("No response from the model".to_string())),
    }
}
