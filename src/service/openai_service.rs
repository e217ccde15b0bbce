use serenity::async_trait;

use crate::clients::openai_client::{self, CompletionRequest, LlmEndpoint};
use crate::error::BotError;

#[async_trait]
pub trait OpenAIClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, BotError>;
}

pub struct OpenAIService {
    http: reqwest::Client,
    endpoint: LlmEndpoint,
}

impl OpenAIService {
    pub fn new(http: reqwest::Client, url: String, api_key: String, model: String) -> Self {
        Self {
            http,
            endpoint: LlmEndpoint {
                url,
                api_key,
                model,
            },
        }
    }
}

#[async_trait]
impl OpenAIClient for OpenAIService {
    async fn complete(&self, request: CompletionRequest) -> Result<String, BotError> {
        openai_client::query_openai(&self.http, &self.endpoint, &request).await
    }
}
