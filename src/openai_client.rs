use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::error::GatewayError;
use crate::gateway::{Message, ModelGateway};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for the chat completions API and endpoints compatible with it.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: crate::config::DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self) -> Result<Url, GatewayError> {
        let base = self.base_url.trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/chat/completions"))?)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl ModelGateway for OpenAiClient {
    async fn complete(&self, conversation: &[Message]) -> Result<Message, GatewayError> {
        let url = self.endpoint()?;
        let request_body = ChatRequest {
            model: &self.model,
            messages: conversation,
            temperature: self.temperature,
        };

        debug!(
            model = %self.model,
            messages = conversation.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.without_url()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.without_url()))?;

        if !status.is_success() {
            error!("Chat completion failed with status {}: {}", status, response_text);
            return Err(GatewayError::from_status(status.as_u16(), response_text));
        }

        debug!("Received chat completion response: {}", response_text);

        let parsed: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(GatewayError::EmptyResponse)?;

        Ok(Message::assistant(choice.message.content.unwrap_or_default()))
    }
}
