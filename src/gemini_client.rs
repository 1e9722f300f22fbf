use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::error::GatewayError;
use crate::gateway::{Message, ModelGateway, Role};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

impl GeminiClient {
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
        let model = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };
        Ok(Url::parse(&format!("{base}/{model}:generateContent"))?)
    }

    fn request_body(&self, conversation: &[Message]) -> Value {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for message in conversation {
            let part = json!({ "text": message.content() });
            match message.role() {
                Role::System => system_parts.push(part),
                Role::User => contents.push(json!({ "role": "user", "parts": [part] })),
                Role::Assistant => contents.push(json!({ "role": "model", "parts": [part] })),
            }
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": self.temperature
            }
        });
        if !system_parts.is_empty() {
            body["systemInstruction"] = json!({ "parts": system_parts });
        }
        body
    }
}

#[async_trait]
impl ModelGateway for GeminiClient {
    async fn complete(&self, conversation: &[Message]) -> Result<Message, GatewayError> {
        let url = self.endpoint()?;
        let request_body = self.request_body(conversation);

        debug!(
            "Sending request to Gemini API: {}",
            serde_json::to_string_pretty(&request_body).unwrap_or_default()
        );

        // The key travels in a header so it never shows up in URLs or errors.
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
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
            error!("API request failed with response: {}", response_text);
            return Err(GatewayError::from_status(status.as_u16(), response_text));
        }

        let response_json: Value = serde_json::from_str(&response_text)
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        debug!("Received response from Gemini API: {}", response_text);

        let candidate = response_json
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .ok_or(GatewayError::EmptyResponse)?;

        if let Some(reason) = candidate.get("finishReason").and_then(Value::as_str) {
            if reason != "STOP" {
                info!("Gemini finished with reason {}", reason);
            }
        }

        let text = candidate
            .pointer("/content/parts")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default();

        Ok(Message::assistant(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::Server) -> GeminiClient {
        GeminiClient::new(reqwest::Client::new(), "g-key", "models/gemini-1.5-pro-002")
            .with_base_url(server.url())
    }

    #[test]
    fn system_message_becomes_system_instruction() {
        let client = GeminiClient::new(reqwest::Client::new(), "k", "gemini-1.5-pro-002");
        let body = client.request_body(&[
            Message::system("S"),
            Message::user("hello"),
            Message::assistant("hi"),
            Message::user("again"),
        ]);

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "S");
        let roles: Vec<_> = body["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, ["user", "model", "user"]);
    }

    #[test]
    fn endpoint_prefixes_bare_model_names() {
        let client = GeminiClient::new(reqwest::Client::new(), "k", "gemini-1.5-pro-002")
            .with_base_url("http://localhost:8080/v1beta/");
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "http://localhost:8080/v1beta/models/gemini-1.5-pro-002:generateContent"
        );
    }

    #[tokio::test]
    async fn joins_text_parts_of_first_candidate() {
        let mut server = mockito::Server::new_async().await;

        let response_body = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "Hello"}, {"text": " there"}]
                },
                "finishReason": "STOP"
            }]
        }"#;

        let mock = server
            .mock("POST", "/models/gemini-1.5-pro-002:generateContent")
            .match_header("x-goog-api-key", "g-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response_body)
            .create_async()
            .await;

        let reply = client_for(&server)
            .complete(&[Message::system("S"), Message::user("hello")])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(reply, Message::assistant("Hello there"));
    }

    #[tokio::test]
    async fn forbidden_maps_to_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-1.5-pro-002:generateContent")
            .with_status(403)
            .with_body(r#"{"error": {"status": "PERMISSION_DENIED"}}"#)
            .create_async()
            .await;

        let result = client_for(&server).complete(&[Message::system("S")]).await;
        assert!(matches!(result, Err(GatewayError::Auth { status: 403, .. })));
    }

    #[tokio::test]
    async fn connection_errors_do_not_leak_the_key() {
        let client = GeminiClient::new(reqwest::Client::new(), "SECRET-GOOGLE-KEY", "gemini-1.5-pro-002")
            .with_base_url("http://127.0.0.1:1/v1beta");

        let err = client.complete(&[Message::system("S")]).await.unwrap_err();

        assert!(matches!(err, GatewayError::Transport(_)));
        assert!(!err.to_string().contains("SECRET-GOOGLE-KEY"));
        assert!(!format!("{err:?}").contains("SECRET-GOOGLE-KEY"));
    }

    #[tokio::test]
    async fn missing_candidates_is_an_empty_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-1.5-pro-002:generateContent")
            .with_status(200)
            .with_body(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#)
            .create_async()
            .await;

        let result = client_for(&server).complete(&[Message::system("S")]).await;
        assert!(matches!(result, Err(GatewayError::EmptyResponse)));
    }
}
