use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{BackendConfig, BackendId, ProviderKind};
use crate::error::GatewayError;
use crate::gemini_client::GeminiClient;
use crate::openai_client::OpenAiClient;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged chat message. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A remote model that turns a full conversation into one assistant reply.
///
/// The slice always starts with the system message. Implementations make a
/// single request: no retries, no streaming.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn complete(&self, conversation: &[Message]) -> Result<Message, GatewayError>;
}

pub type GatewayTable = BTreeMap<BackendId, Arc<dyn ModelGateway>>;

/// Builds one client per configured backend, sharing a single HTTP client.
pub fn build_gateways(backends: &[BackendConfig]) -> GatewayTable {
    let client = reqwest::Client::new();
    backends
        .iter()
        .map(|backend| (backend.id.clone(), build_gateway(backend, client.clone())))
        .collect()
}

pub fn build_gateway(backend: &BackendConfig, client: reqwest::Client) -> Arc<dyn ModelGateway> {
    debug!(
        backend = %backend.id,
        provider = backend.provider.as_str(),
        model = %backend.model,
        "Building model client"
    );
    match backend.provider {
        ProviderKind::OpenAi => {
            let mut gateway = OpenAiClient::new(client, &backend.api_key, &backend.model)
                .with_temperature(backend.temperature);
            if let Some(base_url) = &backend.base_url {
                gateway = gateway.with_base_url(base_url);
            }
            Arc::new(gateway)
        }
        ProviderKind::Gemini => {
            let mut gateway = GeminiClient::new(client, &backend.api_key, &backend.model)
                .with_temperature(backend.temperature);
            if let Some(base_url) = &backend.base_url {
                gateway = gateway.with_base_url(base_url);
            }
            Arc::new(gateway)
        }
    }
}
