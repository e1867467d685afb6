use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use atende_core::config::{ProviderKind, ProviderSettings};

use crate::adapter::{CompletionRequest, ModelTier, ProviderAdapter, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicAdapter {
    client: Client,
    settings: ProviderSettings,
}

impl AnthropicAdapter {
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self) -> String {
        let base = self.settings.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}/messages", base.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn available(&self) -> bool {
        self.settings.api_key.is_some()
    }

    fn model(&self, tier: ModelTier) -> Option<&str> {
        match tier {
            ModelTier::Normal => Some(self.settings.model.as_str()),
            ModelTier::Degraded => self.settings.fallback_model.as_deref(),
        }
    }

    async fn invoke(
        &self,
        request: &CompletionRequest<'_>,
        tier: ModelTier,
    ) -> Result<String, ProviderError> {
        let api_key = self.settings.api_key.as_ref().ok_or(ProviderError::MissingCredential)?;
        let model = self.model(tier).ok_or(ProviderError::MissingCredential)?;

        // The system prompt travels in its own field; messages carry only
        // the user/assistant turns.
        let mut messages: Vec<WireMessage<'_>> = request
            .history
            .iter()
            .map(|message| WireMessage {
                role: message.role.as_str(),
                content: message.content.as_str(),
            })
            .collect();
        messages.push(WireMessage { role: "user", content: request.user_message });

        let body = MessagesRequest {
            model,
            system: request.system_prompt,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16()));
        }

        let parsed: MessagesResponse =
            response.json().await.map_err(ProviderError::from_reqwest)?;

        let text = parsed
            .content
            .into_iter()
            .map(|block| block.text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyReply);
        }
        Ok(text)
    }
}
