use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use atende_core::config::{ProviderKind, ProviderSettings};

use crate::adapter::{CompletionRequest, ModelTier, ProviderAdapter, ProviderError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiAdapter {
    client: Client,
    settings: ProviderSettings,
}

impl OpenAiAdapter {
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self) -> String {
        let base = self.settings.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
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
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
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

        let mut messages =
            vec![WireMessage { role: "system", content: request.system_prompt }];
        messages.extend(request.history.iter().map(|message| WireMessage {
            role: message.role.as_str(),
            content: message.content.as_str(),
        }));
        messages.push(WireMessage { role: "user", content: request.user_message });

        let body = ChatCompletionRequest {
            model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16()));
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(ProviderError::from_reqwest)?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyReply);
        }
        Ok(text)
    }
}
