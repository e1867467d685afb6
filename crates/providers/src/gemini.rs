use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use atende_core::config::{ProviderKind, ProviderSettings};

use crate::adapter::{CompletionRequest, ModelTier, ProviderAdapter, ProviderError};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiAdapter {
    client: Client,
    settings: ProviderSettings,
}

impl GeminiAdapter {
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self, model: &str, api_key: &str) -> String {
        let base = self.settings.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}/models/{model}:generateContent?key={api_key}", base.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<TextPart>,
}

#[derive(Serialize, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

/// Gemini wants alternating content turns; the conversation is flattened
/// into a single user turn with labelled lines instead, which keeps short
/// onboarding histories intact without a role-mapping table.
fn flatten_transcript(request: &CompletionRequest<'_>) -> String {
    let mut lines = vec![format!("SYSTEM: {}", request.system_prompt)];
    for message in request.history {
        lines.push(format!("{}: {}", message.role.as_str().to_ascii_uppercase(), message.content));
    }
    lines.push(format!("USER: {}", request.user_message));
    lines.join("\n\n")
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
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

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![TextPart { text: flatten_transcript(request) }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint(model, api_key.expose_secret()))
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16()));
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(ProviderError::from_reqwest)?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyReply);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use atende_core::domain::message::Message;

    use super::flatten_transcript;
    use crate::adapter::CompletionRequest;

    #[test]
    fn transcript_flattens_with_role_labels() {
        let history =
            vec![Message::user("Qual o horário?"), Message::assistant("Das 8h às 18h.")];
        let request = CompletionRequest {
            system_prompt: "Você é uma atendente.",
            history: &history,
            user_message: "E aos sábados?",
            temperature: 0.3,
            max_tokens: 256,
        };

        let flat = flatten_transcript(&request);
        assert!(flat.starts_with("SYSTEM: Você é uma atendente."));
        assert!(flat.contains("USER: Qual o horário?"));
        assert!(flat.contains("ASSISTANT: Das 8h às 18h."));
        assert!(flat.ends_with("USER: E aos sábados?"));
    }
}
