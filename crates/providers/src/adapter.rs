use async_trait::async_trait;
use thiserror::Error;

use atende_core::config::ProviderKind;
use atende_core::domain::message::Message;

/// One completion turn, provider-agnostic. Adapters translate this into
/// their wire format; the model string comes from the adapter's own
/// settings so the caller never picks models directly.
#[derive(Clone, Copy, Debug)]
pub struct CompletionRequest<'a> {
    pub system_prompt: &'a str,
    pub history: &'a [Message],
    pub user_message: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Which of the adapter's configured models to use. `Degraded` maps to the
/// cheaper fallback model an operator may configure per provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelTier {
    Normal,
    Degraded,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("no api key configured")]
    MissingCredential,
    #[error("request timed out")]
    Timeout,
    #[error("provider returned http {status}")]
    Http { status: u16 },
    #[error("provider rate limited the request")]
    RateLimited,
    #[error("provider returned an empty reply")]
    EmptyReply,
    #[error("transport failure: {0}")]
    Transport(String),
}

impl ProviderError {
    pub(crate) fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(error.to_string())
        }
    }

    pub(crate) fn from_status(status: u16) -> Self {
        if status == 429 {
            Self::RateLimited
        } else {
            Self::Http { status }
        }
    }
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether the adapter has credentials and can be attempted at all.
    fn available(&self) -> bool;

    /// The model that would serve the given tier, if one is configured.
    fn model(&self, tier: ModelTier) -> Option<&str>;

    async fn invoke(
        &self,
        request: &CompletionRequest<'_>,
        tier: ModelTier,
    ) -> Result<String, ProviderError>;
}
