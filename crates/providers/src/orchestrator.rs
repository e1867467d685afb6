use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};

use atende_core::config::{AiConfig, ProviderKind};

use crate::adapter::{CompletionRequest, ModelTier, ProviderAdapter, ProviderError};
use crate::anthropic::AnthropicAdapter;
use crate::backend::CompletionBackend;
use crate::gemini::GeminiAdapter;
use crate::openai::OpenAiAdapter;

#[derive(Clone, Debug)]
pub struct Completion {
    pub text: String,
    pub provider: ProviderKind,
    pub model: String,
    pub tier: ModelTier,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("all providers unavailable after {} attempt(s)", attempts.len())]
    AllProvidersUnavailable { attempts: Vec<(ProviderKind, ProviderError)> },
}

struct ProviderSlot {
    adapter: Box<dyn ProviderAdapter>,
    /// Sticky hint that the provider rate limited us. While set, calls
    /// start on the degraded model; a success that started degraded
    /// clears it so the next call probes the normal model again.
    degraded: AtomicBool,
}

/// Tries providers in configured order and returns the first usable reply.
pub struct FallbackOrchestrator {
    slots: Vec<ProviderSlot>,
    timeout: Duration,
}

impl FallbackOrchestrator {
    pub fn new(adapters: Vec<Box<dyn ProviderAdapter>>, timeout: Duration) -> Self {
        let slots = adapters
            .into_iter()
            .map(|adapter| ProviderSlot { adapter, degraded: AtomicBool::new(false) })
            .collect();
        Self { slots, timeout }
    }

    pub fn from_config(ai: &AiConfig) -> Self {
        let client = Client::new();
        let adapters = ai
            .provider_order
            .iter()
            .map(|kind| {
                let settings = ai.settings(*kind).clone();
                let adapter: Box<dyn ProviderAdapter> = match kind {
                    ProviderKind::OpenAi => {
                        Box::new(OpenAiAdapter::new(client.clone(), settings))
                    }
                    ProviderKind::Anthropic => {
                        Box::new(AnthropicAdapter::new(client.clone(), settings))
                    }
                    ProviderKind::Gemini => {
                        Box::new(GeminiAdapter::new(client.clone(), settings))
                    }
                };
                adapter
            })
            .collect();
        Self::new(adapters, Duration::from_secs(ai.timeout_secs))
    }

    pub fn provider_kinds(&self) -> Vec<ProviderKind> {
        self.slots.iter().map(|slot| slot.adapter.kind()).collect()
    }

    pub fn any_available(&self) -> bool {
        self.slots.iter().any(|slot| slot.adapter.available())
    }

    async fn attempt(
        &self,
        slot: &ProviderSlot,
        request: &CompletionRequest<'_>,
        tier: ModelTier,
    ) -> Result<String, ProviderError> {
        match tokio::time::timeout(self.timeout, slot.adapter.invoke(request, tier)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        }
    }

    fn completion(&self, slot: &ProviderSlot, text: String, tier: ModelTier) -> Completion {
        let model = slot.adapter.model(tier).unwrap_or_default().to_string();
        Completion { text, provider: slot.adapter.kind(), model, tier }
    }

    pub async fn complete(
        &self,
        request: &CompletionRequest<'_>,
    ) -> Result<Completion, CompletionError> {
        let mut attempts: Vec<(ProviderKind, ProviderError)> = Vec::new();

        for slot in &self.slots {
            let kind = slot.adapter.kind();

            if !slot.adapter.available() {
                debug!(
                    event_name = "completion.provider_skipped",
                    provider = kind.as_str(),
                    "provider has no credentials, skipping"
                );
                attempts.push((kind, ProviderError::MissingCredential));
                continue;
            }

            let has_degraded = slot.adapter.model(ModelTier::Degraded).is_some();
            let start_tier = if has_degraded && slot.degraded.load(Ordering::Relaxed) {
                ModelTier::Degraded
            } else {
                ModelTier::Normal
            };

            match self.attempt(slot, request, start_tier).await {
                Ok(text) => {
                    if start_tier == ModelTier::Degraded {
                        slot.degraded.store(false, Ordering::Relaxed);
                    }
                    info!(
                        event_name = "completion.succeeded",
                        provider = kind.as_str(),
                        degraded = start_tier == ModelTier::Degraded,
                        "provider returned a reply"
                    );
                    return Ok(self.completion(slot, text, start_tier));
                }
                Err(ProviderError::RateLimited)
                    if start_tier == ModelTier::Normal && has_degraded =>
                {
                    slot.degraded.store(true, Ordering::Relaxed);
                    warn!(
                        event_name = "completion.rate_limited",
                        provider = kind.as_str(),
                        "rate limited, retrying once on the degraded model"
                    );
                    match self.attempt(slot, request, ModelTier::Degraded).await {
                        Ok(text) => {
                            return Ok(self.completion(slot, text, ModelTier::Degraded));
                        }
                        Err(error) => {
                            warn!(
                                event_name = "completion.provider_failed",
                                provider = kind.as_str(),
                                error = %error,
                                "degraded retry failed, moving on"
                            );
                            attempts.push((kind, error));
                        }
                    }
                }
                Err(error) => {
                    warn!(
                        event_name = "completion.provider_failed",
                        provider = kind.as_str(),
                        error = %error,
                        "provider attempt failed, moving on"
                    );
                    attempts.push((kind, error));
                }
            }
        }

        Err(CompletionError::AllProvidersUnavailable { attempts })
    }
}

#[async_trait]
impl CompletionBackend for FallbackOrchestrator {
    async fn complete(
        &self,
        request: &CompletionRequest<'_>,
    ) -> Result<Completion, CompletionError> {
        FallbackOrchestrator::complete(self, request).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use atende_core::config::ProviderKind;

    use super::{CompletionError, FallbackOrchestrator};
    use crate::adapter::{CompletionRequest, ModelTier, ProviderAdapter, ProviderError};

    struct ScriptedAdapter {
        kind: ProviderKind,
        available: bool,
        fallback_model: Option<String>,
        delay: Option<Duration>,
        script: Mutex<VecDeque<Result<String, ProviderError>>>,
        invocations: Arc<Mutex<Vec<ModelTier>>>,
    }

    impl ScriptedAdapter {
        fn new(kind: ProviderKind, script: Vec<Result<String, ProviderError>>) -> Self {
            Self {
                kind,
                available: true,
                fallback_model: None,
                delay: None,
                script: Mutex::new(script.into_iter().collect()),
                invocations: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn unavailable(kind: ProviderKind) -> Self {
            let mut adapter = Self::new(kind, Vec::new());
            adapter.available = false;
            adapter
        }

        fn with_fallback_model(mut self, model: &str) -> Self {
            self.fallback_model = Some(model.to_string());
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn invocation_log(&self) -> Arc<Mutex<Vec<ModelTier>>> {
            Arc::clone(&self.invocations)
        }
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedAdapter {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn available(&self) -> bool {
            self.available
        }

        fn model(&self, tier: ModelTier) -> Option<&str> {
            match tier {
                ModelTier::Normal => Some("normal-model"),
                ModelTier::Degraded => self.fallback_model.as_deref(),
            }
        }

        async fn invoke(
            &self,
            _request: &CompletionRequest<'_>,
            tier: ModelTier,
        ) -> Result<String, ProviderError> {
            self.invocations.lock().expect("invocation log lock").push(tier);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.script
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or(Err(ProviderError::Transport("script exhausted".to_string())))
        }
    }

    fn request() -> CompletionRequest<'static> {
        CompletionRequest {
            system_prompt: "Você é uma atendente.",
            history: &[],
            user_message: "olá",
            temperature: 0.3,
            max_tokens: 256,
        }
    }

    fn orchestrator(adapters: Vec<Box<dyn ProviderAdapter>>) -> FallbackOrchestrator {
        FallbackOrchestrator::new(adapters, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn first_failure_falls_through_to_the_next_provider() {
        let orchestrator = orchestrator(vec![
            Box::new(ScriptedAdapter::new(
                ProviderKind::OpenAi,
                vec![Err(ProviderError::Http { status: 401 })],
            )),
            Box::new(ScriptedAdapter::new(
                ProviderKind::Anthropic,
                vec![Ok("olá, tudo bem?".to_string())],
            )),
        ]);

        let completion =
            orchestrator.complete(&request()).await.expect("second provider should answer");
        assert_eq!(completion.provider, ProviderKind::Anthropic);
        assert_eq!(completion.text, "olá, tudo bem?");
        assert_eq!(completion.tier, ModelTier::Normal);
    }

    #[tokio::test]
    async fn providers_without_credentials_are_never_invoked() {
        let skipped = ScriptedAdapter::unavailable(ProviderKind::OpenAi);
        let skipped_log = skipped.invocation_log();
        let orchestrator = orchestrator(vec![
            Box::new(skipped),
            Box::new(ScriptedAdapter::new(
                ProviderKind::Gemini,
                vec![Ok("resposta".to_string())],
            )),
        ]);

        let completion = orchestrator.complete(&request()).await.expect("gemini should answer");
        assert_eq!(completion.provider, ProviderKind::Gemini);
        assert!(skipped_log.lock().expect("invocation log lock").is_empty());
    }

    #[tokio::test]
    async fn rate_limit_retries_degraded_and_stays_sticky() {
        let adapter = ScriptedAdapter::new(
            ProviderKind::OpenAi,
            vec![
                Err(ProviderError::RateLimited),
                Ok("resposta degradada".to_string()),
                Ok("ainda degradada".to_string()),
            ],
        )
        .with_fallback_model("fallback-model");
        let log = adapter.invocation_log();
        let orchestrator = FallbackOrchestrator::new(
            vec![Box::new(adapter)],
            Duration::from_millis(200),
        );

        let first = orchestrator.complete(&request()).await.expect("degraded retry should answer");
        assert_eq!(first.tier, ModelTier::Degraded);
        assert_eq!(first.model, "fallback-model");

        // The flag is still set, so the next call starts degraded with no
        // extra normal-tier request.
        let second = orchestrator.complete(&request()).await.expect("sticky call should answer");
        assert_eq!(second.tier, ModelTier::Degraded);

        let invocations = log.lock().expect("invocation log lock").clone();
        assert_eq!(
            invocations,
            vec![ModelTier::Normal, ModelTier::Degraded, ModelTier::Degraded]
        );
    }

    #[tokio::test]
    async fn degraded_success_reprobes_normal_on_the_following_call() {
        let adapter = ScriptedAdapter::new(
            ProviderKind::OpenAi,
            vec![
                Err(ProviderError::RateLimited),
                Ok("degradada".to_string()),
                Ok("degradada de novo".to_string()),
                Ok("normal outra vez".to_string()),
            ],
        )
        .with_fallback_model("fallback-model");
        let orchestrator = FallbackOrchestrator::new(
            vec![Box::new(adapter)],
            Duration::from_millis(200),
        );

        // Call 1: normal 429, in-request degraded retry succeeds, flag stays.
        // Call 2: starts degraded, succeeds, flag clears.
        // Call 3: probes normal again.
        let first = orchestrator.complete(&request()).await.expect("call 1");
        let second = orchestrator.complete(&request()).await.expect("call 2");
        let third = orchestrator.complete(&request()).await.expect("call 3");

        assert_eq!(first.tier, ModelTier::Degraded);
        assert_eq!(second.tier, ModelTier::Degraded);
        assert_eq!(third.tier, ModelTier::Normal);
    }

    #[tokio::test]
    async fn rate_limit_without_fallback_model_moves_to_next_provider() {
        let rate_limited = ScriptedAdapter::new(
            ProviderKind::OpenAi,
            vec![Err(ProviderError::RateLimited)],
        );
        let orchestrator = orchestrator(vec![
            Box::new(rate_limited),
            Box::new(ScriptedAdapter::new(
                ProviderKind::Anthropic,
                vec![Ok("resposta".to_string())],
            )),
        ]);

        let completion = orchestrator.complete(&request()).await.expect("anthropic should answer");
        assert_eq!(completion.provider, ProviderKind::Anthropic);
    }

    #[tokio::test]
    async fn slow_provider_times_out_and_the_next_one_answers() {
        let slow = ScriptedAdapter::new(
            ProviderKind::OpenAi,
            vec![Ok("nunca chega".to_string())],
        )
        .with_delay(Duration::from_secs(5));
        let orchestrator = orchestrator(vec![
            Box::new(slow),
            Box::new(ScriptedAdapter::new(
                ProviderKind::Gemini,
                vec![Ok("resposta rápida".to_string())],
            )),
        ]);

        let completion = orchestrator.complete(&request()).await.expect("gemini should answer");
        assert_eq!(completion.provider, ProviderKind::Gemini);
        assert_eq!(completion.text, "resposta rápida");
    }

    #[tokio::test]
    async fn every_failure_is_reported_when_no_provider_answers() {
        let orchestrator = orchestrator(vec![
            Box::new(ScriptedAdapter::unavailable(ProviderKind::OpenAi)),
            Box::new(ScriptedAdapter::new(
                ProviderKind::Anthropic,
                vec![Err(ProviderError::Http { status: 500 })],
            )),
            Box::new(ScriptedAdapter::new(
                ProviderKind::Gemini,
                vec![Err(ProviderError::EmptyReply)],
            )),
        ]);

        let error = match orchestrator.complete(&request()).await {
            Ok(_) => panic!("no provider should answer"),
            Err(error) => error,
        };

        let CompletionError::AllProvidersUnavailable { attempts } = error;
        assert_eq!(attempts.len(), 3);
        assert_eq!(attempts[0], (ProviderKind::OpenAi, ProviderError::MissingCredential));
        assert_eq!(attempts[1], (ProviderKind::Anthropic, ProviderError::Http { status: 500 }));
        assert_eq!(attempts[2], (ProviderKind::Gemini, ProviderError::EmptyReply));
    }
}
