//! Model providers - completion adapters and fallback orchestration
//!
//! This crate turns one logical "generate a reply" call into requests against
//! whichever hosted model is configured and reachable:
//! - Adapters translate a provider-agnostic `CompletionRequest` into each
//!   vendor's wire format (OpenAI, Anthropic, Gemini)
//! - The `FallbackOrchestrator` walks the configured provider order and
//!   returns the first usable reply, with a per-attempt timeout
//! - Rate limits flip a sticky per-provider hint that routes the next calls
//!   to a cheaper degraded model until a degraded call confirms recovery
//!
//! # Key Types
//!
//! - `ProviderAdapter` - Pluggable trait for vendor integrations
//! - `FallbackOrchestrator` - Ordered multi-provider completion
//! - `CompletionBackend` - Seam the HTTP handlers depend on

pub mod adapter;
pub mod anthropic;
pub mod backend;
pub mod gemini;
pub mod openai;
pub mod orchestrator;

pub use adapter::{CompletionRequest, ModelTier, ProviderAdapter, ProviderError};
pub use anthropic::AnthropicAdapter;
pub use backend::CompletionBackend;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;
pub use orchestrator::{Completion, CompletionError, FallbackOrchestrator};
