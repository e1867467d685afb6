use async_trait::async_trait;

use crate::adapter::CompletionRequest;
use crate::orchestrator::{Completion, CompletionError};

/// Seam between the HTTP layer and the provider stack. Handlers talk to
/// this trait so tests can script completions without network access.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest<'_>,
    ) -> Result<Completion, CompletionError>;
}
