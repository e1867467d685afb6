use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use atende_core::config::{AppConfig, ConfigError, LoadOptions};
use atende_core::{
    DepartmentDirectory, FileKnowledge, InMemoryDirectory, KnowledgeProvider, SessionStore,
    StaticKnowledge, StatsSink, TracingStatsSink,
};
use atende_providers::{CompletionBackend, FallbackOrchestrator};

pub struct Application {
    pub config: AppConfig,
    pub store: Arc<SessionStore>,
    pub backend: Arc<dyn CompletionBackend>,
    /// Whether at least one configured provider had credentials at boot.
    pub providers_ready: bool,
    pub knowledge: Arc<dyn KnowledgeProvider>,
    pub directory: Arc<dyn DepartmentDirectory>,
    pub stats: Arc<dyn StatsSink>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    Ok(bootstrap_with_config(config))
}

pub fn bootstrap_with_config(config: AppConfig) -> Application {
    info!(
        event_name = "system.bootstrap.start",
        providers = config.ai.provider_order.len(),
        departments = config.departments.len(),
        "starting application bootstrap"
    );

    let knowledge: Arc<dyn KnowledgeProvider> = match &config.knowledge.path {
        Some(path) => {
            Arc::new(FileKnowledge::new(path.clone(), config.knowledge.fallback_prompt.clone()))
        }
        None => Arc::new(StaticKnowledge::new(config.knowledge.fallback_prompt.clone())),
    };

    let backend = Arc::new(FallbackOrchestrator::from_config(&config.ai));
    let providers_ready = backend.any_available();
    if !providers_ready {
        tracing::warn!(
            event_name = "system.bootstrap.no_provider_credentials",
            "no provider has an api key, chat turns will fall back to the unavailable reply"
        );
    }

    let directory = Arc::new(InMemoryDirectory::new(config.departments.clone()));

    Application {
        store: Arc::new(SessionStore::new()),
        backend,
        providers_ready,
        knowledge,
        directory,
        stats: Arc::new(TracingStatsSink),
        config,
    }
}
