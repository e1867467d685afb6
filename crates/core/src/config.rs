use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::department::Department;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ai: AiConfig,
    pub session: SessionConfig,
    pub knowledge: KnowledgeConfig,
    pub departments: Vec<Department>,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct AiConfig {
    pub provider_order: Vec<ProviderKind>,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
    pub reply_chunk_chars: usize,
    pub openai: ProviderSettings,
    pub anthropic: ProviderSettings,
    pub gemini: ProviderSettings,
}

#[derive(Clone, Debug)]
pub struct ProviderSettings {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub fallback_model: Option<String>,
    pub base_url: Option<String>,
}

impl AiConfig {
    pub fn settings(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Gemini => &self.gemini,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub history_cap: usize,
    pub idle_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct KnowledgeConfig {
    pub path: Option<PathBuf>,
    pub fallback_prompt: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub provider_order: Option<Vec<ProviderKind>>,
    pub knowledge_path: Option<PathBuf>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 3000 },
            ai: AiConfig {
                provider_order: vec![
                    ProviderKind::OpenAi,
                    ProviderKind::Anthropic,
                    ProviderKind::Gemini,
                ],
                timeout_secs: 20,
                temperature: 0.3,
                max_tokens: 1024,
                reply_chunk_chars: 600,
                openai: ProviderSettings {
                    api_key: None,
                    model: "gpt-4o-mini".to_string(),
                    fallback_model: None,
                    base_url: None,
                },
                anthropic: ProviderSettings {
                    api_key: None,
                    model: "claude-3-5-haiku-latest".to_string(),
                    fallback_model: None,
                    base_url: None,
                },
                gemini: ProviderSettings {
                    api_key: None,
                    model: "gemini-1.5-flash".to_string(),
                    fallback_model: None,
                    base_url: None,
                },
            },
            session: SessionConfig {
                history_cap: 20,
                idle_ttl_secs: 3600,
                sweep_interval_secs: 60,
            },
            knowledge: KnowledgeConfig {
                path: None,
                fallback_prompt: "Você é uma assistente virtual de atendimento. Responda em \
                                  português do Brasil, de forma curta e cordial."
                    .to_string(),
            },
            departments: Vec::new(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "gemini" => Ok(Self::Gemini),
            other => Err(ConfigError::Validation(format!(
                "unsupported ai provider `{other}` (expected openai|anthropic|gemini)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

fn parse_provider_list(key: &str, value: &str) -> Result<Vec<ProviderKind>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("atende.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(ai) = patch.ai {
            if let Some(provider_order) = ai.provider_order {
                self.ai.provider_order = provider_order;
            }
            if let Some(timeout_secs) = ai.timeout_secs {
                self.ai.timeout_secs = timeout_secs;
            }
            if let Some(temperature) = ai.temperature {
                self.ai.temperature = temperature;
            }
            if let Some(max_tokens) = ai.max_tokens {
                self.ai.max_tokens = max_tokens;
            }
            if let Some(reply_chunk_chars) = ai.reply_chunk_chars {
                self.ai.reply_chunk_chars = reply_chunk_chars;
            }
            if let Some(openai) = ai.openai {
                apply_provider_patch(&mut self.ai.openai, openai);
            }
            if let Some(anthropic) = ai.anthropic {
                apply_provider_patch(&mut self.ai.anthropic, anthropic);
            }
            if let Some(gemini) = ai.gemini {
                apply_provider_patch(&mut self.ai.gemini, gemini);
            }
        }

        if let Some(session) = patch.session {
            if let Some(history_cap) = session.history_cap {
                self.session.history_cap = history_cap;
            }
            if let Some(idle_ttl_secs) = session.idle_ttl_secs {
                self.session.idle_ttl_secs = idle_ttl_secs;
            }
            if let Some(sweep_interval_secs) = session.sweep_interval_secs {
                self.session.sweep_interval_secs = sweep_interval_secs;
            }
        }

        if let Some(knowledge) = patch.knowledge {
            if let Some(path) = knowledge.path {
                self.knowledge.path = Some(path);
            }
            if let Some(fallback_prompt) = knowledge.fallback_prompt {
                self.knowledge.fallback_prompt = fallback_prompt;
            }
        }

        if let Some(departments) = patch.departments {
            self.departments = departments;
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ATENDE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ATENDE_SERVER_PORT") {
            self.server.port = parse_u16("ATENDE_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("ATENDE_AI_PROVIDERS") {
            self.ai.provider_order = parse_provider_list("ATENDE_AI_PROVIDERS", &value)?;
        }
        if let Some(value) = read_env("ATENDE_AI_TIMEOUT_SECS") {
            self.ai.timeout_secs = parse_u64("ATENDE_AI_TIMEOUT_SECS", &value)?;
        }

        apply_provider_env(&mut self.ai.openai, "OPENAI");
        apply_provider_env(&mut self.ai.anthropic, "ANTHROPIC");
        apply_provider_env(&mut self.ai.gemini, "GEMINI");

        if let Some(value) = read_env("ATENDE_SESSION_HISTORY_CAP") {
            self.session.history_cap =
                parse_u64("ATENDE_SESSION_HISTORY_CAP", &value)? as usize;
        }
        if let Some(value) = read_env("ATENDE_SESSION_IDLE_TTL_SECS") {
            self.session.idle_ttl_secs = parse_u64("ATENDE_SESSION_IDLE_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("ATENDE_SESSION_SWEEP_INTERVAL_SECS") {
            self.session.sweep_interval_secs =
                parse_u64("ATENDE_SESSION_SWEEP_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = read_env("ATENDE_KNOWLEDGE_PATH") {
            self.knowledge.path = Some(PathBuf::from(value));
        }

        let log_level = read_env("ATENDE_LOGGING_LEVEL").or_else(|| read_env("ATENDE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ATENDE_LOGGING_FORMAT").or_else(|| read_env("ATENDE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(provider_order) = overrides.provider_order {
            self.ai.provider_order = provider_order;
        }
        if let Some(knowledge_path) = overrides.knowledge_path {
            self.knowledge.path = Some(knowledge_path);
        }
        if let Some(openai_api_key) = overrides.openai_api_key {
            self.ai.openai.api_key = Some(secret_value(openai_api_key));
        }
        if let Some(anthropic_api_key) = overrides.anthropic_api_key {
            self.ai.anthropic.api_key = Some(secret_value(anthropic_api_key));
        }
        if let Some(gemini_api_key) = overrides.gemini_api_key {
            self.ai.gemini.api_key = Some(secret_value(gemini_api_key));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_ai(&self.ai)?;
        validate_session(&self.session)?;
        validate_departments(&self.departments)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn apply_provider_patch(settings: &mut ProviderSettings, patch: ProviderPatch) {
    if let Some(api_key_value) = patch.api_key {
        settings.api_key = Some(secret_value(api_key_value));
    }
    if let Some(model) = patch.model {
        settings.model = model;
    }
    if let Some(fallback_model) = patch.fallback_model {
        settings.fallback_model = Some(fallback_model);
    }
    if let Some(base_url) = patch.base_url {
        settings.base_url = Some(base_url);
    }
}

fn apply_provider_env(settings: &mut ProviderSettings, name: &str) {
    if let Some(value) = read_env(&format!("ATENDE_{name}_API_KEY")) {
        settings.api_key = Some(secret_value(value));
    }
    if let Some(value) = read_env(&format!("ATENDE_{name}_MODEL")) {
        settings.model = value;
    }
    if let Some(value) = read_env(&format!("ATENDE_{name}_FALLBACK_MODEL")) {
        settings.fallback_model = Some(value);
    }
    if let Some(value) = read_env(&format!("ATENDE_{name}_BASE_URL")) {
        settings.base_url = Some(value);
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("atende.toml"), PathBuf::from("config/atende.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation(
            "server.port must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_ai(ai: &AiConfig) -> Result<(), ConfigError> {
    if ai.provider_order.is_empty() {
        return Err(ConfigError::Validation(
            "ai.provider_order must list at least one provider".to_string(),
        ));
    }

    let mut seen = Vec::new();
    for kind in &ai.provider_order {
        if seen.contains(kind) {
            return Err(ConfigError::Validation(format!(
                "ai.provider_order lists `{}` more than once",
                kind.as_str()
            )));
        }
        seen.push(*kind);
    }

    if ai.timeout_secs == 0 || ai.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "ai.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&ai.temperature) {
        return Err(ConfigError::Validation(
            "ai.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if ai.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "ai.max_tokens must be greater than zero".to_string(),
        ));
    }

    if ai.reply_chunk_chars < 80 {
        return Err(ConfigError::Validation(
            "ai.reply_chunk_chars must be at least 80".to_string(),
        ));
    }

    for kind in &ai.provider_order {
        let settings = ai.settings(*kind);
        if settings.model.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "ai.{}.model must not be empty",
                kind.as_str()
            )));
        }
        if let Some(key) = &settings.api_key {
            if key.expose_secret().trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "ai.{}.api_key is set but blank. Unset it or provide a real key",
                    kind.as_str()
                )));
            }
        }
    }

    Ok(())
}

fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if session.history_cap < 2 || session.history_cap % 2 != 0 {
        return Err(ConfigError::Validation(
            "session.history_cap must be an even number of at least 2 (user/assistant pairs)"
                .to_string(),
        ));
    }

    if session.idle_ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "session.idle_ttl_secs must be greater than zero".to_string(),
        ));
    }

    if session.sweep_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "session.sweep_interval_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_departments(departments: &[Department]) -> Result<(), ConfigError> {
    let mut seen_ids = Vec::new();
    for department in departments {
        if seen_ids.contains(&department.id) {
            return Err(ConfigError::Validation(format!(
                "departments contains duplicated id `{}`",
                department.id
            )));
        }
        seen_ids.push(department.id);

        if department.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "department `{}` has an empty name",
                department.id
            )));
        }

        if !department.phone.chars().any(|ch| ch.is_ascii_digit()) {
            return Err(ConfigError::Validation(format!(
                "department `{}` phone `{}` has no digits",
                department.id, department.phone
            )));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    ai: Option<AiPatch>,
    session: Option<SessionPatch>,
    knowledge: Option<KnowledgePatch>,
    departments: Option<Vec<Department>>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct AiPatch {
    provider_order: Option<Vec<ProviderKind>>,
    timeout_secs: Option<u64>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    reply_chunk_chars: Option<usize>,
    openai: Option<ProviderPatch>,
    anthropic: Option<ProviderPatch>,
    gemini: Option<ProviderPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderPatch {
    api_key: Option<String>,
    model: Option<String>,
    fallback_model: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    history_cap: Option<usize>,
    idle_ttl_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct KnowledgePatch {
    path: Option<PathBuf>,
    fallback_prompt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, ProviderKind};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid_on_their_own() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.ai.timeout_secs == 20, "default provider timeout should be 20s")?;
        ensure(config.session.history_cap == 20, "default history cap should be 20")?;
        ensure(
            config.ai.provider_order
                == vec![ProviderKind::OpenAi, ProviderKind::Anthropic, ProviderKind::Gemini],
            "default provider order should be openai, anthropic, gemini",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_ATENDE_OPENAI_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("atende.toml");
            fs::write(
                &path,
                r#"
[ai.openai]
api_key = "${TEST_ATENDE_OPENAI_KEY}"

[[departments]]
id = 1
name = "Financeiro"
phone = "(11) 98888-0001"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let api_key = config
                .ai
                .openai
                .api_key
                .as_ref()
                .ok_or_else(|| "openai api key should be set".to_string())?;
            ensure(
                api_key.expose_secret() == "sk-from-env",
                "api key should be interpolated from environment",
            )?;
            ensure(config.departments.len() == 1, "department list should come from the file")?;
            ensure(
                config.departments[0].emoji == "📞",
                "department emoji should default when omitted",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_ATENDE_OPENAI_KEY"]);
        result
    }

    #[test]
    fn env_provider_list_overrides_the_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ATENDE_AI_PROVIDERS", "gemini, openai");
        env::set_var("ATENDE_AI_TIMEOUT_SECS", "5");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("atende.toml");
            fs::write(
                &path,
                r#"
[ai]
provider_order = ["anthropic"]
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.ai.provider_order == vec![ProviderKind::Gemini, ProviderKind::OpenAi],
                "env provider list should win over the file",
            )?;
            ensure(config.ai.timeout_secs == 5, "env timeout should win over the default")?;
            Ok(())
        })();

        clear_vars(&["ATENDE_AI_PROVIDERS", "ATENDE_AI_TIMEOUT_SECS"]);
        result
    }

    #[test]
    fn programmatic_overrides_win_over_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ATENDE_LOG_LEVEL", "warn");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions {
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    provider_order: Some(vec![ProviderKind::Anthropic]),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "debug", "override log level should win over env")?;
            ensure(
                config.ai.provider_order == vec![ProviderKind::Anthropic],
                "override provider order should win",
            )?;
            Ok(())
        })();

        clear_vars(&["ATENDE_LOG_LEVEL"]);
        result
    }

    #[test]
    fn odd_history_cap_fails_validation_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ATENDE_SESSION_HISTORY_CAP", "7");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("session.history_cap")
            );
            ensure(has_message, "validation failure should mention session.history_cap")
        })();

        clear_vars(&["ATENDE_SESSION_HISTORY_CAP"]);
        result
    }

    #[test]
    fn duplicated_provider_order_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ATENDE_AI_PROVIDERS", "openai,openai");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("more than once")
            );
            ensure(has_message, "validation failure should flag the duplicated provider")
        })();

        clear_vars(&["ATENDE_AI_PROVIDERS"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ATENDE_OPENAI_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain the key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["ATENDE_OPENAI_API_KEY"]);
        result
    }
}
