//! System-prompt source for the AI path. The orchestration layer treats the
//! knowledge text as an opaque string read on every AI-bound request, so
//! operators can edit the file without restarting the process.

use std::path::PathBuf;

use tracing::warn;

/// Style instructions appended to whatever the knowledge source returns.
/// They keep replies short and steer sensitive topics to the human path.
pub const STYLE_RULES: &str = "\n\nRegras de estilo:\n\
    - Responda em PT-BR.\n\
    - Seja objetiva e clara, no máximo 2-3 frases.\n\
    - Use bullets quando listar itens.\n\
    - Para preço, estoque ou logística sensível, convide a falar com um atendente (/atendente).";

pub trait KnowledgeProvider: Send + Sync {
    fn system_prompt(&self) -> String;
}

#[derive(Clone, Debug)]
pub struct StaticKnowledge {
    prompt: String,
}

impl StaticKnowledge {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into() }
    }
}

impl KnowledgeProvider for StaticKnowledge {
    fn system_prompt(&self) -> String {
        self.prompt.clone()
    }
}

/// Reads the knowledge file on every call. A missing or unreadable file is
/// not an error for the chat turn: it logs a warning and falls back to the
/// configured default persona text.
#[derive(Clone, Debug)]
pub struct FileKnowledge {
    path: PathBuf,
    fallback: String,
}

impl FileKnowledge {
    pub fn new(path: impl Into<PathBuf>, fallback: impl Into<String>) -> Self {
        Self { path: path.into(), fallback: fallback.into() }
    }
}

impl KnowledgeProvider for FileKnowledge {
    fn system_prompt(&self) -> String {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if !content.trim().is_empty() => content,
            Ok(_) => self.fallback.clone(),
            Err(error) => {
                warn!(
                    event_name = "knowledge.read_failed",
                    path = %self.path.display(),
                    error = %error,
                    "knowledge file unreadable, using fallback prompt"
                );
                self.fallback.clone()
            }
        }
    }
}
