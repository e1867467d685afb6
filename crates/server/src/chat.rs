//! The chat endpoint.
//!
//! `POST /api/chat` takes `{ "message": "...", "sessionId": "..." }` and
//! answers with one `DialogueResponse` envelope. Each turn runs the pure
//! dialogue transition first; only the `ready_ai` phase delegates free text
//! to the completion backend. The per-session lock is held across the
//! provider call, so concurrent turns for the same session serialize.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use atende_core::dialogue::replies;
use atende_core::knowledge::STYLE_RULES;
use atende_core::text::{normalize_whitespace, split_reply};
use atende_core::{
    step, DepartmentDirectory, DialogueContext, DialogueResponse, InterfaceError,
    KnowledgeProvider, Message, ParsedInput, Phase, SessionStore, StatsEvent, StatsKind,
    StatsSink, StepAction, StepReply,
};
use atende_providers::{CompletionBackend, CompletionRequest};

use crate::bootstrap::Application;

#[derive(Clone)]
pub struct ChatState {
    store: Arc<SessionStore>,
    backend: Arc<dyn CompletionBackend>,
    knowledge: Arc<dyn KnowledgeProvider>,
    directory: Arc<dyn DepartmentDirectory>,
    stats: Arc<dyn StatsSink>,
    history_cap: usize,
    temperature: f32,
    max_tokens: u32,
    reply_chunk_chars: usize,
}

impl ChatState {
    pub fn from_application(app: &Application) -> Self {
        Self {
            store: Arc::clone(&app.store),
            backend: Arc::clone(&app.backend),
            knowledge: Arc::clone(&app.knowledge),
            directory: Arc::clone(&app.directory),
            stats: Arc::clone(&app.stats),
            history_cap: app.config.session.history_cap,
            temperature: app.config.ai.temperature,
            max_tokens: app.config.ai.max_tokens,
            reply_chunk_chars: app.config.ai.reply_chunk_chars,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ChatResponse {
    Dialogue(DialogueResponse),
    Error { error: String },
}

pub fn router(state: ChatState) -> Router {
    Router::new().route("/api/chat", post(chat)).with_state(state)
}

pub async fn chat(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> (StatusCode, Json<ChatResponse>) {
    let correlation_id = Uuid::new_v4().to_string();

    let message = request.message.unwrap_or_default();
    let message = message.trim();
    if message.is_empty() {
        let error = InterfaceError::bad_request("message field missing or blank", &correlation_id);
        warn!(
            event_name = "chat.bad_request",
            correlation_id = %correlation_id,
            "rejected chat turn without a message"
        );
        return (
            StatusCode::BAD_REQUEST,
            Json(ChatResponse::Error { error: error.user_message().to_string() }),
        );
    }

    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| "anon".to_string());

    state.stats.record(StatsEvent::new(StatsKind::UserMessage, &session_id, message));

    let handle = state.store.get_or_create(&session_id);
    let mut session = handle.lock().await;

    let input = ParsedInput::parse(message);
    let departments = state.directory.list_ordered();
    let outcome = step(
        session.phase,
        &input,
        &DialogueContext { collected: &session.collected, departments: &departments },
    );

    for action in &outcome.actions {
        match action {
            StepAction::ClearSession => {
                state.store.remove(&session_id);
                state.stats.record(StatsEvent::new(StatsKind::SessionCleared, &session_id, ""));
            }
            StepAction::RecordDepartment { id, name } => {
                state.stats.record(StatsEvent::new(
                    StatsKind::DepartmentSelected,
                    &session_id,
                    format!("{id}:{name}"),
                ));
            }
            StepAction::RecordHandoff => {
                state.stats.record(StatsEvent::new(StatsKind::HandoffRequested, &session_id, ""));
            }
        }
    }

    session.phase = outcome.next_phase;
    session.collected = outcome.collected;
    session.touch();

    let response = match outcome.reply {
        StepReply::Respond(response) => response,
        StepReply::Delegate { message: user_message } => {
            delegate(&state, &mut session, &session_id, &correlation_id, &user_message).await
        }
    };

    info!(
        event_name = "chat.turn_completed",
        correlation_id = %correlation_id,
        session = %session_id,
        phase = session.phase.as_str(),
        "chat turn completed"
    );

    (StatusCode::OK, Json(ChatResponse::Dialogue(response)))
}

async fn delegate(
    state: &ChatState,
    session: &mut atende_core::SessionState,
    session_id: &str,
    correlation_id: &str,
    user_message: &str,
) -> DialogueResponse {
    let system_prompt = format!("{}{}", state.knowledge.system_prompt(), STYLE_RULES);
    let request = CompletionRequest {
        system_prompt: &system_prompt,
        history: &session.history,
        user_message,
        temperature: state.temperature,
        max_tokens: state.max_tokens,
    };

    match state.backend.complete(&request).await {
        Ok(completion) => {
            let text = normalize_whitespace(&completion.text);
            session.push_exchange(
                Message::user(user_message),
                Message::assistant(&text),
                state.history_cap,
            );
            state.stats.record(StatsEvent::new(
                StatsKind::AiReply,
                session_id,
                format!("{}:{}", completion.provider.as_str(), completion.model),
            ));

            let mut chunks = split_reply(&text, state.reply_chunk_chars);
            if chunks.len() > 1 {
                DialogueResponse::replies(chunks)
            } else {
                DialogueResponse::reply(chunks.pop().unwrap_or_default(), Phase::ReadyAi)
            }
        }
        Err(error) => {
            // The turn stays a 200: the widget renders the apology like any
            // other reply. The failed exchange never enters the history.
            warn!(
                event_name = "chat.completion_failed",
                correlation_id = %correlation_id,
                session = %session_id,
                error = %error,
                "all providers failed, serving the unavailable reply"
            );
            DialogueResponse::reply(replies::AI_UNAVAILABLE, Phase::ReadyAi)
        }
    }
}
