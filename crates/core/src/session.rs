//! Bounded in-memory session cache.
//!
//! Sessions are created lazily on first sight of an id and die either via
//! the clear command or the TTL sweeper. Each entry is wrapped in its own
//! async mutex: the chat layer holds that lock for the whole turn
//! (including the provider call), so two concurrent messages for one
//! session cannot interleave and lose a history update. The outer map lock
//! is synchronous and only held for lookups and sweeps.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::dialogue::states::{CollectedFields, Phase};
use crate::domain::message::Message;

#[derive(Clone, Debug)]
pub struct SessionState {
    pub phase: Phase,
    pub collected: CollectedFields,
    pub history: Vec<Message>,
    pub last_activity: DateTime<Utc>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: Phase::AwaitingIntro,
            collected: CollectedFields::default(),
            history: Vec::new(),
            last_activity: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Append a user/assistant pair and trim to `cap`, oldest first.
    pub fn push_exchange(&mut self, user: Message, assistant: Message, cap: usize) {
        self.history.push(user);
        self.history.push(assistant);
        while self.history.len() > cap {
            self.history.remove(0);
        }
    }
}

type SessionHandle = Arc<tokio::sync::Mutex<SessionState>>;

#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lazy creation: a previously-unseen id gets a fresh session in
    /// `AwaitingIntro`.
    pub fn get_or_create(&self, id: &str) -> SessionHandle {
        let mut sessions = self.inner.lock().expect("session map lock poisoned");
        sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(SessionState::new())))
            .clone()
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut sessions = self.inner.lock().expect("session map lock poisoned");
        sessions.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("session map lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict sessions idle past `idle_ttl`. Entries whose per-session lock
    /// is currently held are in-flight and skipped; they get a fresh
    /// `last_activity` when their turn finishes anyway.
    pub fn sweep(&self, idle_ttl: Duration) -> usize {
        let cutoff = Utc::now() - idle_ttl;
        let mut sessions = self.inner.lock().expect("session map lock poisoned");

        let expired: Vec<String> = sessions
            .iter()
            .filter_map(|(id, handle)| {
                let state = handle.try_lock().ok()?;
                (state.last_activity < cutoff).then(|| id.clone())
            })
            .collect();

        for id in &expired {
            sessions.remove(id);
        }
        expired.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::SessionStore;
    use crate::dialogue::states::Phase;
    use crate::domain::message::Message;

    #[tokio::test]
    async fn sessions_are_created_lazily_and_shared_by_id() {
        let store = SessionStore::new();
        assert!(store.is_empty());

        let first = store.get_or_create("visitor-1");
        first.lock().await.phase = Phase::ReadyAi;

        let again = store.get_or_create("visitor-1");
        assert_eq!(again.lock().await.phase, Phase::ReadyAi);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn history_cap_drops_oldest_entries_first() {
        let store = SessionStore::new();
        let handle = store.get_or_create("visitor-1");
        let mut session = handle.lock().await;

        for turn in 0..5 {
            session.push_exchange(
                Message::user(format!("pergunta {turn}")),
                Message::assistant(format!("resposta {turn}")),
                6,
            );
        }

        assert_eq!(session.history.len(), 6);
        assert_eq!(session.history[0].content, "pergunta 2");
        assert_eq!(session.history[5].content, "resposta 4");
    }

    #[tokio::test]
    async fn sweep_removes_only_idle_sessions() {
        let store = SessionStore::new();

        let idle = store.get_or_create("idle");
        idle.lock().await.last_activity = Utc::now() - Duration::hours(2);
        let active = store.get_or_create("active");
        active.lock().await.touch();

        let removed = store.sweep(Duration::hours(1));
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);

        // The surviving entry is the active one.
        let survivor = store.get_or_create("active");
        assert!(survivor.lock().await.last_activity > Utc::now() - Duration::minutes(5));
    }

    #[tokio::test]
    async fn sweep_skips_sessions_with_a_turn_in_flight() {
        let store = SessionStore::new();
        let busy = store.get_or_create("busy");
        let mut guard = busy.lock().await;
        guard.last_activity = Utc::now() - Duration::hours(2);

        assert_eq!(store.sweep(Duration::hours(1)), 0);
        assert_eq!(store.len(), 1);

        guard.touch();
        drop(guard);
        assert_eq!(store.sweep(Duration::hours(1)), 0);
    }

    #[tokio::test]
    async fn remove_reports_whether_a_session_existed() {
        let store = SessionStore::new();
        store.get_or_create("visitor-1");
        assert!(store.remove("visitor-1"));
        assert!(!store.remove("visitor-1"));
    }
}
