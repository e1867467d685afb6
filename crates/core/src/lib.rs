//! Atende Core - domain model and dialogue protocol
//!
//! This crate holds everything that does not touch the network:
//! - **Configuration** (`config`) - layered file/env/override loading
//! - **Dialogue** (`dialogue`) - the onboarding state machine
//! - **Domain** (`domain`) - messages, departments, response envelopes
//! - **Sessions** (`session`) - bounded in-memory store with TTL sweeping
//! - **Collaborators** (`knowledge`, `stats`) - trait seams for the
//!   system-prompt source and the fire-and-forget event recorder
//!
//! # Design Principle
//!
//! The state machine is a pure function over an enum phase. Invalid user
//! input is never an error: it maps to a re-prompt in the same phase, so
//! every reachable transition can be asserted in a table-style test.

pub mod config;
pub mod dialogue;
pub mod domain;
pub mod errors;
pub mod knowledge;
pub mod session;
pub mod stats;
pub mod text;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, ProviderKind};
pub use dialogue::engine::{step, DialogueContext, StepAction, StepOutcome, StepReply};
pub use dialogue::input::{Answer, ParsedInput};
pub use dialogue::states::{CollectedFields, Phase};
pub use domain::department::{Department, DepartmentDirectory, InMemoryDirectory};
pub use domain::message::{Message, Role};
pub use domain::response::DialogueResponse;
pub use errors::InterfaceError;
pub use knowledge::{FileKnowledge, KnowledgeProvider, StaticKnowledge};
pub use session::{SessionState, SessionStore};
pub use stats::{
    InMemoryStatsSink, NoopStatsSink, StatsEvent, StatsKind, StatsSink, TracingStatsSink,
};
