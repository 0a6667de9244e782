//! Ludus Engine - Agent lifecycle orchestration
//!
//! Everything that turns operator intent into stored state lives here:
//!
//! - **Providers** (`providers`): chat-completion clients (OpenAI-compatible
//!   and Anthropic) behind one async trait, plus the selection factory
//! - **Executor** (`executor`): local CLI subprocess execution
//! - **Cost** (`cost`): deterministic pricing tables and a cost tracker
//! - **Generator** (`generator`): initial and evolution prompt construction
//!   and agent definition generation
//! - **Engine** (`engine`): the command-level state machine - init, run,
//!   evaluate, iterate, promote, locks, and directives
//!
//! Every engine operation is one serial transaction over the state file:
//! load, compute (including any provider or subprocess I/O), save on
//! success. Failures before the save leave the document untouched.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod cost;
pub mod engine;
pub mod error;
pub mod executor;
pub mod generator;
pub mod providers;

pub use engine::{
    DirectiveKind, Engine, IterateOutcome, PromotionStrategy, QuickstartOutcome, RunOutcome,
    RunRequest, SessionSummary, TrainingInitOutcome, TrainingIterateOutcome,
};
pub use error::{EngineError, Result};
pub use providers::{
    build_provider, Completion, CompletionRequest, Provider, ProviderConfig, ProviderInfo,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
