//! Ludus Core - State model and persistence for the ludus-magnus workbench
//!
//! This crate owns the single versioned JSON document that is the system of
//! record for sessions, lineages, agents, artifacts, evaluations, and
//! directives, plus the operations every other component consumes:
//!
//! 1. **Schema** (`schema`): the state document entity model
//! 2. **Persistence** (`persistence`): atomic load/save with crash consistency
//! 3. **Migration** (`migration`): forward-only schema version upgrades
//! 4. **Lookup** (`lookup`): global id resolution with uniqueness enforcement
//! 5. **Export** (`export`): agent definition and evidence pack rendering
//!
//! # Design Principles
//!
//! 1. **The document is the database**: everything lives in one JSON file,
//!    loaded at the start of a command and saved only on success
//! 2. **Ownership by id, not pointers**: cross-references are id strings, so
//!    the document is its own serialization
//! 3. **Crash consistency over speed**: saves go through a temp sibling file
//!    and an atomic rename

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod error;
pub mod export;
pub mod id;
pub mod lookup;
pub mod migration;
pub mod persistence;
pub mod schema;

pub use error::{CoreError, Result};
pub use id::{new_id, IdPrefix};
pub use lookup::{find_agent, find_artifact, AgentRef, ArtifactRef};
pub use migration::CURRENT_VERSION;
pub use persistence::{default_state_path, load, save};
pub use schema::{
    utc_now_rfc3339, Agent, AgentDefinition, Artifact, Directive, Directives, Evaluation,
    ExecutionMetadata, ExecutionMode, GenerationMetadata, Lineage, Session, SessionMode, State,
    ToolCall,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
