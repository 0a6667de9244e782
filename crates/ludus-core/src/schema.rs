//! The state document entity model
//!
//! One versioned JSON document holds every session the workbench knows about.
//! All cross-references between entities are id strings, so serializing the
//! document is the whole persistence story.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::migration::CURRENT_VERSION;

/// Current UTC time as an RFC 3339 string, the timestamp format every
/// `created_at`/`evaluated_at` field persists.
pub fn utc_now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Root JSON document stored at `.ludus-magnus/state.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub version: String,

    /// Sessions keyed by session id. An ordered map keeps listings and
    /// exports deterministic.
    #[serde(default)]
    pub sessions: BTreeMap<String, Session>,
}

impl State {
    /// An initialized, empty document at the current schema version.
    pub fn new() -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            sessions: BTreeMap::new(),
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// Operating mode of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// One lineage named `main`; fastest path to a single agent.
    Quickstart,
    /// Four lineages `A`..`D` explored in parallel.
    Training,
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionMode::Quickstart => write!(f, "quickstart"),
            SessionMode::Training => write!(f, "training"),
        }
    }
}

/// One operator workspace pursuing a single need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub mode: SessionMode,
    pub need: String,
    pub created_at: String,

    /// Always written as `"active"`; other values are carried opaquely.
    pub status: String,

    /// Lineages keyed by lineage id, or by name in legacy documents. Never
    /// resolve a lineage through its key; scan values by `name` instead.
    pub lineages: BTreeMap<String, Lineage>,
}

impl Session {
    /// Resolve a lineage by its `name`, returning the map key alongside it.
    pub fn lineage_by_name(&self, name: &str) -> Option<(&str, &Lineage)> {
        self.lineages
            .iter()
            .find(|(_, lineage)| lineage.name == name)
            .map(|(key, lineage)| (key.as_str(), lineage))
    }

    /// Mutable variant of [`Session::lineage_by_name`].
    pub fn lineage_by_name_mut(&mut self, name: &str) -> Option<&mut Lineage> {
        self.lineages
            .values_mut()
            .find(|lineage| lineage.name == name)
    }
}

/// A single evolutionary track within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lineage {
    pub id: String,
    pub session_id: String,
    pub name: String,
    pub locked: bool,

    /// Ordered by ascending version.
    pub agents: Vec<Agent>,

    /// Ordered by creation time.
    pub artifacts: Vec<Artifact>,

    pub directives: Directives,
}

impl Lineage {
    /// The agent with the highest version, if any exist.
    pub fn latest_agent(&self) -> Option<&Agent> {
        self.agents.iter().max_by_key(|agent| agent.version)
    }
}

/// One versioned agent configuration belonging to a lineage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub lineage_id: String,

    /// Strictly monotonic within a lineage, starting at 1, contiguous.
    pub version: u32,

    pub definition: AgentDefinition,
    pub created_at: String,
    pub generation_metadata: GenerationMetadata,
}

/// The prompt/model/tools payload used for execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub system_prompt: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub tools: Vec<serde_json::Value>,
}

/// Observability signals captured for the provider call that produced an
/// agent definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub duration_ms: u64,
    pub cost_usd: f64,
}

/// The output produced by running an agent on one user input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub agent_id: String,
    pub input: String,
    pub output: String,
    pub created_at: String,
    pub execution_metadata: ExecutionMetadata,

    /// Absent until scored; written at most once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
}

/// How an artifact was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Api,
    Cli,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Api => write!(f, "api"),
            ExecutionMode::Cli => write!(f, "cli"),
        }
    }
}

/// Runtime signals captured for one artifact execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    pub mode: ExecutionMode,
    pub provider: Option<String>,
    pub executor: Option<String>,

    /// Resolved absolute path of the executor binary, for `cli` mode.
    pub executor_command: Option<String>,

    pub tokens_input: u64,
    pub tokens_output: u64,
    pub duration_ms: u64,
    pub cost_usd: f64,
    pub tool_calls: Vec<ToolCall>,
}

/// A single tool invocation made by an agent during execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub input: String,
    pub output: String,
    pub duration_ms: u64,
}

/// Reviewer feedback for one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: u8,
    pub comment: String,
    pub evaluated_at: String,
}

/// Per-lineage operator instructions, split by persistence class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Directives {
    /// Consumed after the next evolution step.
    pub oneshot: Vec<Directive>,

    /// Persist until explicitly cleared.
    pub sticky: Vec<Directive>,
}

/// One operator instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directive {
    pub id: String,
    pub text: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lineage_with_versions(versions: &[u32]) -> Lineage {
        Lineage {
            id: "lin_00000001".into(),
            session_id: "ses_00000001".into(),
            name: "main".into(),
            locked: false,
            agents: versions
                .iter()
                .map(|v| Agent {
                    id: format!("agt_{:08x}", v),
                    lineage_id: "lin_00000001".into(),
                    version: *v,
                    definition: AgentDefinition {
                        system_prompt: "You are helpful.".into(),
                        model: "gpt-4o-mini".into(),
                        temperature: 1.0,
                        max_tokens: 4096,
                        tools: vec![],
                    },
                    created_at: "2026-08-01T00:00:00Z".into(),
                    generation_metadata: GenerationMetadata::default(),
                })
                .collect(),
            artifacts: vec![],
            directives: Directives::default(),
        }
    }

    #[test]
    fn test_latest_agent_picks_highest_version() {
        let lineage = lineage_with_versions(&[1, 3, 2]);
        assert_eq!(lineage.latest_agent().map(|a| a.version), Some(3));
        assert!(lineage_with_versions(&[]).latest_agent().is_none());
    }

    #[test]
    fn test_lineage_lookup_scans_by_name_not_key() {
        let mut session = Session {
            id: "ses_00000001".into(),
            mode: SessionMode::Quickstart,
            need: "customer care agent".into(),
            created_at: "2026-08-01T00:00:00Z".into(),
            status: "active".into(),
            lineages: BTreeMap::new(),
        };
        // Legacy documents key lineages by name; current ones by id.
        session
            .lineages
            .insert("some-legacy-key".into(), lineage_with_versions(&[1]));

        let (key, lineage) = session.lineage_by_name("main").expect("lineage resolves");
        assert_eq!(key, "some-legacy-key");
        assert_eq!(lineage.name, "main");
        assert!(session.lineage_by_name("A").is_none());
    }

    #[test]
    fn test_session_mode_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SessionMode::Quickstart).unwrap(),
            "\"quickstart\""
        );
        assert_eq!(
            serde_json::to_string(&ExecutionMode::Cli).unwrap(),
            "\"cli\""
        );
    }

    #[test]
    fn test_unscored_artifact_omits_evaluation_key() {
        let artifact = Artifact {
            id: "art_00000001".into(),
            agent_id: "agt_00000001".into(),
            input: "hello".into(),
            output: "ECHO: hello".into(),
            created_at: "2026-08-01T00:00:00Z".into(),
            execution_metadata: ExecutionMetadata {
                mode: ExecutionMode::Api,
                provider: Some("openai-compatible".into()),
                executor: None,
                executor_command: None,
                tokens_input: 8,
                tokens_output: 4,
                duration_ms: 120,
                cost_usd: 0.0,
                tool_calls: vec![],
            },
            evaluation: None,
        };
        let json = serde_json::to_string(&artifact).unwrap();
        assert!(!json.contains("evaluation"));
        assert!(json.contains("\"executor\":null"));
    }
}
