//! Evidence pack export
//!
//! A JSON audit bundle for one session: every agent version, artifact,
//! evaluation, and directive across all lineages.

use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::schema::{Artifact, Directives, Session, SessionMode, State};

#[derive(Debug, Serialize)]
struct EvidencePack<'a> {
    session_id: &'a str,
    mode: SessionMode,
    need: &'a str,
    created_at: &'a str,
    lineages: Vec<EvidenceLineage<'a>>,
}

#[derive(Debug, Serialize)]
struct EvidenceLineage<'a> {
    name: &'a str,
    locked: bool,
    agent_versions: Vec<EvidenceAgent<'a>>,
    artifacts: &'a [Artifact],
    directives: &'a Directives,
}

#[derive(Debug, Serialize)]
struct EvidenceAgent<'a> {
    id: &'a str,
    version: u32,
    system_prompt: &'a str,
    created_at: &'a str,
}

/// Render one session's evidence pack as pretty JSON.
pub fn render_evidence(state: &State, session_id: &str) -> Result<String> {
    let target = session_id.trim();
    if target.is_empty() {
        return Err(CoreError::invalid("session id is required"));
    }

    let session = state
        .sessions
        .get(target)
        .ok_or_else(|| CoreError::SessionNotFound(target.to_string()))?;

    let mut payload = serde_json::to_string_pretty(&build_pack(session))?;
    payload.push('\n');
    Ok(payload)
}

fn build_pack(session: &Session) -> EvidencePack<'_> {
    let lineages = session
        .lineages
        .values()
        .map(|lineage| EvidenceLineage {
            name: &lineage.name,
            locked: lineage.locked,
            agent_versions: lineage
                .agents
                .iter()
                .map(|agent| EvidenceAgent {
                    id: &agent.id,
                    version: agent.version,
                    system_prompt: &agent.definition.system_prompt,
                    created_at: &agent.created_at,
                })
                .collect(),
            artifacts: &lineage.artifacts,
            directives: &lineage.directives,
        })
        .collect();

    EvidencePack {
        session_id: &session.id,
        mode: session.mode,
        need: &session.need,
        created_at: &session.created_at,
        lineages,
    }
}
