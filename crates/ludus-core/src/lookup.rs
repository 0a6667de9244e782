//! Global id resolution over a loaded state document
//!
//! Artifact and agent ids are globally unique by contract, but the document
//! cannot structurally prevent duplicates (sessions can be merged or edited
//! by hand). Lookups therefore scan the whole document, collect every match,
//! and refuse to answer when an id resolves to more than one entity.

use crate::error::{CoreError, Result};
use crate::schema::{Agent, Artifact, Lineage, Session, State};

/// A resolved artifact together with its owning session and lineage.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactRef<'a> {
    pub session: &'a Session,
    pub lineage: &'a Lineage,
    pub artifact: &'a Artifact,
}

/// A resolved agent together with its owning session and lineage.
#[derive(Debug, Clone, Copy)]
pub struct AgentRef<'a> {
    pub session: &'a Session,
    pub lineage: &'a Lineage,
    pub agent: &'a Agent,
}

/// Document coordinates of an artifact, for callers that need to mutate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    pub session_key: String,
    pub lineage_key: String,
    pub index: usize,
}

/// Find one artifact by globally unique id.
pub fn find_artifact<'a>(state: &'a State, artifact_id: &str) -> Result<ArtifactRef<'a>> {
    find_artifact_in(state, artifact_id, None)
}

/// Find one artifact by id, optionally narrowed to a single session.
pub fn find_artifact_in<'a>(
    state: &'a State,
    artifact_id: &str,
    session_id: Option<&str>,
) -> Result<ArtifactRef<'a>> {
    let location = locate_artifact(state, artifact_id, session_id)?;
    let session = &state.sessions[&location.session_key];
    let lineage = &session.lineages[&location.lineage_key];
    Ok(ArtifactRef {
        session,
        lineage,
        artifact: &lineage.artifacts[location.index],
    })
}

/// Find an artifact's document coordinates, enforcing global uniqueness.
pub fn locate_artifact(
    state: &State,
    artifact_id: &str,
    session_id: Option<&str>,
) -> Result<ArtifactLocation> {
    let target = artifact_id.trim();
    if target.is_empty() {
        return Err(CoreError::invalid("artifact id is required"));
    }

    let mut found: Option<ArtifactLocation> = None;
    for (session_key, session) in &state.sessions {
        if session_id.is_some_and(|narrow| narrow != session_key) {
            continue;
        }
        for (lineage_key, lineage) in &session.lineages {
            for (index, artifact) in lineage.artifacts.iter().enumerate() {
                if artifact.id != target {
                    continue;
                }
                if found.is_some() {
                    return Err(CoreError::NotUnique {
                        kind: "artifact",
                        id: target.to_string(),
                    });
                }
                found = Some(ArtifactLocation {
                    session_key: session_key.clone(),
                    lineage_key: lineage_key.clone(),
                    index,
                });
            }
        }
    }

    found.ok_or_else(|| CoreError::ArtifactNotFound(target.to_string()))
}

/// Find one agent by globally unique id.
pub fn find_agent<'a>(state: &'a State, agent_id: &str) -> Result<AgentRef<'a>> {
    let target = agent_id.trim();
    if target.is_empty() {
        return Err(CoreError::invalid("agent id is required"));
    }

    let mut found: Option<AgentRef<'a>> = None;
    for session in state.sessions.values() {
        for lineage in session.lineages.values() {
            for agent in &lineage.agents {
                if agent.id != target {
                    continue;
                }
                if found.is_some() {
                    return Err(CoreError::NotUnique {
                        kind: "agent",
                        id: target.to_string(),
                    });
                }
                found = Some(AgentRef {
                    session,
                    lineage,
                    agent,
                });
            }
        }
    }

    found.ok_or_else(|| CoreError::AgentNotFound(target.to_string()))
}

/// Whether any artifact in the document carries this id.
pub fn artifact_id_exists(state: &State, artifact_id: &str) -> bool {
    state.sessions.values().any(|session| {
        session.lineages.values().any(|lineage| {
            lineage
                .artifacts
                .iter()
                .any(|artifact| artifact.id == artifact_id)
        })
    })
}
