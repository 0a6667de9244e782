//! The agent lifecycle engine
//!
//! Every public method is one full command transaction: load the state
//! document, compute (calling the provider or an executor where the
//! operation needs one), and save only when everything succeeded. Provider
//! and subprocess calls are treated as pure reads; a failure before the save
//! leaves the document exactly as it was.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use ludus_core::{
    default_state_path, load, lookup, new_id, save, utc_now_rfc3339, Agent, Artifact, CoreError,
    Directive, Directives, ExecutionMetadata, ExecutionMode, IdPrefix, Lineage, Session,
    SessionMode, State,
};

use crate::cost::{self, CostEvent, CostTracker};
use crate::error::{EngineError, Result};
use crate::executor;
use crate::generator::{self, GeneratedAgent};
use crate::providers::{build_provider, CompletionRequest, Provider, ProviderConfig};

/// Training lineage names with their generation hints, in stable order.
const TRAINING_VARIANTS: &[(&str, &str)] = &[
    ("A", "conservative approach, prioritize safety"),
    (
        "B",
        "balanced approach, equal priority to effectiveness and safety",
    ),
    ("C", "creative approach, prioritize novel solutions"),
    ("D", "aggressive approach, prioritize speed and efficiency"),
];

/// Hints for `promote --strategy alternatives`: each lineage explores a
/// fundamentally different methodology instead of a temperament variation.
const ALTERNATIVE_VARIANTS: &[(&str, &str)] = &[
    (
        "A",
        "fundamentally different methodology: deterministic rule-based workflow",
    ),
    (
        "B",
        "fundamentally different methodology: retrieval-first evidence-driven workflow",
    ),
    (
        "C",
        "fundamentally different methodology: planning-first decomposition workflow",
    ),
    (
        "D",
        "fundamentally different methodology: critique-and-revise self-review workflow",
    ),
];

const UNIQUE_ID_ATTEMPTS: usize = 256;

/// How a quickstart session is converted into a training session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromotionStrategy {
    #[default]
    Variations,
    Alternatives,
}

impl PromotionStrategy {
    fn variants(self) -> &'static [(&'static str, &'static str)] {
        match self {
            PromotionStrategy::Variations => TRAINING_VARIANTS,
            PromotionStrategy::Alternatives => ALTERNATIVE_VARIANTS,
        }
    }
}

impl FromStr for PromotionStrategy {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim() {
            "" | "variations" => Ok(PromotionStrategy::Variations),
            "alternatives" => Ok(PromotionStrategy::Alternatives),
            other => Err(EngineError::invalid(format!(
                "invalid --strategy \"{}\" (expected variations or alternatives)",
                other
            ))),
        }
    }
}

/// Persistence class of a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Oneshot,
    Sticky,
}

impl DirectiveKind {
    /// Map the `--oneshot`/`--sticky` flag pair onto a kind. Exactly one of
    /// the two must be set.
    pub fn from_flags(oneshot: bool, sticky: bool) -> Result<Self> {
        match (oneshot, sticky) {
            (true, false) => Ok(DirectiveKind::Oneshot),
            (false, true) => Ok(DirectiveKind::Sticky),
            (false, false) => Err(EngineError::invalid("must specify --oneshot or --sticky")),
            (true, true) => Err(EngineError::invalid(
                "must specify exactly one of --oneshot or --sticky",
            )),
        }
    }
}

/// Result of `quickstart init`.
#[derive(Debug, Clone)]
pub struct QuickstartOutcome {
    pub session_id: String,
    pub lineage_id: String,
}

/// Result of `training init`: lineage ids in `A,B,C,D` order.
#[derive(Debug, Clone)]
pub struct TrainingInitOutcome {
    pub session_id: String,
    pub lineage_ids: Vec<(String, String)>,
}

/// One execution request against a session's lineage.
#[derive(Debug)]
pub struct RunRequest<'a> {
    pub session_id: &'a str,
    pub lineage: Option<&'a str>,
    pub input: &'a str,
    pub mode: ExecutionMode,
    pub provider: Option<&'a dyn Provider>,
    pub executor: Option<&'a str>,
}

/// Result of `run`.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub artifact_id: String,
}

/// Result of `iterate` on one lineage.
#[derive(Debug, Clone)]
pub struct IterateOutcome {
    pub agent_id: String,
    pub version: u32,
}

/// Result of `training iterate` across all lineages.
#[derive(Debug, Clone)]
pub struct TrainingIterateOutcome {
    pub regenerated: Vec<String>,
    pub locked: Vec<String>,
}

impl TrainingIterateOutcome {
    /// The one-line report printed after a training iteration.
    pub fn summary(&self) -> String {
        format!(
            "Regenerated {} lineages: {}. Locked: {}.",
            self.regenerated.len(),
            join_or_none(&self.regenerated),
            join_or_none(&self.locked),
        )
    }
}

fn join_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

/// One row of `session list`.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: String,
    pub mode: SessionMode,
    pub status: String,
    pub created_at: String,
}

/// One row of `artifact list`.
#[derive(Debug, Clone)]
pub struct ArtifactRow {
    pub id: String,
    pub agent_version: u32,
    pub score: Option<u8>,
    pub created_at: String,
}

/// Command-level orchestrator over one state file.
#[derive(Debug, Clone)]
pub struct Engine {
    state_path: PathBuf,
}

impl Engine {
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
        }
    }

    /// An engine over `./.ludus-magnus/state.json`.
    pub fn with_default_path() -> Self {
        Self::new(default_state_path())
    }

    pub fn state_path(&self) -> &PathBuf {
        &self.state_path
    }

    fn load(&self) -> Result<State> {
        Ok(load(&self.state_path)?)
    }

    fn save(&self, state: &State) -> Result<()> {
        Ok(save(&self.state_path, state)?)
    }

    /// Create an empty session in the given mode.
    pub fn create_session(&self, mode: SessionMode, need: &str) -> Result<String> {
        let need = need.trim();
        if need.is_empty() {
            return Err(EngineError::invalid("need cannot be empty"));
        }

        let mut state = self.load()?;
        let session_id = new_id(IdPrefix::Session);
        state.sessions.insert(
            session_id.clone(),
            Session {
                id: session_id.clone(),
                mode,
                need: need.to_string(),
                created_at: utc_now_rfc3339(),
                status: "active".to_string(),
                lineages: BTreeMap::new(),
            },
        );
        self.save(&state)?;

        tracing::info!(session_id = %session_id, %mode, "session created");
        Ok(session_id)
    }

    /// Summaries of every session, in id order.
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let state = self.load()?;
        Ok(state
            .sessions
            .values()
            .map(|session| SessionSummary {
                id: session.id.clone(),
                mode: session.mode,
                status: session.status.clone(),
                created_at: session.created_at.clone(),
            })
            .collect())
    }

    /// The full session entity, for inspection.
    pub fn inspect_session(&self, session_id: &str) -> Result<Session> {
        let state = self.load()?;
        state
            .sessions
            .get(session_id.trim())
            .cloned()
            .ok_or_else(|| CoreError::SessionNotFound(session_id.trim().to_string()).into())
    }

    /// Initialize a quickstart session: one lineage `main` with a freshly
    /// generated agent at version 1.
    pub async fn quickstart_init(
        &self,
        provider: &dyn Provider,
        need: &str,
    ) -> Result<QuickstartOutcome> {
        let mut state = self.load()?;
        let tracker = CostTracker::new();

        let generated = generator::generate_initial(provider, need, None).await?;
        record_generation(&tracker, &generated);

        let session_id = new_id(IdPrefix::Session);
        let lineage_id = new_id(IdPrefix::Lineage);
        let now = utc_now_rfc3339();

        let lineage = new_lineage(&session_id, lineage_id.clone(), "main", generated, &now);
        let mut lineages = BTreeMap::new();
        lineages.insert(lineage_id.clone(), lineage);

        state.sessions.insert(
            session_id.clone(),
            Session {
                id: session_id.clone(),
                mode: SessionMode::Quickstart,
                need: need.trim().to_string(),
                created_at: now,
                status: "active".to_string(),
                lineages,
            },
        );
        self.save(&state)?;

        tracing::info!(
            session_id = %session_id,
            lineage_id = %lineage_id,
            cost_usd = tracker.total_cost(),
            "quickstart session initialized"
        );
        Ok(QuickstartOutcome {
            session_id,
            lineage_id,
        })
    }

    /// Initialize a training session: four lineages `A,B,C,D`, each seeded
    /// with an agent generated under that lineage's variant hint.
    pub async fn training_init(
        &self,
        provider: &dyn Provider,
        need: &str,
    ) -> Result<TrainingInitOutcome> {
        let mut state = self.load()?;
        let tracker = CostTracker::new();

        let session_id = new_id(IdPrefix::Session);
        let now = utc_now_rfc3339();
        let mut lineages = BTreeMap::new();
        let mut lineage_ids = Vec::with_capacity(TRAINING_VARIANTS.len());

        for &(name, hint) in TRAINING_VARIANTS {
            let generated = generator::generate_initial(provider, need, Some(hint)).await?;
            record_generation(&tracker, &generated);

            let lineage_id = new_id(IdPrefix::Lineage);
            let lineage = new_lineage(&session_id, lineage_id.clone(), name, generated, &now);
            lineages.insert(lineage_id.clone(), lineage);
            lineage_ids.push((name.to_string(), lineage_id));
        }

        state.sessions.insert(
            session_id.clone(),
            Session {
                id: session_id.clone(),
                mode: SessionMode::Training,
                need: need.trim().to_string(),
                created_at: now,
                status: "active".to_string(),
                lineages,
            },
        );
        self.save(&state)?;

        tracing::info!(
            session_id = %session_id,
            lineages = TRAINING_VARIANTS.len(),
            cost_usd = tracker.total_cost(),
            "training session initialized"
        );
        Ok(TrainingInitOutcome {
            session_id,
            lineage_ids,
        })
    }

    /// Run the lineage's latest agent against one input and store the
    /// resulting artifact.
    pub async fn run(&self, request: RunRequest<'_>) -> Result<RunOutcome> {
        let mut state = self.load()?;
        let session_id = request.session_id.trim();
        let session = state
            .sessions
            .get(session_id)
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;

        let lineage_name = resolve_lineage_name(session, request.lineage)?;
        let (_, lineage) = session
            .lineage_by_name(&lineage_name)
            .ok_or_else(|| CoreError::LineageNotFound(lineage_name.clone()))?;
        let agent = lineage
            .latest_agent()
            .cloned()
            .ok_or_else(|| no_agents(&lineage_name))?;

        let (output, metadata) = match request.mode {
            ExecutionMode::Api => {
                let provider = request
                    .provider
                    .ok_or_else(|| EngineError::invalid("provider is required for api mode"))?;
                execute_api(provider, &agent, request.input).await?
            }
            ExecutionMode::Cli => {
                let executor_name = request.executor.unwrap_or_default();
                execute_cli(executor_name, &agent, request.input).await?
            }
        };

        tracing::info!(
            mode = %metadata.mode,
            duration_ms = metadata.duration_ms,
            cost_usd = metadata.cost_usd,
            "execution complete"
        );

        let artifact_id = unique_artifact_id(&state)?;
        let artifact = Artifact {
            id: artifact_id.clone(),
            agent_id: agent.id.clone(),
            input: request.input.to_string(),
            output,
            created_at: utc_now_rfc3339(),
            execution_metadata: metadata,
            evaluation: None,
        };

        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;
        let lineage = session
            .lineage_by_name_mut(&lineage_name)
            .ok_or_else(|| CoreError::LineageNotFound(lineage_name.clone()))?;
        lineage.artifacts.push(artifact);

        self.save(&state)?;
        Ok(RunOutcome { artifact_id })
    }

    /// Score one artifact. Scores are written at most once.
    pub fn evaluate(&self, artifact_id: &str, score: i64, comment: &str) -> Result<(String, u8)> {
        if !(1..=10).contains(&score) {
            return Err(CoreError::ScoreOutOfRange.into());
        }
        let score = score as u8;

        let mut state = self.load()?;
        let location = lookup::locate_artifact(&state, artifact_id, None)?;

        let artifact = state
            .sessions
            .get_mut(&location.session_key)
            .and_then(|session| session.lineages.get_mut(&location.lineage_key))
            .and_then(|lineage| lineage.artifacts.get_mut(location.index))
            .ok_or_else(|| CoreError::ArtifactNotFound(artifact_id.trim().to_string()))?;

        if artifact.evaluation.is_some() {
            return Err(CoreError::AlreadyEvaluated.into());
        }

        let id = artifact.id.clone();
        artifact.evaluation = Some(ludus_core::Evaluation {
            score,
            comment: comment.trim().to_string(),
            evaluated_at: utc_now_rfc3339(),
        });

        self.save(&state)?;
        tracing::info!(artifact_id = %id, score, "artifact evaluated");
        Ok((id, score))
    }

    /// Generate the next agent version for one lineage from its evaluated
    /// artifacts and directives. Oneshot directives are consumed.
    pub async fn iterate(
        &self,
        provider: &dyn Provider,
        session_id: &str,
        lineage: Option<&str>,
    ) -> Result<IterateOutcome> {
        let mut state = self.load()?;
        let session_id = session_id.trim();
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;

        let lineage_name = match lineage.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => name.to_string(),
            None if session.mode == SessionMode::Quickstart => "main".to_string(),
            None => {
                return Err(EngineError::invalid(
                    "--lineage is required for non-quickstart sessions",
                ))
            }
        };

        let tracker = CostTracker::new();
        let lineage = session
            .lineage_by_name_mut(&lineage_name)
            .ok_or_else(|| CoreError::LineageNotFound(lineage_name.clone()))?;
        if lineage.locked {
            return Err(EngineError::invalid(format!(
                "lineage \"{}\" is locked",
                lineage_name
            )));
        }

        let outcome = evolve_lineage(provider, lineage, &tracker).await?;
        self.save(&state)?;

        tracing::info!(
            lineage = %lineage_name,
            agent_id = %outcome.agent_id,
            version = outcome.version,
            cost_usd = tracker.total_cost(),
            "lineage iterated"
        );
        Ok(outcome)
    }

    /// Advance every unlocked lineage of a training session by one version,
    /// in the stable `A,B,C,D` order.
    pub async fn training_iterate(
        &self,
        provider: &dyn Provider,
        session_id: &str,
    ) -> Result<TrainingIterateOutcome> {
        let mut state = self.load()?;
        let session_id = session_id.trim();
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;
        if session.mode != SessionMode::Training {
            return Err(EngineError::invalid(format!(
                "session \"{}\" is not in training mode",
                session_id
            )));
        }

        let tracker = CostTracker::new();
        let mut regenerated = Vec::new();
        let mut locked = Vec::new();

        for &(name, _) in TRAINING_VARIANTS {
            let Some(lineage) = session.lineage_by_name_mut(name) else {
                continue;
            };
            if lineage.locked {
                locked.push(lineage.name.clone());
                continue;
            }
            evolve_lineage(provider, lineage, &tracker).await?;
            regenerated.push(name.to_string());
        }

        self.save(&state)?;

        let outcome = TrainingIterateOutcome {
            regenerated,
            locked,
        };
        tracing::info!(
            regenerated = outcome.regenerated.len(),
            locked = outcome.locked.len(),
            cost_usd = tracker.total_cost(),
            "training iteration complete"
        );
        Ok(outcome)
    }

    /// Convert a quickstart session into a training session. The original
    /// lineage survives as `A`; `B,C,D` are freshly generated under the
    /// strategy's variant hints.
    pub async fn promote(
        &self,
        provider: &dyn Provider,
        session_id: &str,
        strategy: PromotionStrategy,
    ) -> Result<()> {
        let mut state = self.load()?;
        let session_id = session_id.trim();
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;
        if session.mode != SessionMode::Quickstart {
            return Err(EngineError::invalid(format!(
                "session \"{}\" is not in quickstart mode",
                session_id
            )));
        }

        let need = session.need.clone();
        {
            let main = session
                .lineage_by_name_mut("main")
                .ok_or_else(|| CoreError::LineageNotFound("main".to_string()))?;
            if main.agents.is_empty() {
                return Err(no_agents("main"));
            }
            main.name = "A".to_string();
            main.locked = false;
        }

        let tracker = CostTracker::new();
        let now = utc_now_rfc3339();
        for &(name, hint) in &strategy.variants()[1..] {
            let generated = generator::generate_initial(provider, &need, Some(hint)).await?;
            record_generation(&tracker, &generated);

            let lineage_id = new_id(IdPrefix::Lineage);
            let lineage = new_lineage(session_id, lineage_id.clone(), name, generated, &now);
            session.lineages.insert(lineage_id, lineage);
        }

        session.mode = SessionMode::Training;
        self.save(&state)?;

        tracing::info!(
            session_id = %session_id,
            ?strategy,
            cost_usd = tracker.total_cost(),
            "session promoted to training"
        );
        Ok(())
    }

    /// Set or clear a lineage's lock.
    pub fn set_lineage_lock(&self, session_id: &str, name: &str, locked: bool) -> Result<()> {
        let session_id = session_id.trim();
        let name = name.trim();
        if session_id.is_empty() || name.is_empty() {
            return Err(EngineError::invalid(
                "session id and lineage name are required",
            ));
        }

        let mut state = self.load()?;
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;
        let lineage = session
            .lineage_by_name_mut(name)
            .ok_or_else(|| CoreError::LineageNotFound(name.to_string()))?;
        lineage.locked = locked;

        self.save(&state)?;
        tracing::info!(lineage = name, locked, "lineage lock updated");
        Ok(())
    }

    /// Attach a directive to a lineage.
    pub fn set_directive(
        &self,
        session_id: &str,
        lineage_name: &str,
        kind: DirectiveKind,
        text: &str,
    ) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::invalid("directive text is required"));
        }

        let mut state = self.load()?;
        let session_id = session_id.trim();
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;
        let lineage = session
            .lineage_by_name_mut(lineage_name.trim())
            .ok_or_else(|| CoreError::LineageNotFound(lineage_name.trim().to_string()))?;

        let directive = Directive {
            id: new_id(IdPrefix::Directive),
            text: text.to_string(),
            created_at: utc_now_rfc3339(),
        };
        let directive_id = directive.id.clone();

        match kind {
            DirectiveKind::Oneshot => lineage.directives.oneshot.push(directive),
            DirectiveKind::Sticky => lineage.directives.sticky.push(directive),
        }

        self.save(&state)?;
        tracing::info!(directive_id = %directive_id, ?kind, "directive set");
        Ok(directive_id)
    }

    /// Remove a directive from a lineage, whichever list holds it.
    pub fn clear_directive(
        &self,
        session_id: &str,
        lineage_name: &str,
        directive_id: &str,
    ) -> Result<()> {
        let directive_id = directive_id.trim();
        let mut state = self.load()?;
        let session_id = session_id.trim();
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;
        let lineage = session
            .lineage_by_name_mut(lineage_name.trim())
            .ok_or_else(|| CoreError::LineageNotFound(lineage_name.trim().to_string()))?;

        let removed = remove_directive(&mut lineage.directives.sticky, directive_id)
            || remove_directive(&mut lineage.directives.oneshot, directive_id);
        if !removed {
            return Err(CoreError::DirectiveNotFound(directive_id.to_string()).into());
        }

        self.save(&state)?;
        tracing::info!(directive_id, "directive cleared");
        Ok(())
    }

    /// Rows for `artifact list`, across every lineage of the session.
    pub fn artifact_rows(&self, session_id: &str) -> Result<Vec<ArtifactRow>> {
        let state = self.load()?;
        let session_id = session_id.trim();
        let session = state
            .sessions
            .get(session_id)
            .ok_or_else(|| CoreError::SessionMissing(session_id.to_string()))?;

        let mut rows = Vec::new();
        for lineage in session.lineages.values() {
            for artifact in &lineage.artifacts {
                rows.push(ArtifactRow {
                    id: artifact.id.clone(),
                    agent_version: lineage
                        .agents
                        .iter()
                        .find(|agent| agent.id == artifact.agent_id)
                        .map(|agent| agent.version)
                        .unwrap_or(0),
                    score: artifact.evaluation.as_ref().map(|e| e.score),
                    created_at: artifact.created_at.clone(),
                });
            }
        }
        Ok(rows)
    }

    /// One artifact by globally unique id.
    pub fn inspect_artifact(&self, artifact_id: &str) -> Result<Artifact> {
        let state = self.load()?;
        let found = lookup::find_artifact(&state, artifact_id)?;
        Ok(found.artifact.clone())
    }

    /// Render one agent definition in an export format.
    pub fn export_agent(
        &self,
        agent_id: &str,
        format: ludus_core::export::ExportFormat,
    ) -> Result<String> {
        let state = self.load()?;
        Ok(ludus_core::export::render_agent(&state, agent_id, format)?)
    }

    /// Render one session's evidence pack.
    pub fn export_evidence(&self, session_id: &str) -> Result<String> {
        let state = self.load()?;
        Ok(ludus_core::export::render_evidence(&state, session_id)?)
    }
}

/// Flag-level entry points: resolve provider configuration (falling back to
/// the stored agent's generation provider and model) before delegating to
/// the provider-typed operations above. Resolution errors surface in the
/// same order the core operations raise them: session, lineage, agents,
/// then credentials.
impl Engine {
    /// `run` with provider selection from flags.
    pub async fn run_command(
        &self,
        session_id: &str,
        lineage: Option<&str>,
        input: &str,
        mode: ExecutionMode,
        executor: Option<&str>,
        provider_config: &ProviderConfig,
    ) -> Result<RunOutcome> {
        let provider = match mode {
            ExecutionMode::Api => {
                let (fallback_provider, fallback_model) =
                    self.agent_defaults(session_id, lineage)?;
                Some(build_provider(&merge_provider_config(
                    provider_config,
                    &fallback_provider,
                    &fallback_model,
                ))?)
            }
            ExecutionMode::Cli => None,
        };

        self.run(RunRequest {
            session_id,
            lineage,
            input,
            mode,
            provider: provider.as_deref(),
            executor,
        })
        .await
    }

    /// `iterate` with provider selection from flags.
    pub async fn iterate_command(
        &self,
        session_id: &str,
        lineage: Option<&str>,
        provider_config: &ProviderConfig,
    ) -> Result<IterateOutcome> {
        let (fallback_provider, fallback_model) = self.agent_defaults(session_id, lineage)?;
        let provider = build_provider(&merge_provider_config(
            provider_config,
            &fallback_provider,
            &fallback_model,
        ))?;
        self.iterate(provider.as_ref(), session_id, lineage).await
    }

    /// `training iterate` with provider selection from flags.
    pub async fn training_iterate_command(
        &self,
        session_id: &str,
        provider_config: &ProviderConfig,
    ) -> Result<TrainingIterateOutcome> {
        let (fallback_provider, fallback_model) =
            self.first_unlocked_agent_defaults(session_id)?;
        let provider = build_provider(&merge_provider_config(
            provider_config,
            &fallback_provider,
            &fallback_model,
        ))?;
        self.training_iterate(provider.as_ref(), session_id).await
    }

    /// `promote` with provider selection from flags.
    pub async fn promote_command(
        &self,
        session_id: &str,
        strategy: PromotionStrategy,
        provider_config: &ProviderConfig,
    ) -> Result<()> {
        let (fallback_provider, fallback_model) =
            self.agent_defaults(session_id, Some("main"))?;
        let provider = build_provider(&merge_provider_config(
            provider_config,
            &fallback_provider,
            &fallback_model,
        ))?;
        self.promote(provider.as_ref(), session_id, strategy).await
    }

    /// The stored provider name and model of the lineage's latest agent.
    fn agent_defaults(
        &self,
        session_id: &str,
        lineage: Option<&str>,
    ) -> Result<(String, String)> {
        let state = self.load()?;
        let session_id = session_id.trim();
        let session = state
            .sessions
            .get(session_id)
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;
        let lineage_name = match lineage.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => name.to_string(),
            None => resolve_lineage_name(session, None)?,
        };
        let (_, lineage) = session
            .lineage_by_name(&lineage_name)
            .ok_or_else(|| CoreError::LineageNotFound(lineage_name.clone()))?;
        let agent = lineage
            .latest_agent()
            .ok_or_else(|| no_agents(&lineage_name))?;
        Ok((
            agent.generation_metadata.provider.clone(),
            agent.definition.model.clone(),
        ))
    }

    /// Like [`Engine::agent_defaults`], taken from the first unlocked
    /// training lineage in `A,B,C,D` order.
    fn first_unlocked_agent_defaults(&self, session_id: &str) -> Result<(String, String)> {
        let state = self.load()?;
        let session_id = session_id.trim();
        let session = state
            .sessions
            .get(session_id)
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;

        for &(name, _) in TRAINING_VARIANTS {
            let Some((_, lineage)) = session.lineage_by_name(name) else {
                continue;
            };
            if lineage.locked {
                continue;
            }
            if let Some(agent) = lineage.latest_agent() {
                return Ok((
                    agent.generation_metadata.provider.clone(),
                    agent.definition.model.clone(),
                ));
            }
        }
        Ok((String::new(), String::new()))
    }
}

fn merge_provider_config(
    config: &ProviderConfig,
    fallback_provider: &str,
    fallback_model: &str,
) -> ProviderConfig {
    ProviderConfig {
        provider: if config.provider.trim().is_empty() {
            fallback_provider.trim().to_string()
        } else {
            config.provider.clone()
        },
        model: if config.model.trim().is_empty() {
            fallback_model.trim().to_string()
        } else {
            config.model.clone()
        },
        base_url: config.base_url.clone(),
        api_key: config.api_key.clone(),
    }
}

fn new_lineage(
    session_id: &str,
    lineage_id: String,
    name: &str,
    generated: GeneratedAgent,
    now: &str,
) -> Lineage {
    Lineage {
        id: lineage_id.clone(),
        session_id: session_id.to_string(),
        name: name.to_string(),
        locked: false,
        agents: vec![Agent {
            id: new_id(IdPrefix::Agent),
            lineage_id,
            version: 1,
            definition: generated.definition,
            created_at: now.to_string(),
            generation_metadata: generated.metadata,
        }],
        artifacts: vec![],
        directives: Directives::default(),
    }
}

/// Evolve one lineage in place: generate the next version from feedback,
/// append it, and consume the oneshot directives.
async fn evolve_lineage(
    provider: &dyn Provider,
    lineage: &mut Lineage,
    tracker: &CostTracker,
) -> Result<IterateOutcome> {
    let previous = lineage
        .latest_agent()
        .cloned()
        .ok_or_else(|| no_agents(&lineage.name))?;

    let generated = generator::generate_evolved(
        provider,
        &previous,
        &lineage.artifacts,
        &lineage.directives,
        None,
    )
    .await?;
    record_generation(tracker, &generated);

    let agent = Agent {
        id: new_id(IdPrefix::Agent),
        lineage_id: lineage.id.clone(),
        version: previous.version + 1,
        definition: generated.definition,
        created_at: utc_now_rfc3339(),
        generation_metadata: generated.metadata,
    };
    let outcome = IterateOutcome {
        agent_id: agent.id.clone(),
        version: agent.version,
    };

    lineage.agents.push(agent);
    lineage.directives.oneshot.clear();
    Ok(outcome)
}

async fn execute_api(
    provider: &dyn Provider,
    agent: &Agent,
    input: &str,
) -> Result<(String, ExecutionMetadata)> {
    let definition = &agent.definition;
    let completion = provider
        .complete(CompletionRequest {
            system: Some(definition.system_prompt.clone()),
            user: input.to_string(),
            model: definition.model.clone(),
            temperature: definition.temperature,
            max_tokens: definition.max_tokens,
        })
        .await?;

    let info = provider.info();
    let metadata = ExecutionMetadata {
        mode: ExecutionMode::Api,
        provider: Some(info.provider),
        executor: None,
        executor_command: None,
        tokens_input: completion.tokens_input,
        tokens_output: completion.tokens_output,
        duration_ms: completion.duration_ms,
        cost_usd: cost::estimate_cost(
            &definition.model,
            completion.tokens_input,
            completion.tokens_output,
        ),
        tool_calls: vec![],
    };
    Ok((completion.text, metadata))
}

async fn execute_cli(
    executor_name: &str,
    agent: &Agent,
    input: &str,
) -> Result<(String, ExecutionMetadata)> {
    let result =
        executor::run_executor(executor_name, &agent.definition.system_prompt, input).await?;

    let metadata = ExecutionMetadata {
        mode: ExecutionMode::Cli,
        provider: None,
        executor: Some(executor_name.trim().to_string()),
        executor_command: Some(result.command),
        tokens_input: 0,
        tokens_output: 0,
        duration_ms: result.duration_ms,
        cost_usd: 0.0,
        tool_calls: vec![],
    };
    Ok((result.stdout, metadata))
}

fn resolve_lineage_name(session: &Session, requested: Option<&str>) -> Result<String> {
    if let Some(name) = requested.map(str::trim).filter(|name| !name.is_empty()) {
        return Ok(name.to_string());
    }
    if session.lineage_by_name("main").is_some() {
        return Ok("main".to_string());
    }
    session
        .lineages
        .values()
        .next()
        .map(|lineage| lineage.name.clone())
        .ok_or_else(|| CoreError::LineageNotFound("main".to_string()).into())
}

fn unique_artifact_id(state: &State) -> Result<String> {
    for _ in 0..UNIQUE_ID_ATTEMPTS {
        let candidate = new_id(IdPrefix::Artifact);
        if !lookup::artifact_id_exists(state, &candidate) {
            return Ok(candidate);
        }
    }
    Err(EngineError::invalid(format!(
        "failed to generate globally unique artifact id after {} attempts",
        UNIQUE_ID_ATTEMPTS
    )))
}

fn record_generation(tracker: &CostTracker, generated: &GeneratedAgent) {
    tracker.record(CostEvent {
        operation: "generate".to_string(),
        model: generated.metadata.model.clone(),
        tokens_input: generated.tokens_input,
        tokens_output: generated.tokens_output,
        cost_usd: generated.metadata.cost_usd,
        duration_ms: generated.metadata.duration_ms,
    });
}

fn no_agents(lineage_name: &str) -> EngineError {
    EngineError::invalid(format!("lineage \"{}\" has no agents", lineage_name))
}

fn remove_directive(directives: &mut Vec<Directive>, directive_id: &str) -> bool {
    let before = directives.len();
    directives.retain(|directive| directive.id != directive_id);
    directives.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_strategy_parsing() {
        assert_eq!(
            "variations".parse::<PromotionStrategy>().unwrap(),
            PromotionStrategy::Variations
        );
        assert_eq!(
            "".parse::<PromotionStrategy>().unwrap(),
            PromotionStrategy::Variations
        );
        assert_eq!(
            "alternatives".parse::<PromotionStrategy>().unwrap(),
            PromotionStrategy::Alternatives
        );
        let err = "tournament".parse::<PromotionStrategy>().unwrap_err();
        assert!(err.to_string().contains("invalid --strategy"));
    }

    #[test]
    fn test_directive_kind_requires_exactly_one_flag() {
        assert_eq!(
            DirectiveKind::from_flags(true, false).unwrap(),
            DirectiveKind::Oneshot
        );
        assert_eq!(
            DirectiveKind::from_flags(false, true).unwrap(),
            DirectiveKind::Sticky
        );
        assert_eq!(
            DirectiveKind::from_flags(false, false)
                .unwrap_err()
                .to_string(),
            "must specify --oneshot or --sticky"
        );
        assert!(DirectiveKind::from_flags(true, true).is_err());
    }

    #[test]
    fn test_training_iterate_summary_formats() {
        let outcome = TrainingIterateOutcome {
            regenerated: vec!["B".into(), "C".into(), "D".into()],
            locked: vec!["A".into()],
        };
        assert_eq!(
            outcome.summary(),
            "Regenerated 3 lineages: B, C, D. Locked: A."
        );

        let none_locked = TrainingIterateOutcome {
            regenerated: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            locked: vec![],
        };
        assert_eq!(
            none_locked.summary(),
            "Regenerated 4 lineages: A, B, C, D. Locked: none."
        );
    }

    #[test]
    fn test_variant_tables_cover_all_four_lineages() {
        let names: Vec<&str> = TRAINING_VARIANTS.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
        let alternative_names: Vec<&str> =
            ALTERNATIVE_VARIANTS.iter().map(|(name, _)| *name).collect();
        assert_eq!(alternative_names, names);
    }
}
