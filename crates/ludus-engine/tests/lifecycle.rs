//! End-to-end lifecycle coverage over a tempdir-backed state file and a mock
//! provider.

use async_trait::async_trait;
use std::path::PathBuf;

use ludus_core::id::is_well_formed;
use ludus_core::{
    Artifact, Directives, ExecutionMetadata, ExecutionMode, Lineage, Session, SessionMode, State,
};
use ludus_engine::{
    Completion, CompletionRequest, DirectiveKind, Engine, Provider, ProviderConfig, ProviderInfo,
    PromotionStrategy, RunRequest,
};

#[derive(Debug, Clone)]
enum MockReply {
    Fixed(&'static str),
    EchoPrompt,
}

#[derive(Debug, Clone)]
struct MockProvider {
    reply: MockReply,
}

impl MockProvider {
    fn fixed(text: &'static str) -> Self {
        Self {
            reply: MockReply::Fixed(text),
        }
    }

    fn echo() -> Self {
        Self {
            reply: MockReply::EchoPrompt,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> ludus_engine::Result<Completion> {
        let text = match &self.reply {
            MockReply::Fixed(text) => text.to_string(),
            MockReply::EchoPrompt => request.user.clone(),
        };
        Ok(Completion {
            text,
            tokens_input: 8,
            tokens_output: 4,
            duration_ms: 5,
        })
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            provider: "openai-compatible".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: "http://mock.invalid".to_string(),
        }
    }
}

fn test_engine() -> (tempfile::TempDir, Engine) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path: PathBuf = dir.path().join(".ludus-magnus").join("state.json");
    (dir, Engine::new(path))
}

fn load_state(engine: &Engine) -> State {
    ludus_core::load(engine.state_path()).expect("state loads")
}

fn lineage_by_name(session: &Session, name: &str) -> Lineage {
    session
        .lineage_by_name(name)
        .map(|(_, lineage)| lineage.clone())
        .unwrap_or_else(|| panic!("lineage {} missing", name))
}

#[tokio::test]
async fn quickstart_init_creates_one_lineage_with_defaults() {
    let (_dir, engine) = test_engine();
    let provider = MockProvider::fixed("You are a reliable customer care agent.");

    let outcome = engine
        .quickstart_init(&provider, "customer care agent")
        .await
        .unwrap();

    assert!(is_well_formed(&outcome.session_id));
    assert!(outcome.session_id.starts_with("ses_"));
    assert!(outcome.lineage_id.starts_with("lin_"));

    let state = load_state(&engine);
    assert_eq!(state.sessions.len(), 1);
    let session = &state.sessions[&outcome.session_id];
    assert_eq!(session.mode, SessionMode::Quickstart);
    assert_eq!(session.status, "active");
    assert_eq!(session.lineages.len(), 1);

    let lineage = lineage_by_name(session, "main");
    assert_eq!(lineage.id, outcome.lineage_id);
    assert!(!lineage.locked);
    assert_eq!(lineage.agents.len(), 1);

    let agent = &lineage.agents[0];
    assert!(is_well_formed(&agent.id));
    assert_eq!(agent.version, 1);
    assert_eq!(
        agent.definition.system_prompt,
        "You are a reliable customer care agent."
    );
    assert_eq!(agent.definition.model, "gpt-4o-mini");
    assert_eq!(agent.definition.temperature, 1.0);
    assert_eq!(agent.definition.max_tokens, 4096);
    assert!(agent.definition.tools.is_empty());
    assert_eq!(agent.generation_metadata.provider, "openai-compatible");
    assert_eq!(agent.generation_metadata.tokens_used, 12);
}

#[tokio::test]
async fn run_stores_an_artifact_and_evaluation_is_write_once() {
    let (_dir, engine) = test_engine();
    let init_provider = MockProvider::fixed("You are a reliable customer care agent.");
    let outcome = engine
        .quickstart_init(&init_provider, "customer care agent")
        .await
        .unwrap();

    let run_provider = MockProvider::fixed("ECHO: hello");
    let run = engine
        .run(RunRequest {
            session_id: &outcome.session_id,
            lineage: None,
            input: "hello",
            mode: ExecutionMode::Api,
            provider: Some(&run_provider),
            executor: None,
        })
        .await
        .unwrap();
    assert!(run.artifact_id.starts_with("art_"));

    let state = load_state(&engine);
    let lineage = lineage_by_name(&state.sessions[&outcome.session_id], "main");
    assert_eq!(lineage.artifacts.len(), 1);
    let artifact = &lineage.artifacts[0];
    assert_eq!(artifact.input, "hello");
    assert_eq!(artifact.output, "ECHO: hello");
    assert_eq!(artifact.execution_metadata.mode, ExecutionMode::Api);
    assert_eq!(
        artifact.execution_metadata.provider.as_deref(),
        Some("openai-compatible")
    );
    assert_eq!(artifact.execution_metadata.tokens_input, 8);
    assert!(artifact.execution_metadata.cost_usd > 0.0);
    assert!(artifact.evaluation.is_none());

    let (evaluated_id, score) = engine.evaluate(&run.artifact_id, 7, "x").unwrap();
    assert_eq!(evaluated_id, run.artifact_id);
    assert_eq!(score, 7);

    let err = engine.evaluate(&run.artifact_id, 8, "y").unwrap_err();
    assert_eq!(err.to_string(), "artifact already evaluated");

    let err = engine.evaluate(&run.artifact_id, 11, "").unwrap_err();
    assert_eq!(err.to_string(), "score must be between 1-10");

    let err = engine.evaluate(&run.artifact_id, 0, "").unwrap_err();
    assert_eq!(err.to_string(), "score must be between 1-10");
}

#[tokio::test]
async fn run_requires_a_provider_in_api_mode() {
    let (_dir, engine) = test_engine();
    let provider = MockProvider::fixed("prompt");
    let outcome = engine.quickstart_init(&provider, "need").await.unwrap();

    let err = engine
        .run(RunRequest {
            session_id: &outcome.session_id,
            lineage: None,
            input: "hello",
            mode: ExecutionMode::Api,
            provider: None,
            executor: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "provider is required for api mode");
}

#[tokio::test]
async fn run_reports_unknown_sessions_and_lineages() {
    let (_dir, engine) = test_engine();
    let provider = MockProvider::fixed("prompt");

    let err = engine
        .run(RunRequest {
            session_id: "ses_ffffffff",
            lineage: None,
            input: "hello",
            mode: ExecutionMode::Api,
            provider: Some(&provider),
            executor: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "session \"ses_ffffffff\" not found");

    let outcome = engine.quickstart_init(&provider, "need").await.unwrap();
    let err = engine
        .run(RunRequest {
            session_id: &outcome.session_id,
            lineage: Some("E"),
            input: "hello",
            mode: ExecutionMode::Api,
            provider: Some(&provider),
            executor: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "lineage \"E\" not found");
}

#[tokio::test]
async fn training_init_seeds_four_distinct_variants() {
    let (_dir, engine) = test_engine();
    let provider = MockProvider::echo();

    let outcome = engine
        .training_init(&provider, "customer care agent")
        .await
        .unwrap();

    let names: Vec<&str> = outcome
        .lineage_ids
        .iter()
        .map(|(name, _)| name.as_str())
        .collect();
    assert_eq!(names, vec!["A", "B", "C", "D"]);

    let state = load_state(&engine);
    let session = &state.sessions[&outcome.session_id];
    assert_eq!(session.mode, SessionMode::Training);
    assert_eq!(session.lineages.len(), 4);

    let hints = [
        ("A", "conservative approach, prioritize safety"),
        (
            "B",
            "balanced approach, equal priority to effectiveness and safety",
        ),
        ("C", "creative approach, prioritize novel solutions"),
        ("D", "aggressive approach, prioritize speed and efficiency"),
    ];
    let mut prompts = Vec::new();
    for (name, hint) in hints {
        let lineage = lineage_by_name(session, name);
        assert_eq!(lineage.agents.len(), 1);
        let prompt = lineage.agents[0].definition.system_prompt.clone();
        assert!(
            prompt.contains(hint),
            "lineage {} prompt missing its hint",
            name
        );
        prompts.push(prompt);
    }
    for i in 0..prompts.len() {
        for j in (i + 1)..prompts.len() {
            assert_ne!(prompts[i], prompts[j], "prompts {} and {} collide", i, j);
        }
    }
}

#[tokio::test]
async fn training_iterate_respects_locks() {
    let (_dir, engine) = test_engine();
    let provider = MockProvider::echo();
    let outcome = engine.training_init(&provider, "need").await.unwrap();

    engine
        .set_lineage_lock(&outcome.session_id, "A", true)
        .unwrap();

    let iterate = engine
        .training_iterate(&provider, &outcome.session_id)
        .await
        .unwrap();
    assert_eq!(
        iterate.summary(),
        "Regenerated 3 lineages: B, C, D. Locked: A."
    );

    let state = load_state(&engine);
    let session = &state.sessions[&outcome.session_id];
    assert_eq!(lineage_by_name(session, "A").agents.len(), 1);
    for name in ["B", "C", "D"] {
        let lineage = lineage_by_name(session, name);
        assert_eq!(lineage.agents.len(), 2, "lineage {}", name);
        assert_eq!(lineage.latest_agent().unwrap().version, 2);
    }
}

#[tokio::test]
async fn training_iterate_rejects_quickstart_sessions() {
    let (_dir, engine) = test_engine();
    let provider = MockProvider::fixed("prompt");
    let outcome = engine.quickstart_init(&provider, "need").await.unwrap();

    let err = engine
        .training_iterate(&provider, &outcome.session_id)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("is not in training mode"));
}

#[tokio::test]
async fn iterate_consumes_oneshot_directives_and_keeps_sticky() {
    let (_dir, engine) = test_engine();
    let provider = MockProvider::echo();
    let outcome = engine.quickstart_init(&provider, "need").await.unwrap();

    engine
        .set_directive(
            &outcome.session_id,
            "main",
            DirectiveKind::Sticky,
            "always cite sources",
        )
        .unwrap();
    engine
        .set_directive(
            &outcome.session_id,
            "main",
            DirectiveKind::Oneshot,
            "try a friendlier tone",
        )
        .unwrap();

    let iterated = engine
        .iterate(&provider, &outcome.session_id, None)
        .await
        .unwrap();
    assert_eq!(iterated.version, 2);
    assert!(iterated.agent_id.starts_with("agt_"));

    let state = load_state(&engine);
    let lineage = lineage_by_name(&state.sessions[&outcome.session_id], "main");
    assert!(lineage.directives.oneshot.is_empty());
    assert_eq!(lineage.directives.sticky.len(), 1);

    // The echo mock stores the evolution prompt as the new system prompt, so
    // the prompt contents are observable here.
    let evolved_prompt = &lineage.latest_agent().unwrap().definition.system_prompt;
    assert!(evolved_prompt.contains("Improve the following agent based on evaluation feedback"));
    assert!(evolved_prompt.contains("always cite sources"));
    assert!(evolved_prompt.contains("try a friendlier tone"));
}

#[tokio::test]
async fn iterate_refuses_locked_lineages() {
    let (_dir, engine) = test_engine();
    let provider = MockProvider::fixed("prompt");
    let outcome = engine.quickstart_init(&provider, "need").await.unwrap();

    engine
        .set_lineage_lock(&outcome.session_id, "main", true)
        .unwrap();
    let err = engine
        .iterate(&provider, &outcome.session_id, None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "lineage \"main\" is locked");
}

#[tokio::test]
async fn promote_preserves_the_original_lineage_as_a() {
    let (_dir, engine) = test_engine();
    let provider = MockProvider::fixed("You are a reliable customer care agent.");
    let outcome = engine
        .quickstart_init(&provider, "customer care agent")
        .await
        .unwrap();

    let original_agent_id = {
        let state = load_state(&engine);
        lineage_by_name(&state.sessions[&outcome.session_id], "main").agents[0]
            .id
            .clone()
    };

    let promote_provider = MockProvider::echo();
    engine
        .promote(
            &promote_provider,
            &outcome.session_id,
            PromotionStrategy::Variations,
        )
        .await
        .unwrap();

    let state = load_state(&engine);
    let session = &state.sessions[&outcome.session_id];
    assert_eq!(session.mode, SessionMode::Training);
    assert_eq!(session.lineages.len(), 4);
    assert!(session.lineage_by_name("main").is_none());

    let lineage_a = lineage_by_name(session, "A");
    assert_eq!(lineage_a.agents.len(), 1);
    assert_eq!(lineage_a.agents[0].id, original_agent_id);
    assert!(!lineage_a.locked);

    for name in ["B", "C", "D"] {
        let lineage = lineage_by_name(session, name);
        assert_eq!(lineage.agents.len(), 1, "lineage {}", name);
        assert_eq!(lineage.agents[0].version, 1);
        assert_ne!(lineage.agents[0].id, original_agent_id);
    }

    // A second promotion must fail: the session is no longer quickstart.
    let err = engine
        .promote(
            &promote_provider,
            &outcome.session_id,
            PromotionStrategy::Variations,
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("is not in quickstart mode"));
}

#[tokio::test]
async fn global_lookup_refuses_colliding_artifact_ids() {
    let (_dir, engine) = test_engine();

    let mut state = State::new();
    for n in 1..=2 {
        let session_id = format!("ses_0000000{}", n);
        let lineage_id = format!("lin_0000000{}", n);
        let artifact = Artifact {
            id: "art_collision".to_string(),
            agent_id: format!("agt_0000000{}", n),
            input: "hello".to_string(),
            output: "ok".to_string(),
            created_at: "2026-08-01T00:00:00Z".to_string(),
            execution_metadata: ExecutionMetadata {
                mode: ExecutionMode::Api,
                provider: Some("openai-compatible".to_string()),
                executor: None,
                executor_command: None,
                tokens_input: 1,
                tokens_output: 1,
                duration_ms: 1,
                cost_usd: 0.0,
                tool_calls: vec![],
            },
            evaluation: None,
        };
        let mut lineages = std::collections::BTreeMap::new();
        lineages.insert(
            lineage_id.clone(),
            Lineage {
                id: lineage_id,
                session_id: session_id.clone(),
                name: "main".to_string(),
                locked: false,
                agents: vec![],
                artifacts: vec![artifact],
                directives: Directives::default(),
            },
        );
        state.sessions.insert(
            session_id.clone(),
            Session {
                id: session_id,
                mode: SessionMode::Quickstart,
                need: "n".to_string(),
                created_at: "2026-08-01T00:00:00Z".to_string(),
                status: "active".to_string(),
                lineages,
            },
        );
    }
    ludus_core::save(engine.state_path(), &state).unwrap();

    let err = engine.inspect_artifact("art_collision").unwrap_err();
    assert!(err.to_string().contains("not unique"));

    let err = engine.evaluate("art_collision", 7, "").unwrap_err();
    assert!(err.to_string().contains("not unique"));
}

#[tokio::test]
async fn directive_set_and_clear_round_trip() {
    let (_dir, engine) = test_engine();
    let provider = MockProvider::fixed("prompt");
    let outcome = engine.quickstart_init(&provider, "need").await.unwrap();

    let directive_id = engine
        .set_directive(
            &outcome.session_id,
            "main",
            DirectiveKind::Sticky,
            "always cite sources",
        )
        .unwrap();
    assert!(directive_id.starts_with("dir_"));

    engine
        .clear_directive(&outcome.session_id, "main", &directive_id)
        .unwrap();
    let state = load_state(&engine);
    let lineage = lineage_by_name(&state.sessions[&outcome.session_id], "main");
    assert!(lineage.directives.sticky.is_empty());

    let err = engine
        .clear_directive(&outcome.session_id, "main", &directive_id)
        .unwrap_err();
    assert!(err.to_string().contains("not found"));

    let err = engine
        .set_directive(&outcome.session_id, "E", DirectiveKind::Sticky, "text")
        .unwrap_err();
    assert_eq!(err.to_string(), "lineage \"E\" not found");
}

#[tokio::test]
async fn artifact_rows_report_versions_and_scores() {
    let (_dir, engine) = test_engine();
    let provider = MockProvider::fixed("prompt");
    let outcome = engine.quickstart_init(&provider, "need").await.unwrap();

    let run_provider = MockProvider::fixed("output");
    let run = engine
        .run(RunRequest {
            session_id: &outcome.session_id,
            lineage: None,
            input: "hello",
            mode: ExecutionMode::Api,
            provider: Some(&run_provider),
            executor: None,
        })
        .await
        .unwrap();
    engine.evaluate(&run.artifact_id, 9, "good").unwrap();

    let rows = engine.artifact_rows(&outcome.session_id).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, run.artifact_id);
    assert_eq!(rows[0].agent_version, 1);
    assert_eq!(rows[0].score, Some(9));

    let err = engine.artifact_rows("ses_ffffffff").unwrap_err();
    assert_eq!(err.to_string(), "session not found: ses_ffffffff");
}

#[tokio::test]
async fn command_layer_resolves_session_before_credentials() {
    let (_dir, engine) = test_engine();

    // The session lookup must fail before any provider construction does,
    // matching the operation's own error ordering.
    let err = engine
        .iterate_command("ses_ffffffff", None, &ProviderConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "session \"ses_ffffffff\" not found");
}

#[tokio::test]
async fn session_listing_and_inspection() {
    let (_dir, engine) = test_engine();
    let session_id = engine
        .create_session(SessionMode::Training, "customer care agent")
        .unwrap();

    let sessions = engine.list_sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, session_id);
    assert_eq!(sessions[0].mode, SessionMode::Training);
    assert_eq!(sessions[0].status, "active");

    let session = engine.inspect_session(&session_id).unwrap();
    assert_eq!(session.need, "customer care agent");
    assert!(session.lineages.is_empty());

    let err = engine.inspect_session("ses_ffffffff").unwrap_err();
    assert_eq!(err.to_string(), "session \"ses_ffffffff\" not found");
}

#[tokio::test]
async fn export_agent_and_evidence_from_store() {
    let (_dir, engine) = test_engine();
    let provider = MockProvider::fixed("You are a reliable customer care agent.");
    let outcome = engine
        .quickstart_init(&provider, "customer care agent")
        .await
        .unwrap();

    let agent_id = {
        let state = load_state(&engine);
        lineage_by_name(&state.sessions[&outcome.session_id], "main").agents[0]
            .id
            .clone()
    };

    let json = engine
        .export_agent(&agent_id, ludus_core::export::ExportFormat::Json)
        .unwrap();
    assert!(json.contains("\"system_prompt\""));

    let evidence = engine.export_evidence(&outcome.session_id).unwrap();
    let value: serde_json::Value = serde_json::from_str(&evidence).unwrap();
    assert_eq!(value["session_id"], outcome.session_id.as_str());
    assert_eq!(value["lineages"][0]["name"], "main");

    let err = engine
        .export_agent("agt_ffffffff", ludus_core::export::ExportFormat::Json)
        .unwrap_err();
    assert_eq!(err.to_string(), "agent \"agt_ffffffff\" not found");
}
