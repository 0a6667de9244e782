//! Command handlers: map parsed flags onto engine operations and format the
//! results as text lines or JSON.

use anyhow::bail;
use serde_json::json;

use ludus_core::export::ExportFormat;
use ludus_core::{ExecutionMode, SessionMode};
use ludus_engine::{DirectiveKind, Engine, PromotionStrategy, ProviderConfig};

use crate::output::{print_json, render_table};
use crate::{
    ArtifactCommands, Cli, Commands, DirectiveCommands, ExportCommands, LineageCommands,
    ProviderFlags, QuickstartCommands, SessionCommands, TrainingCommands,
};

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let engine = Engine::with_default_path();
    let json = cli.json;

    match cli.command {
        Commands::Session { command } => session(&engine, command, json),
        Commands::Quickstart { command } => quickstart(&engine, command, json).await,
        Commands::Run(args) => {
            let outcome = engine
                .run_command(
                    &args.session_id,
                    optional(&args.lineage),
                    &args.input,
                    parse_execution_mode(&args.mode)?,
                    optional(&args.executor),
                    &provider_config(&args.provider),
                )
                .await?;
            if json {
                return print_json(&json!({ "artifact_id": outcome.artifact_id }));
            }
            println!("artifact_id={}", outcome.artifact_id);
            Ok(())
        }
        Commands::Evaluate(args) => {
            let (artifact_id, score) =
                engine.evaluate(&args.artifact_id, args.score, &args.comment)?;
            if json {
                return print_json(&json!({
                    "artifact_id": artifact_id,
                    "score": score,
                    "comment": args.comment,
                }));
            }
            println!("Artifact {} evaluated: {}/10", artifact_id, score);
            Ok(())
        }
        Commands::Iterate(args) => {
            let outcome = engine
                .iterate_command(
                    &args.session_id,
                    optional(&args.lineage),
                    &provider_config(&args.provider),
                )
                .await?;
            if json {
                return print_json(&json!({
                    "agent_id": outcome.agent_id,
                    "version": outcome.version,
                }));
            }
            println!("agent_id={}", outcome.agent_id);
            println!("version={}", outcome.version);
            Ok(())
        }
        Commands::Training { command } => training(&engine, command, json).await,
        Commands::Lineage { command } => {
            let (session_id, lineage_name, locked) = match command {
                LineageCommands::Lock {
                    session_id,
                    lineage_name,
                } => (session_id, lineage_name, true),
                LineageCommands::Unlock {
                    session_id,
                    lineage_name,
                } => (session_id, lineage_name, false),
            };
            engine.set_lineage_lock(&session_id, &lineage_name, locked)?;
            if json {
                return print_json(&json!({
                    "session_id": session_id,
                    "lineage": lineage_name,
                    "locked": locked,
                }));
            }
            if locked {
                println!("Lineage {} locked", lineage_name);
            } else {
                println!("Lineage {} unlocked", lineage_name);
            }
            Ok(())
        }
        Commands::Promote(args) => {
            let strategy: PromotionStrategy = args.strategy.parse()?;
            engine
                .promote_command(&args.session_id, strategy, &provider_config(&args.provider))
                .await?;
            if json {
                return print_json(&json!({
                    "session_id": args.session_id,
                    "mode": "training",
                    "lineages": ["A", "B", "C", "D"],
                }));
            }
            println!("Session promoted to training mode with 4 lineages");
            Ok(())
        }
        Commands::Directive { command } => directive(&engine, command, json),
        Commands::Artifact { command } => artifact(&engine, command, json),
        Commands::Export { command } => export(&engine, command),
        Commands::Doctor(args) => crate::doctor::run(&provider_config(&args.provider), json),
    }
}

fn session(engine: &Engine, command: SessionCommands, json: bool) -> anyhow::Result<()> {
    match command {
        SessionCommands::New { mode, need } => {
            let session_id = engine.create_session(parse_session_mode(&mode)?, &need)?;
            if json {
                return print_json(&json!({ "session_id": session_id }));
            }
            println!("{}", session_id);
            Ok(())
        }
        SessionCommands::List => {
            let sessions = engine.list_sessions()?;
            if json {
                let payload: Vec<_> = sessions
                    .iter()
                    .map(|s| {
                        json!({
                            "id": s.id,
                            "mode": s.mode.to_string(),
                            "status": s.status,
                            "created_at": s.created_at,
                        })
                    })
                    .collect();
                return print_json(&json!({ "sessions": payload }));
            }
            let rows: Vec<Vec<String>> = sessions
                .iter()
                .map(|s| {
                    vec![
                        s.id.clone(),
                        s.mode.to_string(),
                        s.status.clone(),
                        s.created_at.clone(),
                    ]
                })
                .collect();
            print!(
                "{}",
                render_table(&["ID", "MODE", "STATUS", "CREATED_AT"], &rows)
            );
            Ok(())
        }
        SessionCommands::Inspect { session_id } => {
            let session = engine.inspect_session(&session_id)?;
            println!("{}", serde_json::to_string_pretty(&session)?);
            Ok(())
        }
    }
}

async fn quickstart(
    engine: &Engine,
    command: QuickstartCommands,
    json: bool,
) -> anyhow::Result<()> {
    match command {
        QuickstartCommands::Init { need, provider } => {
            let adapter = ludus_engine::build_provider(&provider_config(&provider))?;
            let outcome = engine.quickstart_init(adapter.as_ref(), &need).await?;
            if json {
                return print_json(&json!({
                    "session_id": outcome.session_id,
                    "lineage_id": outcome.lineage_id,
                }));
            }
            println!("session_id={}", outcome.session_id);
            println!("lineage_id={}", outcome.lineage_id);
            Ok(())
        }
    }
}

async fn training(engine: &Engine, command: TrainingCommands, json: bool) -> anyhow::Result<()> {
    match command {
        TrainingCommands::Init { need, provider } => {
            let adapter = ludus_engine::build_provider(&provider_config(&provider))?;
            let outcome = engine.training_init(adapter.as_ref(), &need).await?;
            if json {
                let mut payload = json!({ "session_id": outcome.session_id });
                for (name, lineage_id) in &outcome.lineage_ids {
                    payload[format!("lineage_{}_id", name)] = json!(lineage_id);
                }
                return print_json(&payload);
            }
            println!("session_id={}", outcome.session_id);
            for (name, lineage_id) in &outcome.lineage_ids {
                println!("lineage_{}_id={}", name, lineage_id);
            }
            Ok(())
        }
        TrainingCommands::Iterate {
            session_id,
            provider,
        } => {
            let outcome = engine
                .training_iterate_command(&session_id, &provider_config(&provider))
                .await?;
            if json {
                return print_json(&json!({
                    "regenerated_count": outcome.regenerated.len(),
                    "regenerated": outcome.regenerated,
                    "locked": outcome.locked,
                }));
            }
            println!("{}", outcome.summary());
            Ok(())
        }
    }
}

fn directive(engine: &Engine, command: DirectiveCommands, json: bool) -> anyhow::Result<()> {
    match command {
        DirectiveCommands::Set {
            session_id,
            lineage_name,
            text,
            oneshot,
            sticky,
        } => {
            let kind = DirectiveKind::from_flags(oneshot, sticky)?;
            let directive_id = engine.set_directive(&session_id, &lineage_name, kind, &text)?;
            if json {
                return print_json(&json!({
                    "directive_id": directive_id,
                    "lineage": lineage_name,
                    "type": if oneshot { "oneshot" } else { "sticky" },
                }));
            }
            println!("directive_id={}", directive_id);
            Ok(())
        }
        DirectiveCommands::Clear {
            session_id,
            lineage_name,
            directive_id,
        } => {
            engine.clear_directive(&session_id, &lineage_name, &directive_id)?;
            println!("directive_id={} cleared", directive_id);
            Ok(())
        }
    }
}

fn artifact(engine: &Engine, command: ArtifactCommands, json: bool) -> anyhow::Result<()> {
    match command {
        ArtifactCommands::List { session_id } => {
            let rows = engine.artifact_rows(&session_id)?;
            if json {
                let payload: Vec<_> = rows
                    .iter()
                    .map(|row| {
                        json!({
                            "id": row.id,
                            "agent_version": row.agent_version,
                            "score": row.score,
                            "created_at": row.created_at,
                        })
                    })
                    .collect();
                return print_json(&json!({ "artifacts": payload }));
            }
            let table_rows: Vec<Vec<String>> = rows
                .iter()
                .map(|row| {
                    vec![
                        row.id.clone(),
                        row.agent_version.to_string(),
                        row.score
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        row.created_at.clone(),
                    ]
                })
                .collect();
            print!(
                "{}",
                render_table(&["ID", "Agent Version", "Score", "Created At"], &table_rows)
            );
            Ok(())
        }
        ArtifactCommands::Inspect { artifact_id } => {
            let artifact = engine.inspect_artifact(&artifact_id)?;
            println!("{}", serde_json::to_string_pretty(&artifact)?);
            Ok(())
        }
    }
}

fn export(engine: &Engine, command: ExportCommands) -> anyhow::Result<()> {
    match command {
        ExportCommands::Agent { agent_id, format } => {
            let format: ExportFormat = format.parse()?;
            print!("{}", engine.export_agent(&agent_id, format)?);
            Ok(())
        }
        ExportCommands::Evidence { session_id, format } => {
            match format.parse::<ExportFormat>()? {
                ExportFormat::Json => {}
                _ => bail!("unsupported export format \"{}\"", format.trim()),
            }
            print!("{}", engine.export_evidence(&session_id)?);
            Ok(())
        }
    }
}

fn provider_config(flags: &ProviderFlags) -> ProviderConfig {
    ProviderConfig {
        provider: flags.provider.clone(),
        model: flags.model.clone(),
        base_url: flags.base_url.clone(),
        api_key: flags.api_key.clone(),
    }
}

fn optional(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_session_mode(raw: &str) -> anyhow::Result<SessionMode> {
    match raw.trim().to_lowercase().as_str() {
        "" | "quickstart" => Ok(SessionMode::Quickstart),
        "training" => Ok(SessionMode::Training),
        other => bail!("unsupported mode \"{}\"", other),
    }
}

fn parse_execution_mode(raw: &str) -> anyhow::Result<ExecutionMode> {
    match raw.trim().to_lowercase().as_str() {
        "" | "api" => Ok(ExecutionMode::Api),
        "cli" => Ok(ExecutionMode::Cli),
        other => bail!("unsupported mode \"{}\"", other),
    }
}
