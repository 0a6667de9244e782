//! ludus-magnus - command-line workbench for LLM agent definitions
//!
//! An operator describes an intent, the workbench generates candidate system
//! prompts, executes them against inputs, collects human scores, and evolves
//! the prompts from the feedback. See `ludus-magnus --help` for the command
//! surface.

use clap::{Args, Parser, Subcommand};

mod commands;
mod doctor;
mod output;

/// ludus-magnus - iteratively develop, evaluate, and export LLM agents
#[derive(Parser)]
#[command(name = "ludus-magnus", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit machine-readable JSON instead of text output
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Manage quickstart flows
    Quickstart {
        #[command(subcommand)]
        command: QuickstartCommands,
    },

    /// Run the latest agent on one input and store an artifact
    Run(RunArgs),

    /// Evaluate one artifact with a score and optional comment
    Evaluate(EvaluateArgs),

    /// Generate the next agent version from lineage evolution feedback
    Iterate(IterateArgs),

    /// Manage training mode flows
    Training {
        #[command(subcommand)]
        command: TrainingCommands,
    },

    /// Manage lineage lock state
    Lineage {
        #[command(subcommand)]
        command: LineageCommands,
    },

    /// Promote a quickstart session into training mode
    Promote(PromoteArgs),

    /// Manage lineage directives
    Directive {
        #[command(subcommand)]
        command: DirectiveCommands,
    },

    /// Inspect stored artifacts
    Artifact {
        #[command(subcommand)]
        command: ArtifactCommands,
    },

    /// Export agents and evidence
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },

    /// Run environment diagnostics
    Doctor(DoctorArgs),
}

/// Provider selection flags shared by every generating/executing command.
#[derive(Args, Clone, Default)]
struct ProviderFlags {
    /// Provider name (anthropic or openai-compatible)
    #[arg(long, default_value = "")]
    provider: String,

    /// Override provider model
    #[arg(long, default_value = "")]
    model: String,

    /// Override provider base URL
    #[arg(long = "base-url", default_value = "")]
    base_url: String,

    /// Override provider API key
    #[arg(long = "api-key", default_value = "")]
    api_key: String,
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Create a new session
    New {
        /// Session mode: quickstart or training
        #[arg(long, default_value = "quickstart")]
        mode: String,

        /// Intent for the session
        #[arg(long, default_value = "")]
        need: String,
    },

    /// List sessions
    List,

    /// Inspect a session
    Inspect {
        session_id: String,
    },
}

#[derive(Subcommand)]
enum QuickstartCommands {
    /// Initialize a quickstart session
    Init {
        /// Intent for the session
        #[arg(long)]
        need: String,

        #[command(flatten)]
        provider: ProviderFlags,
    },
}

#[derive(Args)]
struct RunArgs {
    session_id: String,

    /// Input for agent execution
    #[arg(long)]
    input: String,

    /// Lineage name (main, A, B, C, D)
    #[arg(long, default_value = "")]
    lineage: String,

    /// Execution mode: api or cli
    #[arg(long, default_value = "api")]
    mode: String,

    /// CLI executor for mode=cli: claude or codex
    #[arg(long, default_value = "")]
    executor: String,

    #[command(flatten)]
    provider: ProviderFlags,
}

#[derive(Args)]
struct EvaluateArgs {
    artifact_id: String,

    /// Evaluation score (1-10)
    #[arg(long)]
    score: i64,

    /// Optional evaluation comment
    #[arg(long, default_value = "")]
    comment: String,
}

#[derive(Args)]
struct IterateArgs {
    session_id: String,

    /// Lineage name (main, A, B, C, D)
    #[arg(long, default_value = "")]
    lineage: String,

    #[command(flatten)]
    provider: ProviderFlags,
}

#[derive(Subcommand)]
enum TrainingCommands {
    /// Initialize a training session with lineages A/B/C/D
    Init {
        /// Intent for the session
        #[arg(long)]
        need: String,

        #[command(flatten)]
        provider: ProviderFlags,
    },

    /// Regenerate unlocked training lineages
    Iterate {
        session_id: String,

        #[command(flatten)]
        provider: ProviderFlags,
    },
}

#[derive(Subcommand)]
enum LineageCommands {
    /// Lock one lineage
    Lock {
        session_id: String,
        lineage_name: String,
    },

    /// Unlock one lineage
    Unlock {
        session_id: String,
        lineage_name: String,
    },
}

#[derive(Args)]
struct PromoteArgs {
    session_id: String,

    /// Promotion strategy: variations or alternatives
    #[arg(long, default_value = "variations")]
    strategy: String,

    #[command(flatten)]
    provider: ProviderFlags,
}

#[derive(Subcommand)]
enum DirectiveCommands {
    /// Add a one-shot or sticky directive to one lineage
    Set {
        session_id: String,
        lineage_name: String,

        /// Directive instruction text
        #[arg(long)]
        text: String,

        /// Store as one-shot directive
        #[arg(long)]
        oneshot: bool,

        /// Store as sticky directive
        #[arg(long)]
        sticky: bool,
    },

    /// Remove a directive from one lineage
    Clear {
        session_id: String,
        lineage_name: String,
        directive_id: String,
    },
}

#[derive(Subcommand)]
enum ArtifactCommands {
    /// List all artifacts for a session
    List {
        session_id: String,
    },

    /// Inspect one artifact in detail
    Inspect {
        artifact_id: String,
    },
}

#[derive(Subcommand)]
enum ExportCommands {
    /// Export one agent definition
    Agent {
        agent_id: String,

        /// Export format: json, python, typescript
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Export one session evidence pack
    Evidence {
        session_id: String,

        /// Export format: json
        #[arg(long, default_value = "json")]
        format: String,
    },
}

#[derive(Args)]
struct DoctorArgs {
    #[command(flatten)]
    provider: ProviderFlags,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    commands::dispatch(cli).await
}
