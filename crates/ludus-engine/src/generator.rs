//! Agent definition generation
//!
//! Builds the deterministic prompt templates for initial generation and
//! feedback-driven evolution, drives the provider, and shapes the response
//! into an [`AgentDefinition`] with generation metadata attached.

use std::collections::BTreeMap;

use ludus_core::{Agent, AgentDefinition, Artifact, Directives, GenerationMetadata};

use crate::cost;
use crate::error::{EngineError, Result};
use crate::providers::{CompletionRequest, Provider};

pub const DEFAULT_AGENT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_AGENT_TEMPERATURE: f64 = 1.0;
pub const DEFAULT_AGENT_MAX_TOKENS: u32 = 4096;

const INPUT_EXCERPT_CHARS: usize = 60;

/// A generated definition plus the observability signals of the call that
/// produced it.
#[derive(Debug, Clone)]
pub struct GeneratedAgent {
    pub definition: AgentDefinition,
    pub metadata: GenerationMetadata,
    pub tokens_input: u64,
    pub tokens_output: u64,
}

/// Generate the first agent version for a need, optionally steered by a
/// variant hint.
pub async fn generate_initial(
    provider: &dyn Provider,
    need: &str,
    variant_hint: Option<&str>,
) -> Result<GeneratedAgent> {
    if need.trim().is_empty() {
        return Err(EngineError::invalid("need is required"));
    }
    let prompt = build_generation_prompt(need, variant_hint, &[]);
    generate(provider, &prompt).await
}

/// Generate the next agent version from evaluated artifacts and directives.
///
/// Artifacts without evaluations contribute to the totals but not to the
/// feedback enumeration; a lineage with no evaluations at all still evolves
/// from the current prompt and directives alone.
pub async fn generate_evolved(
    provider: &dyn Provider,
    previous: &Agent,
    artifacts: &[Artifact],
    directives: &Directives,
    variant_hint: Option<&str>,
) -> Result<GeneratedAgent> {
    let prompt = build_evolution_prompt(previous, artifacts, directives, variant_hint);
    generate(provider, &prompt).await
}

async fn generate(provider: &dyn Provider, prompt: &str) -> Result<GeneratedAgent> {
    let completion = provider
        .complete(CompletionRequest::generation(prompt))
        .await?;

    let info = provider.info();
    let system_prompt = completion.text.trim().to_string();
    if system_prompt.is_empty() {
        return Err(EngineError::ProviderResponse {
            provider: info.provider,
            detail: "returned empty system prompt".to_string(),
        });
    }

    let model = if info.model.trim().is_empty() {
        DEFAULT_AGENT_MODEL.to_string()
    } else {
        info.model.trim().to_string()
    };
    let provider_name = if info.provider.trim().is_empty() {
        "unknown".to_string()
    } else {
        info.provider.trim().to_string()
    };

    Ok(GeneratedAgent {
        definition: AgentDefinition {
            system_prompt,
            model: model.clone(),
            temperature: DEFAULT_AGENT_TEMPERATURE,
            max_tokens: DEFAULT_AGENT_MAX_TOKENS,
            tools: vec![],
        },
        metadata: GenerationMetadata {
            provider: provider_name,
            model: model.clone(),
            tokens_used: completion.tokens_input + completion.tokens_output,
            duration_ms: completion.duration_ms,
            cost_usd: cost::estimate_cost(&model, completion.tokens_input, completion.tokens_output),
        },
        tokens_input: completion.tokens_input,
        tokens_output: completion.tokens_output,
    })
}

/// The deterministic template used for initial agent generation.
pub fn build_generation_prompt(
    need: &str,
    variant_hint: Option<&str>,
    directives: &[String],
) -> String {
    let mut prompt = format!(
        "You are a master AI agent trainer. Generate a high-quality system prompt for an AI agent.\n\nUser Need: {}\n",
        need.trim()
    );

    if let Some(hint) = variant_hint.map(str::trim).filter(|h| !h.is_empty()) {
        prompt.push_str(&format!("\nVariation strategy: {}\n", hint));
    }

    prompt.push_str(&format!(
        "\nDirectives (constraints/guidance):\n{}\n",
        format_directive_lines(directives)
    ));

    prompt.push_str(
        "\nOutput a JSON object with the following structure:\n{\n  \"system_prompt\": \"the complete system prompt for the agent\",\n  \"reasoning\": \"brief explanation of your design choices\"\n}\n\nFocus on clarity, specificity, and task alignment.",
    );

    prompt
}

/// The deterministic template used to evolve an agent from feedback.
pub fn build_evolution_prompt(
    previous: &Agent,
    artifacts: &[Artifact],
    directives: &Directives,
    variant_hint: Option<&str>,
) -> String {
    let evaluated: Vec<&Artifact> = artifacts
        .iter()
        .filter(|artifact| artifact.evaluation.is_some())
        .collect();

    let mut average = "N/A".to_string();
    let mut histogram = "No evaluation yet".to_string();
    let mut feedback =
        "- No evaluation yet. Use current prompt and directives as baseline improvements."
            .to_string();
    let mut low_patterns = "- None yet".to_string();
    let mut high_patterns = "- None yet".to_string();

    if !evaluated.is_empty() {
        let mut total: u64 = 0;
        let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
        let mut feedback_lines = Vec::with_capacity(evaluated.len());
        let mut low_lines = Vec::new();
        let mut high_lines = Vec::new();

        for artifact in &evaluated {
            let Some(evaluation) = artifact.evaluation.as_ref() else {
                continue;
            };
            let comment = match evaluation.comment.trim() {
                "" => "(no comment)",
                trimmed => trimmed,
            };

            total += u64::from(evaluation.score);
            *counts.entry(evaluation.score).or_default() += 1;
            feedback_lines.push(format!(
                "- [{}/10] input \"{}\": {}",
                evaluation.score,
                excerpt(&artifact.input),
                comment
            ));

            if evaluation.score < 5 {
                low_lines.push(format!("- {}", comment));
            }
            if evaluation.score >= 8 {
                high_lines.push(format!("- {}", comment));
            }
        }

        average = format!("{:.2}", total as f64 / evaluated.len() as f64);
        histogram = counts
            .iter()
            .map(|(score, count)| format!("{}:{}", score, count))
            .collect::<Vec<_>>()
            .join(", ");
        feedback = feedback_lines.join("\n");
        if !low_lines.is_empty() {
            low_patterns = low_lines.join("\n");
        }
        if !high_lines.is_empty() {
            high_patterns = high_lines.join("\n");
        }
    }

    let mut directive_texts: Vec<String> = directives
        .sticky
        .iter()
        .chain(directives.oneshot.iter())
        .map(|d| d.text.clone())
        .collect();
    directive_texts.retain(|text| !text.trim().is_empty());

    let current_prompt = match previous.definition.system_prompt.trim() {
        "" => "(none)",
        trimmed => trimmed,
    };

    let mut prompt = format!(
        "You are a master AI agent trainer. Improve the following agent based on evaluation feedback.\n\nCURRENT AGENT (version {}):\nSystem Prompt: {}\n\nEVALUATION SUMMARY:\n- Total artifacts: {}\n- Evaluated artifacts: {}\n- Average score: {}/10\n- Score distribution: {}\n\nFEEDBACK:\n{}\n\nLOW-SCORING PATTERNS (score < 5):\n{}\n\nHIGH-SCORING PATTERNS (score >= 8):\n{}\n\nDIRECTIVES:\n{}\n",
        previous.version,
        current_prompt,
        artifacts.len(),
        evaluated.len(),
        average,
        histogram,
        feedback,
        low_patterns,
        high_patterns,
        format_directive_lines(&directive_texts),
    );

    if let Some(hint) = variant_hint.map(str::trim).filter(|h| !h.is_empty()) {
        prompt.push_str(&format!("\nVariation strategy: {}\n", hint));
    }

    prompt.push_str(
        "\nOutput a JSON object with the following structure:\n{\n  \"system_prompt\": \"the improved system prompt\",\n  \"reasoning\": \"brief explanation of changes made\"\n}\n\nFocus on addressing low-scoring feedback while preserving high-scoring behaviors.",
    );

    prompt
}

fn format_directive_lines(directives: &[String]) -> String {
    let lines: Vec<String> = directives
        .iter()
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .map(|text| format!("- {}", text))
        .collect();

    if lines.is_empty() {
        "(none)".to_string()
    } else {
        lines.join("\n")
    }
}

fn excerpt(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.chars().count() <= INPUT_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(INPUT_EXCERPT_CHARS).collect();
    format!("{}...", head)
}
