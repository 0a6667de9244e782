//! Deterministic cost model and tracking
//!
//! Cost is a pure function of (model, tokens in, tokens out) over a fixed
//! rate table. Models outside the table cost zero rather than guessing.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-million-token rates for one model.
#[derive(Debug, Clone, Copy)]
pub struct ModelRate {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

const RATES: &[(&str, ModelRate)] = &[
    (
        "gpt-4o-mini",
        ModelRate {
            input_per_million: 0.15,
            output_per_million: 0.60,
        },
    ),
    (
        "claude-sonnet-4-5",
        ModelRate {
            input_per_million: 3.0,
            output_per_million: 15.0,
        },
    ),
    (
        "claude-3-5-sonnet",
        ModelRate {
            input_per_million: 3.0,
            output_per_million: 15.0,
        },
    ),
    (
        "claude-opus-4-6",
        ModelRate {
            input_per_million: 15.0,
            output_per_million: 75.0,
        },
    ),
    (
        "claude-haiku-4-5",
        ModelRate {
            input_per_million: 0.80,
            output_per_million: 4.0,
        },
    ),
];

/// Rate for a model, if the table knows it.
pub fn model_rate(model: &str) -> Option<ModelRate> {
    let target = model.trim();
    RATES
        .iter()
        .find(|(name, _)| *name == target)
        .map(|(_, rate)| *rate)
}

/// Estimated USD cost for one call. Unknown models cost zero.
pub fn estimate_cost(model: &str, tokens_input: u64, tokens_output: u64) -> f64 {
    match model_rate(model) {
        Some(rate) => {
            (tokens_input as f64 * rate.input_per_million
                + tokens_output as f64 * rate.output_per_million)
                / 1_000_000.0
        }
        None => 0.0,
    }
}

/// One cost-generating operation.
#[derive(Debug, Clone, Serialize)]
pub struct CostEvent {
    pub operation: String,
    pub model: String,
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub cost_usd: f64,
    pub duration_ms: u64,
}

/// Aggregate cost report.
#[derive(Debug, Clone, Serialize)]
pub struct CostSummary {
    pub total_cost_usd: f64,
    pub total_tokens_input: u64,
    pub total_tokens_output: u64,
    pub total_duration_ms: u64,
    pub event_count: usize,
    pub by_operation: BTreeMap<String, f64>,
    pub by_model: BTreeMap<String, f64>,
}

/// Accumulates cost events across the provider calls of one command.
#[derive(Debug, Default)]
pub struct CostTracker {
    events: Mutex<Vec<CostEvent>>,
}

impl CostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: CostEvent) {
        self.events.lock().push(event);
    }

    pub fn total_cost(&self) -> f64 {
        self.events.lock().iter().map(|e| e.cost_usd).sum()
    }

    pub fn summarize(&self) -> CostSummary {
        let events = self.events.lock();
        let mut summary = CostSummary {
            total_cost_usd: 0.0,
            total_tokens_input: 0,
            total_tokens_output: 0,
            total_duration_ms: 0,
            event_count: 0,
            by_operation: BTreeMap::new(),
            by_model: BTreeMap::new(),
        };

        for event in events.iter() {
            summary.total_cost_usd += event.cost_usd;
            summary.total_tokens_input += event.tokens_input;
            summary.total_tokens_output += event.tokens_output;
            summary.total_duration_ms += event.duration_ms;
            summary.event_count += 1;
            *summary
                .by_operation
                .entry(event.operation.clone())
                .or_default() += event.cost_usd;
            if !event.model.is_empty() {
                *summary.by_model.entry(event.model.clone()).or_default() += event.cost_usd;
            }
        }

        summary
    }
}
