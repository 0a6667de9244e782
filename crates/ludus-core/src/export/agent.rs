//! Agent definition export
//!
//! Renders one stored agent definition as JSON, a Python module, or a
//! TypeScript module. The target-language renders keep `tools` faithful:
//! Python gets native literals, TypeScript gets compact JSON.

use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::lookup;
use crate::schema::{AgentDefinition, State};

/// Supported agent export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Python,
    Typescript,
}

impl FromStr for ExportFormat {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "" | "json" => Ok(ExportFormat::Json),
            "python" => Ok(ExportFormat::Python),
            "typescript" => Ok(ExportFormat::Typescript),
            other => Err(CoreError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Render one stored agent definition in the requested format.
pub fn render_agent(state: &State, agent_id: &str, format: ExportFormat) -> Result<String> {
    let found = lookup::find_agent(state, agent_id)?;
    match format {
        ExportFormat::Json => render_json(&found.agent.definition),
        ExportFormat::Python => Ok(render_python(&found.agent.definition)),
        ExportFormat::Typescript => Ok(render_typescript(&found.agent.definition)),
    }
}

fn render_json(definition: &AgentDefinition) -> Result<String> {
    let mut payload = serde_json::to_string_pretty(definition)?;
    payload.push('\n');
    Ok(payload)
}

fn render_python(definition: &AgentDefinition) -> String {
    let tools = python_literal(&serde_json::Value::Array(definition.tools.clone()));
    format!(
        "agent_definition = {{\n    \"system_prompt\": {},\n    \"model\": {},\n    \"temperature\": {},\n    \"max_tokens\": {},\n    \"tools\": {}\n}}\n",
        json_string(&definition.system_prompt),
        json_string(&definition.model),
        definition.temperature,
        definition.max_tokens,
        tools,
    )
}

fn render_typescript(definition: &AgentDefinition) -> String {
    let tools = serde_json::to_string(&definition.tools).unwrap_or_else(|_| "[]".to_string());
    format!(
        "type AgentDefinition = {{\n  systemPrompt: string;\n  model: string;\n  temperature: number;\n  maxTokens: number;\n  tools: unknown[];\n}};\n\nconst agentDefinition: AgentDefinition = {{\n  systemPrompt: {},\n  model: {},\n  temperature: {},\n  maxTokens: {},\n  tools: {}\n}};\n\nexport default agentDefinition;\n",
        json_string(&definition.system_prompt),
        json_string(&definition.model),
        definition.temperature,
        definition.max_tokens,
        tools,
    )
}

/// JSON string escaping doubles as Python string escaping for our payloads.
fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Render a JSON value as a Python literal. Object keys are sorted so the
/// output is deterministic.
fn python_literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "None".to_string(),
        serde_json::Value::Bool(true) => "True".to_string(),
        serde_json::Value::Bool(false) => "False".to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => json_string(s),
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(python_literal).collect();
            format!("[{}]", parts.join(", "))
        }
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|key| format!("{}: {}", json_string(key), python_literal(&map[key])))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}
