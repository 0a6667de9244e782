//! Environment diagnostics: credentials, provider construction, state file
//! readability, and optional executor binaries.

use anyhow::bail;
use serde_json::json;

use ludus_core::default_state_path;
use ludus_engine::providers::normalize_provider_name;
use ludus_engine::{build_provider, ProviderConfig};

use crate::output::print_json;

struct Check {
    required: bool,
    passed: bool,
    message: String,
}

pub fn run(provider_config: &ProviderConfig, json: bool) -> anyhow::Result<()> {
    let checks = vec![
        check_credentials(provider_config),
        check_provider_initialization(provider_config),
        check_state_file(),
        check_optional_executor("claude"),
        check_optional_executor("codex"),
    ];

    let failed_required = checks.iter().any(|check| check.required && !check.passed);

    if json {
        let payload: Vec<_> = checks
            .iter()
            .map(|check| {
                json!({
                    "required": check.required,
                    "passed": check.passed,
                    "message": check.message,
                })
            })
            .collect();
        print_json(&json!({ "checks": payload }))?;
    } else {
        for check in &checks {
            println!("{}", check.message);
        }
    }

    if failed_required {
        bail!("doctor found failed required checks");
    }
    Ok(())
}

fn check_credentials(config: &ProviderConfig) -> Check {
    let supplied = !config.api_key.trim().is_empty();
    match normalize_provider_name(&config.provider).as_str() {
        "anthropic" => {
            if supplied || env_set("ANTHROPIC_API_KEY") {
                Check {
                    required: true,
                    passed: true,
                    message: "✓ ANTHROPIC_API_KEY set".to_string(),
                }
            } else {
                Check {
                    required: true,
                    passed: false,
                    message: "✗ missing ANTHROPIC_API_KEY for provider anthropic".to_string(),
                }
            }
        }
        "openai-compatible" => {
            if supplied
                || env_set("OPENAI_API_KEY")
                || env_set("OPENAI_COMPATIBLE_API_KEY")
                || env_set("API_KEY")
            {
                Check {
                    required: true,
                    passed: true,
                    message: "✓ OPENAI_API_KEY (or equivalent) set".to_string(),
                }
            } else {
                Check {
                    required: true,
                    passed: false,
                    message: "✗ missing OPENAI_API_KEY (or equivalent) for provider openai-compatible"
                        .to_string(),
                }
            }
        }
        other => Check {
            required: true,
            passed: false,
            message: format!("✗ unsupported provider: {}", other),
        },
    }
}

fn check_provider_initialization(config: &ProviderConfig) -> Check {
    match build_provider(config) {
        Ok(provider) => Check {
            required: true,
            passed: true,
            message: format!("✓ Provider initialization ok: {}", provider.info().provider),
        },
        Err(err) => Check {
            required: true,
            passed: false,
            message: format!("✗ Provider initialization failed: {}", err),
        },
    }
}

fn check_state_file() -> Check {
    let path = default_state_path();
    if !path.exists() {
        return Check {
            required: false,
            passed: true,
            message: format!("✓ State file not found (optional): {}", path.display()),
        };
    }
    match std::fs::read(&path) {
        Ok(_) => Check {
            required: true,
            passed: true,
            message: format!("✓ State file readable: {}", path.display()),
        },
        Err(err) => Check {
            required: true,
            passed: false,
            message: format!("✗ State file not readable: {} ({})", path.display(), err),
        },
    }
}

fn check_optional_executor(name: &str) -> Check {
    match ludus_engine::executor::resolve_executor(name) {
        Ok(path) => Check {
            required: false,
            passed: true,
            message: format!("✓ {} binary found (optional): {}", name, path),
        },
        Err(_) => Check {
            required: false,
            passed: true,
            message: format!("✓ {} binary not found (optional)", name),
        },
    }
}

fn env_set(name: &str) -> bool {
    std::env::var(name)
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false)
}
