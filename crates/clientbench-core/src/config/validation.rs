use crate::config::model::{BenchConfig, WorkloadConfig, TOKEN_PLACEHOLDER};
use crate::error::BenchError;
use crate::http::STRATEGY_NAMES;

/// Validate a [`BenchConfig`] and return a list of validation errors.
///
/// An empty `Vec` means the configuration is usable.
pub fn validate_config(config: &BenchConfig) -> Vec<BenchError> {
    let mut errors = Vec::new();

    let token = config.bot_token.trim();
    if token.is_empty() || token == TOKEN_PLACEHOLDER {
        errors.push(BenchError::Validation(
            "bot_token must be set (config file, --bot-token or TELEGRAM_BOT_TOKEN)".to_string(),
        ));
    }

    if config.chat_id.trim().is_empty() {
        errors.push(BenchError::Validation(
            "chat_id must be set (config file, --chat-id or TELEGRAM_CHAT_ID)".to_string(),
        ));
    }

    let url = config.api_url_template.trim();
    if !url.contains("{token}") {
        errors.push(BenchError::Validation(format!(
            "api_url_template must contain a {{token}} placeholder (got: {url})"
        )));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        errors.push(BenchError::Validation(format!(
            "api_url_template must start with http:// or https:// (got: {url})"
        )));
    }

    if config.request_timeout_secs == 0 {
        errors.push(BenchError::Validation(
            "request_timeout_secs must be at least 1".to_string(),
        ));
    }

    if config.max_concurrent_requests == 0 {
        errors.push(BenchError::Validation(
            "max_concurrent_requests must be at least 1".to_string(),
        ));
    }

    for name in &config.strategies {
        if !STRATEGY_NAMES.contains(&name.as_str()) {
            errors.push(BenchError::UnknownStrategy(format!(
                "{name} (available: {})",
                STRATEGY_NAMES.join(", ")
            )));
        }
    }

    errors.extend(validate_workload(&config.workload));

    errors
}

fn validate_workload(workload: &WorkloadConfig) -> Vec<BenchError> {
    let mut errors = Vec::new();

    match workload {
        WorkloadConfig::Generated { length, limit } => {
            if *length == 0 {
                errors.push(BenchError::Validation(
                    "generated workload length must be at least 1".to_string(),
                ));
            }
            if *limit == Some(0) {
                errors.push(BenchError::Validation(
                    "generated workload limit must be at least 1 when set".to_string(),
                ));
            }
        }
        WorkloadConfig::Inline { messages, .. } => {
            if messages.iter().all(|m| m.trim().is_empty()) {
                errors.push(BenchError::Validation(
                    "inline workload needs at least one non-empty message".to_string(),
                ));
            }
        }
        WorkloadConfig::Csv { path, column, .. } => {
            if path.as_os_str().is_empty() {
                errors.push(BenchError::Validation(
                    "csv workload path must not be empty".to_string(),
                ));
            }
            if column.trim().is_empty() {
                errors.push(BenchError::Validation(
                    "csv workload column must not be empty".to_string(),
                ));
            }
        }
    }

    errors
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
