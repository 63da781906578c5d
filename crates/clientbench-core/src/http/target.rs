use serde_json::{Map, Value};

use crate::strategy::{SendOutcome, SendParams};
use crate::workload::WorkloadUnit;

const REDACTED: &str = "[REDACTED]";

/// Replace the `{token}` placeholder of a URL template for display.
pub fn redact_url(template: &str) -> String {
    template.replace("{token}", REDACTED)
}

/// The Telegram `sendMessage` endpoint for one bot and chat.
#[derive(Clone)]
pub struct TelegramTarget {
    url: String,
    redacted_url: String,
    token: String,
    chat_id: String,
}

impl TelegramTarget {
    pub fn new(url_template: &str, token: &str, chat_id: impl Into<String>) -> Self {
        Self {
            url: url_template.replace("{token}", token),
            redacted_url: redact_url(url_template),
            token: token.to_string(),
            chat_id: chat_id.into(),
        }
    }

    /// `text` with every occurrence of the bot token masked. Library error
    /// messages often quote the request URL.
    pub fn redact(&self, text: &str) -> String {
        if self.token.is_empty() {
            return text.to_string();
        }
        text.replace(&self.token, REDACTED)
    }

    /// The concrete URL, including the bot token.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn redacted_url(&self) -> &str {
        &self.redacted_url
    }

    /// `chat_id` and `text` followed by the extra params. Params may
    /// override the base fields.
    pub fn form_fields(&self, unit: &WorkloadUnit, params: &SendParams) -> Vec<(String, String)> {
        let mut fields = vec![
            ("chat_id".to_string(), self.chat_id.clone()),
            ("text".to_string(), unit.payload.clone()),
        ];
        for (key, value) in params.iter() {
            match fields.iter_mut().find(|(k, _)| k == key) {
                Some(existing) => existing.1 = value.clone(),
                None => fields.push((key.clone(), value.clone())),
            }
        }
        fields
    }

    pub fn json_body(&self, unit: &WorkloadUnit, params: &SendParams) -> Value {
        let mut body = Map::new();
        for (key, value) in self.form_fields(unit, params) {
            body.insert(key, Value::String(value));
        }
        Value::Object(body)
    }
}

// Keep the token out of debug output.
impl std::fmt::Debug for TelegramTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramTarget")
            .field("url", &self.redacted_url)
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Interpret a Bot API response.
///
/// The attempt succeeded iff the status is 2xx and the body does not carry
/// `"ok": false`. The API's `description` becomes the error message.
pub fn outcome_from_response(status: u16, bytes: &[u8]) -> SendOutcome {
    let body = String::from_utf8_lossy(bytes).into_owned();
    let parsed: Option<Value> = serde_json::from_slice(bytes).ok();

    let api_ok = parsed
        .as_ref()
        .and_then(|v| v.get("ok"))
        .and_then(Value::as_bool)
        .unwrap_or(true);
    let description = parsed
        .as_ref()
        .and_then(|v| v.get("description"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let succeeded = (200..300).contains(&status) && api_ok;
    let error = if succeeded {
        None
    } else {
        Some(description.unwrap_or_else(|| format!("HTTP {status}")))
    };

    SendOutcome {
        status_code: Some(status),
        body,
        size_bytes: bytes.len() as u64,
        succeeded,
        error,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
