use serde::{Deserialize, Serialize};
use serde_json::Value;

const LARGE_CONTENT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RedactionLevel {
    Strict,  // Production - redact secrets + all message content
    Normal,  // Development - redact secrets + long message content
    Minimal, // Debug - only known secret keys
}

impl RedactionLevel {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "strict" => RedactionLevel::Strict,
            "minimal" => RedactionLevel::Minimal,
            _ => RedactionLevel::Normal,
        }
    }
}

fn is_secret_key(key: &str) -> bool {
    key.contains("key")
        || key.contains("auth")
        || (key.contains("token") && !key.ends_with("tokens"))
        || key.contains("secret")
        || key.contains("password")
        || key == "cookie"
}

/// Scrubs a payload before it is written to the log.
pub fn redact_value(v: &mut Value, level: RedactionLevel) {
    match v {
        Value::Object(map) => {
            for (k, val) in map.iter_mut() {
                let k_lower = k.to_lowercase();

                // 1. Secret keys (Always redacted)
                if is_secret_key(&k_lower) {
                    *val = Value::String("[REDACTED]".to_string());
                    continue;
                }

                // 2. Level-based redaction of conversation text
                let is_content = k_lower == "content" || k_lower == "systemprompt";
                match level {
                    RedactionLevel::Strict if is_content => {
                        *val = Value::String("[REDACTED-STRICT]".to_string());
                    }
                    RedactionLevel::Normal
                        if is_content
                            && val
                                .as_str()
                                .map(|s| s.chars().count() > LARGE_CONTENT_CHARS)
                                .unwrap_or(false) =>
                    {
                        *val = Value::String("[REDACTED-LARGE-CONTENT]".to_string());
                    }
                    _ => redact_value(val, level),
                }
            }
        }
        Value::Array(arr) => {
            for val in arr {
                redact_value(val, level);
            }
        }
        _ => {}
    }
}
