use autoarch_core::Diagram;
use serde::Deserialize;

use crate::error::{BridgeError, Result};

/// Parses a response body as a diagram document.
///
/// Extra top-level keys are ignored. If the body is not a bare JSON object
/// (prose or a code fence around generated JSON), the outermost `{...}` span
/// is tried instead.
pub fn parse_diagram(raw: &str) -> Result<Diagram> {
    match serde_json::from_str::<Diagram>(raw) {
        Ok(diagram) => Ok(diagram),
        Err(direct) => {
            let Some(span) = extract_json_object(raw) else {
                return Err(BridgeError::Decode(direct.to_string()));
            };
            serde_json::from_str(span).map_err(|e| BridgeError::Decode(e.to_string()))
        }
    }
}

/// The substring from the first `{` to the last `}`.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<serde_json::Value>,
}

/// Picks the most useful explanation out of an error response body.
pub fn error_message(body: &str, fallback: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        return fallback.to_string();
    };
    if let Some(message) = parsed.message.filter(|m| !m.trim().is_empty()) {
        return message;
    }
    match parsed.detail {
        Some(serde_json::Value::String(detail)) if !detail.trim().is_empty() => detail,
        // FastAPI validation errors arrive as a list of objects.
        Some(detail @ serde_json::Value::Array(_)) => detail.to_string(),
        _ => fallback.to_string(),
    }
}
