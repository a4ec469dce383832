use crate::error::{Error, Result};
use serde_json::Value;

/// What the first line of a recorded log tells us about every other line in
/// the file: either the host's own `{direction, message}` envelope, or the
/// agent's raw wire frames directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedFormat {
    HostRecorded { dialect: String },
    RawAgent { dialect: String },
}

/// Inspect the first non-empty line only.
pub fn detect(contents: &str) -> Result<RecordedFormat> {
    let first_line = contents
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| Error::UnrecognisedFormat("empty log".to_string()))?;

    let value: Value = serde_json::from_str(first_line)
        .map_err(|e| Error::UnrecognisedFormat(format!("first line is not JSON: {e}")))?;

    if value.get("direction").is_some() {
        let message = value.get("message").cloned().unwrap_or(Value::Null);
        let dialect = dialect_of(&message)
            .ok_or_else(|| Error::UnrecognisedFormat("unrecognised message shape".to_string()))?;
        return Ok(RecordedFormat::HostRecorded { dialect });
    }

    let dialect = dialect_of(&value)
        .ok_or_else(|| Error::UnrecognisedFormat("unrecognised frame shape".to_string()))?;
    Ok(RecordedFormat::RawAgent { dialect })
}

/// Dialect-specific header tokens, checked in a fixed order so an ambiguous
/// frame (none observed in practice) resolves deterministically.
fn dialect_of(value: &Value) -> Option<String> {
    if value.get("sessionUpdate").and_then(Value::as_str).is_some() {
        return Some("cursor".to_string());
    }
    if let Some(t) = value.get("type").and_then(Value::as_str) {
        match t {
            "system" | "content_block_start" | "content_block_delta" | "content_block_stop"
            | "message_start" | "message_delta" | "message_stop" | "control_request"
            | "control_response" => return Some("claude".to_string()),
            "session_configured" | "agent_message_delta" | "agent_reasoning_delta"
            | "exec_command_begin" | "exec_command_end" | "task_complete" => {
                return Some("codex".to_string())
            }
            "init" | "content" | "thought" | "tool_call_request" | "tool_call_response"
            | "turn_complete" => return Some("gemini".to_string()),
            "result" | "user" => return Some("claude".to_string()),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_host_recorded_envelope() {
        let log = r#"{"timestamp":"t","direction":"received","message":{"type":"system","subtype":"init"}}"#;
        assert_eq!(
            detect(log).unwrap(),
            RecordedFormat::HostRecorded {
                dialect: "claude".to_string()
            }
        );
    }

    #[test]
    fn detects_raw_cursor_dialect() {
        let log = r#"{"sessionUpdate":"agent_message_chunk","content":{"text":"hi"}}"#;
        assert_eq!(
            detect(log).unwrap(),
            RecordedFormat::RawAgent {
                dialect: "cursor".to_string()
            }
        );
    }

    #[test]
    fn unrecognised_shape_errors() {
        let log = r#"{"foo":"bar"}"#;
        assert!(detect(log).is_err());
    }
}
