use crate::error::{Error, Result};
use crate::message::{ContentBlockKind, DeltaKind, TypedInboundMessage};
use fleetline_types::{ProtocolFrame, TurnUsage};
use serde_json::Value;

/// Codex frames are `{"type": "...", "msg": {...}}` events emitted on a
/// single implicit content-block index (Codex streams one message at a
/// time, never interleaved blocks), so `index` is always 0 here.
pub fn decode_inbound(frame: &ProtocolFrame) -> Result<TypedInboundMessage> {
    let value = frame.value();
    let discriminator = frame
        .field_str("type")
        .ok_or_else(|| Error::UnknownDiscriminator("<missing type>".to_string()))?;

    match discriminator {
        "session_configured" => decode_session_configured(value),
        "agent_message_delta" => Ok(TypedInboundMessage::ContentBlockDelta {
            index: 0,
            kind: DeltaKind::Text,
            text: field(value, "delta"),
        }),
        "agent_reasoning_delta" => Ok(TypedInboundMessage::ContentBlockDelta {
            index: 0,
            kind: DeltaKind::Thinking,
            text: field(value, "delta"),
        }),
        "exec_command_begin" => Ok(TypedInboundMessage::ContentBlockStart {
            index: 0,
            kind: ContentBlockKind::ToolUse,
            tool_id: value.get("call_id").and_then(Value::as_str).map(str::to_string),
            tool_name: Some("exec_command".to_string()),
        }),
        "exec_command_end" => decode_exec_command_end(value),
        "task_complete" => decode_task_complete(value),
        "permission_request" => decode_permission_request(value),
        "interrupt" => Ok(TypedInboundMessage::Interrupt {
            request_id: field(value, "request_id"),
        }),
        other => Ok(TypedInboundMessage::Skip {
            discriminator: other.to_string(),
        }),
    }
}

fn field(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn decode_session_configured(value: &Value) -> Result<TypedInboundMessage> {
    Ok(TypedInboundMessage::SessionStart {
        session_id: field(value, "session_id"),
        model: field(value, "model"),
    })
}

fn decode_exec_command_end(value: &Value) -> Result<TypedInboundMessage> {
    let tool_use_id = field(value, "call_id");
    let exit_code = value.get("exit_code").and_then(Value::as_i64).unwrap_or(0);
    Ok(TypedInboundMessage::ToolResult {
        tool_use_id,
        content: field(value, "aggregated_output"),
        is_error: exit_code != 0,
    })
}

fn decode_task_complete(value: &Value) -> Result<TypedInboundMessage> {
    let usage = value
        .get("token_usage")
        .map(|u| TurnUsage {
            input_tokens: u.get("input_tokens").and_then(Value::as_u64).unwrap_or(0),
            output_tokens: u.get("output_tokens").and_then(Value::as_u64).unwrap_or(0),
            cache_read_tokens: u
                .get("cached_input_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            cost_usd: u.get("cost_usd").and_then(Value::as_f64).unwrap_or(0.0),
        })
        .unwrap_or_default();
    Ok(TypedInboundMessage::TurnResult {
        text: value.get("last_agent_message").and_then(Value::as_str).map(str::to_string),
        success: true,
        usage,
    })
}

fn decode_permission_request(value: &Value) -> Result<TypedInboundMessage> {
    Ok(TypedInboundMessage::GenericPermissionRequest {
        request_id: field(value, "request_id"),
        payload: value.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_text_delta() {
        let frame = ProtocolFrame::new(json!({"type": "agent_message_delta", "delta": "hi"}));
        match decode_inbound(&frame).unwrap() {
            TypedInboundMessage::ContentBlockDelta { kind, text, .. } => {
                assert_eq!(kind, DeltaKind::Text);
                assert_eq!(text, "hi");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_skipped() {
        let frame = ProtocolFrame::new(json!({"type": "turn_diff"}));
        match decode_inbound(&frame).unwrap() {
            TypedInboundMessage::Skip { discriminator } => assert_eq!(discriminator, "turn_diff"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
