use crate::error::{Error, Result};
use crate::message::{ContentBlockKind, DeltaKind, TypedInboundMessage};
use fleetline_types::{ProtocolFrame, TurnUsage};
use serde_json::Value;

/// Cursor frames discriminate on `sessionUpdate`, not `type`.
pub fn decode_inbound(frame: &ProtocolFrame) -> Result<TypedInboundMessage> {
    let value = frame.value();
    let discriminator = frame
        .field_str("sessionUpdate")
        .ok_or_else(|| Error::UnknownDiscriminator("<missing sessionUpdate>".to_string()))?;

    match discriminator {
        "session_start" => Ok(TypedInboundMessage::SessionStart {
            session_id: str_field(value, "sessionId"),
            model: str_field(value, "model"),
        }),
        "agent_message_chunk" => Ok(TypedInboundMessage::ContentBlockDelta {
            index: 0,
            kind: DeltaKind::Text,
            text: text_chunk(value),
        }),
        "agent_thought_chunk" => Ok(TypedInboundMessage::ContentBlockDelta {
            index: 0,
            kind: DeltaKind::Thinking,
            text: text_chunk(value),
        }),
        "tool_call" => Ok(TypedInboundMessage::ContentBlockStart {
            index: 0,
            kind: ContentBlockKind::ToolUse,
            tool_id: Some(str_field(value, "toolCallId")),
            tool_name: Some(str_field(value, "title")),
        }),
        "tool_call_update" => decode_tool_call_update(value),
        "turn_ended" => decode_turn_ended(value),
        "permission_request" => Ok(TypedInboundMessage::GenericPermissionRequest {
            request_id: str_field(value, "requestId"),
            payload: value.clone(),
        }),
        other => Ok(TypedInboundMessage::Skip {
            discriminator: other.to_string(),
        }),
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn text_chunk(value: &Value) -> String {
    value
        .get("content")
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn decode_tool_call_update(value: &Value) -> Result<TypedInboundMessage> {
    let status = value.get("status").and_then(Value::as_str).unwrap_or("");
    if status != "completed" && status != "failed" {
        return Ok(TypedInboundMessage::Skip {
            discriminator: format!("tool_call_update:{status}"),
        });
    }
    Ok(TypedInboundMessage::ToolResult {
        tool_use_id: str_field(value, "toolCallId"),
        content: value
            .get("content")
            .and_then(|c| c.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        is_error: status == "failed",
    })
}

fn decode_turn_ended(value: &Value) -> Result<TypedInboundMessage> {
    let usage = value
        .get("usage")
        .map(|u| TurnUsage {
            input_tokens: u.get("inputTokens").and_then(Value::as_u64).unwrap_or(0),
            output_tokens: u.get("outputTokens").and_then(Value::as_u64).unwrap_or(0),
            cache_read_tokens: u.get("cacheReadTokens").and_then(Value::as_u64).unwrap_or(0),
            cost_usd: u.get("costUsd").and_then(Value::as_f64).unwrap_or(0.0),
        })
        .unwrap_or_default();
    Ok(TypedInboundMessage::TurnResult {
        text: None,
        success: value.get("stopReason").and_then(Value::as_str) != Some("error"),
        usage,
    })
}
