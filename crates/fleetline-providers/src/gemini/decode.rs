use crate::error::{Error, Result};
use crate::message::{ContentBlockKind, DeltaKind, TypedInboundMessage};
use fleetline_types::{ProtocolFrame, TurnUsage};
use serde_json::Value;

/// Gemini wraps every frame in `{"type": "...", "value": {...}}`.
pub fn decode_inbound(frame: &ProtocolFrame) -> Result<TypedInboundMessage> {
    let value = frame.value();
    let discriminator = frame
        .field_str("type")
        .ok_or_else(|| Error::UnknownDiscriminator("<missing type>".to_string()))?;
    let inner = value.get("value").cloned().unwrap_or(Value::Null);

    match discriminator {
        "init" => Ok(TypedInboundMessage::SessionStart {
            session_id: str_field(&inner, "sessionId"),
            model: str_field(&inner, "model"),
        }),
        "content" => decode_content(&inner),
        "thought" => Ok(TypedInboundMessage::ContentBlockDelta {
            index: 0,
            kind: DeltaKind::Thinking,
            text: str_field(&inner, "text"),
        }),
        "tool_call_request" => Ok(TypedInboundMessage::ContentBlockStart {
            index: 0,
            kind: ContentBlockKind::ToolUse,
            tool_id: Some(str_field(&inner, "callId")),
            tool_name: Some(str_field(&inner, "name")),
        }),
        "tool_call_response" => Ok(TypedInboundMessage::ToolResult {
            tool_use_id: str_field(&inner, "callId"),
            content: str_field(&inner, "output"),
            is_error: inner.get("error").and_then(Value::as_bool).unwrap_or(false),
        }),
        "turn_complete" => decode_turn_complete(&inner),
        "user_confirmation_request" => Ok(TypedInboundMessage::GenericPermissionRequest {
            request_id: str_field(&inner, "requestId"),
            payload: inner,
        }),
        other => Ok(TypedInboundMessage::Skip {
            discriminator: other.to_string(),
        }),
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn decode_content(inner: &Value) -> Result<TypedInboundMessage> {
    Ok(TypedInboundMessage::ContentBlockDelta {
        index: 0,
        kind: DeltaKind::Text,
        text: str_field(inner, "text"),
    })
}

fn decode_turn_complete(inner: &Value) -> Result<TypedInboundMessage> {
    let usage = TurnUsage {
        input_tokens: inner.get("promptTokenCount").and_then(Value::as_u64).unwrap_or(0),
        output_tokens: inner.get("candidatesTokenCount").and_then(Value::as_u64).unwrap_or(0),
        cache_read_tokens: inner.get("cachedContentTokenCount").and_then(Value::as_u64).unwrap_or(0),
        cost_usd: inner.get("costUsd").and_then(Value::as_f64).unwrap_or(0.0),
    };
    Ok(TypedInboundMessage::TurnResult {
        text: inner.get("finalText").and_then(Value::as_str).map(str::to_string),
        success: inner.get("success").and_then(Value::as_bool).unwrap_or(true),
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_text_content() {
        let frame = ProtocolFrame::new(json!({"type": "content", "value": {"text": "hi"}}));
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
        let frame = ProtocolFrame::new(json!({"type": "checkpoint", "value": {}}));
        match decode_inbound(&frame).unwrap() {
            TypedInboundMessage::Skip { discriminator } => assert_eq!(discriminator, "checkpoint"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
