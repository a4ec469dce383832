use crate::error::{Error, Result};
use crate::message::{ContentBlockKind, DeltaKind, JsonRpcRequest, TypedInboundMessage};
use fleetline_types::{ProtocolFrame, TurnUsage};
use serde_json::Value;

/// Probe-then-decode: the discriminator (`type`) is read first and cheaply,
/// then the full frame is matched into its variant. Unknown `type` values
/// are never an error — they become `Skip` so the Session drops the frame.
pub fn decode_inbound(frame: &ProtocolFrame) -> Result<TypedInboundMessage> {
    let value = frame.value();
    let discriminator = frame
        .field_str("type")
        .ok_or_else(|| Error::UnknownDiscriminator("<missing type>".to_string()))?;

    match discriminator {
        "system" => decode_system(value),
        "message_start" => Ok(TypedInboundMessage::MessageStart),
        "content_block_start" => decode_content_block_start(value),
        "content_block_delta" => decode_content_block_delta(value),
        "content_block_stop" => decode_content_block_stop(value),
        "message_delta" => decode_message_delta(value),
        "message_stop" => Ok(TypedInboundMessage::MessageStop),
        "result" => decode_result(value),
        "user" => decode_user_message(value),
        "control_request" => decode_control_request(value),
        "control_response" => decode_control_response(value),
        other => Ok(TypedInboundMessage::Skip {
            discriminator: other.to_string(),
        }),
    }
}

fn decode_system(value: &Value) -> Result<TypedInboundMessage> {
    if value.get("subtype").and_then(Value::as_str) == Some("init") {
        let session_id = value
            .get("session_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let model = value
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Ok(TypedInboundMessage::SessionStart { session_id, model });
    }
    Ok(TypedInboundMessage::Skip {
        discriminator: "system".to_string(),
    })
}

fn block_index(value: &Value) -> u32 {
    value
        .get("index")
        .and_then(Value::as_u64)
        .unwrap_or_default() as u32
}

fn decode_content_block_start(value: &Value) -> Result<TypedInboundMessage> {
    let block = value.get("content_block").cloned().unwrap_or(Value::Null);
    let kind = match block.get("type").and_then(Value::as_str) {
        Some("text") => ContentBlockKind::Text,
        Some("thinking") => ContentBlockKind::Thinking,
        Some("tool_use") => ContentBlockKind::ToolUse,
        _ => ContentBlockKind::Other,
    };
    let tool_id = block
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string);
    let tool_name = block
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(TypedInboundMessage::ContentBlockStart {
        index: block_index(value),
        kind,
        tool_id,
        tool_name,
    })
}

/// Whitespace-only text/thinking deltas are still decoded here; the Stream
/// Assembler is the layer responsible for dropping them, not the decoder,
/// so probing stays purely mechanical.
fn decode_content_block_delta(value: &Value) -> Result<TypedInboundMessage> {
    let delta = value.get("delta").cloned().unwrap_or(Value::Null);
    let index = block_index(value);
    match delta.get("type").and_then(Value::as_str) {
        Some("text_delta") => Ok(TypedInboundMessage::ContentBlockDelta {
            index,
            kind: DeltaKind::Text,
            text: delta
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        Some("thinking_delta") => Ok(TypedInboundMessage::ContentBlockDelta {
            index,
            kind: DeltaKind::Thinking,
            text: delta
                .get("thinking")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        Some("input_json_delta") => Ok(TypedInboundMessage::ContentBlockDelta {
            index,
            kind: DeltaKind::InputJson,
            text: delta
                .get("partial_json")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        other => Ok(TypedInboundMessage::Skip {
            discriminator: format!("content_block_delta:{:?}", other),
        }),
    }
}

fn decode_content_block_stop(value: &Value) -> Result<TypedInboundMessage> {
    Ok(TypedInboundMessage::ContentBlockStop {
        index: block_index(value),
    })
}

fn decode_message_delta(value: &Value) -> Result<TypedInboundMessage> {
    let delta = value.get("delta").cloned().unwrap_or(Value::Null);
    let stop_reason = delta
        .get("stop_reason")
        .and_then(Value::as_str)
        .map(str::to_string);
    let usage = value.get("usage").map(parse_usage);
    Ok(TypedInboundMessage::MessageDelta { stop_reason, usage })
}

fn parse_usage(usage: &Value) -> TurnUsage {
    TurnUsage {
        input_tokens: usage.get("input_tokens").and_then(Value::as_u64).unwrap_or(0),
        output_tokens: usage
            .get("output_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        cache_read_tokens: usage
            .get("cache_read_input_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        cost_usd: 0.0,
    }
}

fn decode_result(value: &Value) -> Result<TypedInboundMessage> {
    let text = value
        .get("result")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| value.get("text").and_then(Value::as_str).map(str::to_string));
    let success = !value
        .get("is_error")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let mut usage = value.get("usage").map(parse_usage).unwrap_or_default();
    if let Some(cost) = value.get("total_cost_usd").or_else(|| value.get("costUSD")) {
        usage.cost_usd = cost.as_f64().unwrap_or(0.0);
    }
    Ok(TypedInboundMessage::TurnResult {
        text,
        success,
        usage,
    })
}

/// A `user`-role message carrying `tool_result` content blocks closes the
/// matching `ToolStart` by id; Claude allows more than one per message.
fn decode_user_message(value: &Value) -> Result<TypedInboundMessage> {
    let content = value
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_array);
    let Some(content) = content else {
        return Ok(TypedInboundMessage::Skip {
            discriminator: "user:no_tool_result".to_string(),
        });
    };
    for block in content {
        if block.get("type").and_then(Value::as_str) == Some("tool_result") {
            let tool_use_id = block
                .get("tool_use_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let is_error = block.get("is_error").and_then(Value::as_bool).unwrap_or(false);
            let content_text = match block.get("content") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            return Ok(TypedInboundMessage::ToolResult {
                tool_use_id,
                content: content_text,
                is_error,
            });
        }
    }
    Ok(TypedInboundMessage::Skip {
        discriminator: "user:no_tool_result".to_string(),
    })
}

fn decode_control_request(value: &Value) -> Result<TypedInboundMessage> {
    let request_id = value
        .get("request_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let request = value.get("request").cloned().unwrap_or(Value::Null);
    match request.get("subtype").and_then(Value::as_str) {
        Some("can_use_tool") => Ok(TypedInboundMessage::CanUseTool {
            request_id,
            tool_name: request
                .get("tool_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            input: request.get("input").cloned().unwrap_or(Value::Object(Default::default())),
        }),
        Some("set_permission_mode") => Ok(TypedInboundMessage::SetPermissionMode {
            request_id,
            mode: request
                .get("mode")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        Some("interrupt") => Ok(TypedInboundMessage::Interrupt { request_id }),
        Some("mcp_message") => {
            let rpc: JsonRpcRequest = serde_json::from_value(
                request.get("message").cloned().unwrap_or(Value::Null),
            )?;
            Ok(TypedInboundMessage::McpMessage { request_id, rpc })
        }
        Some(_) => Ok(TypedInboundMessage::GenericPermissionRequest {
            request_id,
            payload: request.clone(),
        }),
        None => Ok(TypedInboundMessage::Skip {
            discriminator: "control_request:<no subtype>".to_string(),
        }),
    }
}

fn decode_control_response(value: &Value) -> Result<TypedInboundMessage> {
    let response = value.get("response").cloned().unwrap_or(Value::Null);
    let request_id = response
        .get("request_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(TypedInboundMessage::Response {
        request_id,
        payload: response.get("response").cloned().unwrap_or(Value::Null),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_text_delta() {
        let frame = ProtocolFrame::new(json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "text_delta", "text": "hel"}
        }));
        match decode_inbound(&frame).unwrap() {
            TypedInboundMessage::ContentBlockDelta { kind, text, .. } => {
                assert_eq!(kind, DeltaKind::Text);
                assert_eq!(text, "hel");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn decodes_tool_use_start() {
        let frame = ProtocolFrame::new(json!({
            "type": "content_block_start",
            "index": 1,
            "content_block": {"type": "tool_use", "id": "t1", "name": "Bash"}
        }));
        match decode_inbound(&frame).unwrap() {
            TypedInboundMessage::ContentBlockStart {
                kind, tool_id, tool_name, ..
            } => {
                assert_eq!(kind, ContentBlockKind::ToolUse);
                assert_eq!(tool_id.as_deref(), Some("t1"));
                assert_eq!(tool_name.as_deref(), Some("Bash"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_discriminator_is_skipped_not_errored() {
        let frame = ProtocolFrame::new(json!({"type": "server_tool_use"}));
        match decode_inbound(&frame).unwrap() {
            TypedInboundMessage::Skip { discriminator } => {
                assert_eq!(discriminator, "server_tool_use");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn decodes_tool_permission_deny_request() {
        let frame = ProtocolFrame::new(json!({
            "type": "control_request",
            "request_id": "r1",
            "request": {"subtype": "can_use_tool", "tool_name": "Bash", "input": {"command": "rm -rf /"}}
        }));
        match decode_inbound(&frame).unwrap() {
            TypedInboundMessage::CanUseTool { request_id, tool_name, .. } => {
                assert_eq!(request_id, "r1");
                assert_eq!(tool_name, "Bash");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
