use crate::error::Result;
use crate::message::OutboundMessage;
use fleetline_types::ProtocolFrame;
use serde_json::{json, Value};

/// Mirror image of `decode::decode_control_request`/`decode_control_response`:
/// every outbound frame this dialect writes is either a `user` turn or a
/// `control_response`/`control_request` envelope with the same `request_id`
/// placement the inbound decoder reads from.
pub fn encode_outbound(message: &OutboundMessage) -> Result<ProtocolFrame> {
    let value = match message {
        OutboundMessage::UserTurn { text } => json!({
            "type": "user",
            "message": {
                "role": "user",
                "content": [{"type": "text", "text": text}],
            },
        }),
        OutboundMessage::ToolPermissionAllow {
            request_id,
            updated_input,
            updated_permissions,
        } => control_response(
            request_id,
            json!({
                "behavior": "allow",
                "updatedInput": updated_input,
                "updatedPermissions": updated_permissions,
            }),
        ),
        OutboundMessage::ToolPermissionDeny {
            request_id,
            message,
            interrupt,
        } => control_response(
            request_id,
            json!({
                "behavior": "deny",
                "message": message,
                "interrupt": interrupt,
            }),
        ),
        OutboundMessage::McpResponse { request_id, rpc } => {
            control_response(request_id, serde_json::to_value(rpc)?)
        }
        OutboundMessage::Interrupt { request_id } => {
            control_request(request_id, "interrupt", Value::Object(Default::default()))
        }
        OutboundMessage::SetPermissionMode { request_id, mode } => {
            control_request(request_id, "set_permission_mode", json!({"mode": mode}))
        }
        OutboundMessage::SetModel { request_id, model } => {
            control_request(request_id, "set_model", json!({"model": model}))
        }
    };
    Ok(ProtocolFrame::new(value))
}

fn control_response(request_id: &str, payload: Value) -> Value {
    json!({
        "type": "control_response",
        "response": {
            "subtype": "success",
            "request_id": request_id,
            "response": payload,
        },
    })
}

fn control_request(request_id: &str, subtype: &str, mut payload: Value) -> Value {
    if let Value::Object(map) = &mut payload {
        map.insert("subtype".to_string(), Value::String(subtype.to_string()));
    }
    json!({
        "type": "control_request",
        "request_id": request_id,
        "request": payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_echoes_updated_input() {
        let frame = encode_outbound(&OutboundMessage::ToolPermissionAllow {
            request_id: "r1".to_string(),
            updated_input: json!({"command": "ls"}),
            updated_permissions: None,
        })
        .unwrap();
        let value = frame.into_value();
        assert_eq!(
            value["response"]["response"]["updatedInput"],
            json!({"command": "ls"})
        );
    }

    #[test]
    fn user_turn_wraps_text_content() {
        let frame = encode_outbound(&OutboundMessage::UserTurn {
            text: "hello".to_string(),
        })
        .unwrap();
        let value = frame.into_value();
        assert_eq!(value["message"]["content"][0]["text"], "hello");
    }
}
