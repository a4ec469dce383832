use crate::error::{Error, Result};
use crate::message::OutboundMessage;
use fleetline_types::ProtocolFrame;
use serde_json::json;

pub fn encode_outbound(message: &OutboundMessage) -> Result<ProtocolFrame> {
    let value = match message {
        OutboundMessage::UserTurn { text } => json!({
            "sessionUpdate": "user_message",
            "content": {"type": "text", "text": text},
        }),
        OutboundMessage::ToolPermissionAllow {
            request_id,
            updated_input,
            ..
        } => json!({
            "sessionUpdate": "permission_response",
            "requestId": request_id,
            "outcome": {"outcome": "selected", "optionId": "allow"},
            "updatedInput": updated_input,
        }),
        OutboundMessage::ToolPermissionDeny {
            request_id,
            message,
            ..
        } => json!({
            "sessionUpdate": "permission_response",
            "requestId": request_id,
            "outcome": {"outcome": "selected", "optionId": "deny"},
            "reason": message,
        }),
        OutboundMessage::Interrupt { request_id } => json!({
            "sessionUpdate": "cancel",
            "requestId": request_id,
        }),
        OutboundMessage::SetModel { model, .. } => json!({
            "sessionUpdate": "set_model",
            "model": model,
        }),
        OutboundMessage::McpResponse { .. } | OutboundMessage::SetPermissionMode { .. } => {
            return Err(Error::Unsupported(
                "cursor dialect does not speak MCP or permission-mode switching".to_string(),
            ))
        }
    };
    Ok(ProtocolFrame::new(value))
}
