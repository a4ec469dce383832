use crate::error::{Error, Result};
use crate::message::OutboundMessage;
use fleetline_types::ProtocolFrame;
use serde_json::json;

pub fn encode_outbound(message: &OutboundMessage) -> Result<ProtocolFrame> {
    let value = match message {
        OutboundMessage::UserTurn { text } => json!({
            "type": "send_message",
            "value": {"text": text},
        }),
        OutboundMessage::ToolPermissionAllow {
            request_id,
            updated_input,
            ..
        } => json!({
            "type": "user_confirmation_response",
            "value": {"requestId": request_id, "outcome": "proceed_once", "updatedInput": updated_input},
        }),
        OutboundMessage::ToolPermissionDeny {
            request_id,
            message,
            ..
        } => json!({
            "type": "user_confirmation_response",
            "value": {"requestId": request_id, "outcome": "cancel", "reason": message},
        }),
        OutboundMessage::Interrupt { request_id } => json!({
            "type": "interrupt",
            "value": {"requestId": request_id},
        }),
        OutboundMessage::SetModel { model, .. } => json!({
            "type": "set_model",
            "value": {"model": model},
        }),
        OutboundMessage::McpResponse { .. } | OutboundMessage::SetPermissionMode { .. } => {
            return Err(Error::Unsupported(
                "gemini dialect does not speak MCP or permission-mode switching".to_string(),
            ))
        }
    };
    Ok(ProtocolFrame::new(value))
}
