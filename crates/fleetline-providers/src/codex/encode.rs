use crate::error::{Error, Result};
use crate::message::OutboundMessage;
use fleetline_types::ProtocolFrame;
use serde_json::json;

/// Codex does not speak MCP; permission and `set_model` frames are encoded
/// as best-effort mappings onto its `op`/`submission` shape, matching only
/// what the model-output-stream + common-request families need.
pub fn encode_outbound(message: &OutboundMessage) -> Result<ProtocolFrame> {
    let value = match message {
        OutboundMessage::UserTurn { text } => json!({
            "op": "user_input",
            "items": [{"type": "text", "text": text}],
        }),
        OutboundMessage::ToolPermissionAllow {
            request_id,
            updated_input,
            ..
        } => json!({
            "op": "permission_response",
            "request_id": request_id,
            "decision": "approved",
            "updated_input": updated_input,
        }),
        OutboundMessage::ToolPermissionDeny {
            request_id,
            message,
            ..
        } => json!({
            "op": "permission_response",
            "request_id": request_id,
            "decision": "denied",
            "reason": message,
        }),
        OutboundMessage::Interrupt { request_id } => json!({
            "op": "interrupt",
            "request_id": request_id,
        }),
        OutboundMessage::SetModel { model, .. } => json!({
            "op": "override_turn_context",
            "model": model,
        }),
        OutboundMessage::McpResponse { .. } | OutboundMessage::SetPermissionMode { .. } => {
            return Err(Error::Unsupported(
                "codex dialect does not speak MCP or permission-mode switching".to_string(),
            ))
        }
    };
    Ok(ProtocolFrame::new(value))
}
