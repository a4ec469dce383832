mod decode;
mod encode;

pub use decode::*;

use crate::error::Result;
use crate::message::{OutboundMessage, TypedInboundMessage};
use crate::traits::Dialect;
use fleetline_types::ProtocolFrame;

/// Claude Code's `stream-json` wire protocol: `content_block_*`/`message_*`
/// events for model output, `control_request`/`control_response` for tool
/// permission and MCP.
pub struct ClaudeDialect;

impl Dialect for ClaudeDialect {
    fn id(&self) -> &'static str {
        "claude"
    }

    fn decode_inbound(&self, frame: &ProtocolFrame) -> Result<TypedInboundMessage> {
        decode::decode_inbound(frame)
    }

    fn decode_outbound(&self, message: &OutboundMessage) -> Result<ProtocolFrame> {
        encode::encode_outbound(message)
    }
}
