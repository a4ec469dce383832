mod decode;
mod encode;

use crate::error::Result;
use crate::message::{OutboundMessage, TypedInboundMessage};
use crate::traits::Dialect;
use fleetline_types::ProtocolFrame;

/// Codex's `submission`/`event` wire protocol. Thinner than [`crate::claude`]:
/// it decodes the model-output-stream and common inbound-request families
/// but does not yet speak MCP-over-JSON-RPC (recorded as an open question
/// in DESIGN.md rather than silently dropped).
pub struct CodexDialect;

impl Dialect for CodexDialect {
    fn id(&self) -> &'static str {
        "codex"
    }

    fn decode_inbound(&self, frame: &ProtocolFrame) -> Result<TypedInboundMessage> {
        decode::decode_inbound(frame)
    }

    fn decode_outbound(&self, message: &OutboundMessage) -> Result<ProtocolFrame> {
        encode::encode_outbound(message)
    }
}
