mod decode;
mod encode;

use crate::error::Result;
use crate::message::{OutboundMessage, TypedInboundMessage};
use crate::traits::Dialect;
use fleetline_types::ProtocolFrame;

/// Cursor's agent-client-protocol style wire format, discriminated by
/// `sessionUpdate` rather than `type`. Thinner than [`crate::claude`]: no
/// MCP-over-JSON-RPC yet.
pub struct CursorDialect;

impl Dialect for CursorDialect {
    fn id(&self) -> &'static str {
        "cursor"
    }

    fn decode_inbound(&self, frame: &ProtocolFrame) -> Result<TypedInboundMessage> {
        decode::decode_inbound(frame)
    }

    fn decode_outbound(&self, message: &OutboundMessage) -> Result<ProtocolFrame> {
        encode::encode_outbound(message)
    }
}
