mod decode;
mod encode;

use crate::error::Result;
use crate::message::{OutboundMessage, TypedInboundMessage};
use crate::traits::Dialect;
use fleetline_types::ProtocolFrame;

/// Gemini CLI's `serverMessage`-wrapped wire protocol. Thinner than
/// [`crate::claude`]: decodes the model-output-stream and common
/// inbound-request families, no MCP-over-JSON-RPC yet.
pub struct GeminiDialect;

impl Dialect for GeminiDialect {
    fn id(&self) -> &'static str {
        "gemini"
    }

    fn decode_inbound(&self, frame: &ProtocolFrame) -> Result<TypedInboundMessage> {
        decode::decode_inbound(frame)
    }

    fn decode_outbound(&self, message: &OutboundMessage) -> Result<ProtocolFrame> {
        encode::encode_outbound(message)
    }
}
