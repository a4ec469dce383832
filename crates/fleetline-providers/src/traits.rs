use crate::error::Result;
use crate::message::{OutboundMessage, TypedInboundMessage};
use fleetline_types::ProtocolFrame;

/// The capability set every per-agent decoder implements: decode a frame
/// read from the agent's stdout, and encode a message the host wants to
/// write to its stdin. One concrete type per wire protocol; they share no
/// code with each other, only this contract.
pub trait Dialect: Send + Sync {
    /// Stable identifier, matches `fleetline_types::AgentDialect::id`.
    fn id(&self) -> &'static str;

    /// Decode one inbound frame. Must never fail on an unrecognised
    /// discriminator — return `TypedInboundMessage::Skip` instead; this is
    /// what lets the Session continue after a frame it doesn't understand.
    fn decode_inbound(&self, frame: &ProtocolFrame) -> Result<TypedInboundMessage>;

    /// Encode a host-originated message into the wire frame this dialect expects.
    fn decode_outbound(&self, message: &OutboundMessage) -> Result<ProtocolFrame>;
}

/// Resolve a `Dialect` implementation by its stable id, mirroring the
/// by-name provider lookup the host-side CLI and Fix-Agent Engine both use
/// to pick a decoder/binary pair for a requested agent.
pub fn dialect_by_name(name: &str) -> Option<Box<dyn Dialect>> {
    match name {
        "claude" | "claude_code" | "claude-code" => Some(Box::new(crate::claude::ClaudeDialect)),
        "codex" => Some(Box::new(crate::codex::CodexDialect)),
        "gemini" => Some(Box::new(crate::gemini::GeminiDialect)),
        "cursor" => Some(Box::new(crate::cursor::CursorDialect)),
        _ => None,
    }
}
