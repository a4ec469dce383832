use crate::usage::TurnUsage;
use serde_json::Value;

/// The runtime's public event type, one stream per Session.
///
/// Ordering within a single session is the order produced by the agent;
/// cross-session order is undefined. Closed set: new frame families are
/// added to the decoder, not by growing this enum silently, so it is marked
/// `non_exhaustive` to force match arms at call sites to be revisited.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SemanticEvent {
    SessionReady {
        session_id: String,
        model: String,
    },
    TextDelta {
        text: String,
    },
    ReasoningDelta {
        text: String,
    },
    ToolStart {
        id: String,
        name: String,
        input: Value,
    },
    ToolComplete {
        id: String,
        name: String,
        input: Value,
        result: String,
        is_error: bool,
    },
    TurnComplete {
        turn_number: u32,
        success: bool,
        duration_ms: u64,
        usage: TurnUsage,
    },
    Error {
        err: String,
        context: String,
    },
}
