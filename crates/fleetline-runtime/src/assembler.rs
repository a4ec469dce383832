use std::collections::HashMap;

use fleetline_providers::message::{ContentBlockKind, DeltaKind, TypedInboundMessage};
use fleetline_types::{SemanticEvent, TurnUsage};

/// Per-content-block scratch state for one open turn.
#[derive(Debug, Default)]
struct BlockState {
    kind: Option<ContentBlockKind>,
    tool_id: Option<String>,
    tool_name: Option<String>,
    json_buffer: String,
}

/// Accumulates streaming deltas into semantic events. One instance per
/// Session; owns no I/O, fed already-decoded [`TypedInboundMessage`]s by
/// the Protocol Decoder. The live runtime and the Replay Decoder both drive
/// a fresh `Assembler` over the same message stream, so both produce the
/// same event sequence.
#[derive(Default)]
pub struct Assembler {
    blocks: HashMap<u32, BlockState>,
    saw_text: bool,
    saw_thinking: bool,
    turn_number: u32,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one decoded message, returning zero or more semantic events it
    /// produces. Most inbound-request variants (`CanUseTool`, `McpMessage`,
    /// ...) are not this layer's concern and yield nothing here — the
    /// Correlator handles those directly.
    pub fn feed(&mut self, message: &TypedInboundMessage) -> Vec<SemanticEvent> {
        match message {
            TypedInboundMessage::SessionStart { session_id, model } => {
                vec![SemanticEvent::SessionReady {
                    session_id: session_id.clone(),
                    model: model.clone(),
                }]
            }
            TypedInboundMessage::MessageStart => {
                self.blocks.clear();
                self.saw_text = false;
                self.saw_thinking = false;
                vec![]
            }
            TypedInboundMessage::ContentBlockStart {
                index,
                kind,
                tool_id,
                tool_name,
            } => {
                self.blocks.insert(
                    *index,
                    BlockState {
                        kind: Some(*kind),
                        tool_id: tool_id.clone(),
                        tool_name: tool_name.clone(),
                        json_buffer: String::new(),
                    },
                );
                vec![]
            }
            TypedInboundMessage::ContentBlockDelta { index, kind, text } => {
                self.on_delta(*index, kind, text)
            }
            TypedInboundMessage::ContentBlockStop { index } => self.on_block_stop(*index),
            TypedInboundMessage::MessageDelta { .. } | TypedInboundMessage::MessageStop => {
                vec![]
            }
            TypedInboundMessage::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => vec![SemanticEvent::ToolComplete {
                id: tool_use_id.clone(),
                // The tool's name isn't repeated on the result frame; the
                // Session fills it in from the ToolCall it's tracking.
                name: String::new(),
                input: serde_json::Value::Null,
                result: content.clone(),
                is_error: *is_error,
            }],
            TypedInboundMessage::TurnResult {
                text,
                success,
                usage,
            } => self.on_turn_result(text.as_deref(), *success, *usage),
            _ => vec![],
        }
    }

    fn on_delta(&mut self, index: u32, kind: &DeltaKind, text: &str) -> Vec<SemanticEvent> {
        // Each index's accumulator is independent, so overlapping indices
        // before a stop can't corrupt one another.
        let block = self.blocks.entry(index).or_default();
        match kind {
            DeltaKind::Text => {
                if text.trim().is_empty() {
                    return vec![];
                }
                self.saw_text = true;
                vec![SemanticEvent::TextDelta {
                    text: text.to_string(),
                }]
            }
            DeltaKind::Thinking => {
                if text.trim().is_empty() {
                    return vec![];
                }
                self.saw_thinking = true;
                vec![SemanticEvent::ReasoningDelta {
                    text: text.to_string(),
                }]
            }
            DeltaKind::InputJson => {
                block.json_buffer.push_str(text);
                vec![]
            }
        }
    }

    fn on_block_stop(&mut self, index: u32) -> Vec<SemanticEvent> {
        let Some(block) = self.blocks.get(&index) else {
            return vec![];
        };
        if block.kind != Some(ContentBlockKind::ToolUse) {
            return vec![];
        }
        let input = if block.json_buffer.is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(&block.json_buffer).unwrap_or(serde_json::Value::Null)
        };
        vec![SemanticEvent::ToolStart {
            id: block.tool_id.clone().unwrap_or_default(),
            name: block.tool_name.clone().unwrap_or_default(),
            input,
        }]
    }

    /// `turn/result` closes the turn. Tie-break rule:
    /// fallback synthesis of a text/reasoning event from the result payload
    /// is suppressed if the live path already emitted non-whitespace content
    /// of that kind this turn.
    fn on_turn_result(
        &mut self,
        text: Option<&str>,
        success: bool,
        usage: TurnUsage,
    ) -> Vec<SemanticEvent> {
        self.turn_number += 1;
        let mut events = Vec::new();
        if !self.saw_text {
            if let Some(text) = text {
                if !text.trim().is_empty() {
                    events.push(SemanticEvent::TextDelta {
                        text: text.to_string(),
                    });
                }
            }
        }
        events.push(SemanticEvent::TurnComplete {
            turn_number: self.turn_number,
            success,
            duration_ms: 0,
            usage,
        });
        events
    }

    pub fn saw_text_this_turn(&self) -> bool {
        self.saw_text
    }

    pub fn saw_thinking_this_turn(&self) -> bool {
        self.saw_thinking
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetline_providers::message::TypedInboundMessage as M;
    use serde_json::json;

    #[test]
    fn text_deltas_emit_delta_only() {
        let mut asm = Assembler::new();
        let out = asm.feed(&M::ContentBlockDelta {
            index: 0,
            kind: DeltaKind::Text,
            text: "hel".to_string(),
        });
        match &out[0] {
            SemanticEvent::TextDelta { text } => assert_eq!(text, "hel"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn whitespace_only_delta_dropped() {
        let mut asm = Assembler::new();
        let out = asm.feed(&M::ContentBlockDelta {
            index: 0,
            kind: DeltaKind::Text,
            text: "   ".to_string(),
        });
        assert!(out.is_empty());
    }

    #[test]
    fn tool_use_accumulates_json_then_emits_on_stop() {
        let mut asm = Assembler::new();
        asm.feed(&M::ContentBlockStart {
            index: 1,
            kind: ContentBlockKind::ToolUse,
            tool_id: Some("t1".to_string()),
            tool_name: Some("Bash".to_string()),
        });
        for chunk in ["{", "\"command\":", "\"ls\"", "}"] {
            let out = asm.feed(&M::ContentBlockDelta {
                index: 1,
                kind: DeltaKind::InputJson,
                text: chunk.to_string(),
            });
            assert!(out.is_empty());
        }
        let out = asm.feed(&M::ContentBlockStop { index: 1 });
        match &out[0] {
            SemanticEvent::ToolStart { id, name, input } => {
                assert_eq!(id, "t1");
                assert_eq!(name, "Bash");
                assert_eq!(input, &json!({"command": "ls"}));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn fallback_suppressed_once_live_text_seen() {
        let mut asm = Assembler::new();
        asm.feed(&M::ContentBlockDelta {
            index: 0,
            kind: DeltaKind::Text,
            text: "hello".to_string(),
        });
        let out = asm.feed(&M::TurnResult {
            text: Some("hello (summary)".to_string()),
            success: true,
            usage: TurnUsage::default(),
        });
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], SemanticEvent::TurnComplete { .. }));
    }

    #[test]
    fn fallback_synthesises_when_no_live_text() {
        let mut asm = Assembler::new();
        let out = asm.feed(&M::TurnResult {
            text: Some("hello world".to_string()),
            success: true,
            usage: TurnUsage::default(),
        });
        assert_eq!(out.len(), 2);
        match &out[0] {
            SemanticEvent::TextDelta { text } => assert_eq!(text, "hello world"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn overlapping_indices_stay_independent() {
        let mut asm = Assembler::new();
        asm.feed(&M::ContentBlockStart {
            index: 0,
            kind: ContentBlockKind::ToolUse,
            tool_id: Some("a".to_string()),
            tool_name: Some("A".to_string()),
        });
        asm.feed(&M::ContentBlockStart {
            index: 1,
            kind: ContentBlockKind::ToolUse,
            tool_id: Some("b".to_string()),
            tool_name: Some("B".to_string()),
        });
        asm.feed(&M::ContentBlockDelta {
            index: 0,
            kind: DeltaKind::InputJson,
            text: "{\"x\":1}".to_string(),
        });
        asm.feed(&M::ContentBlockDelta {
            index: 1,
            kind: DeltaKind::InputJson,
            text: "{\"y\":2}".to_string(),
        });
        let out0 = asm.feed(&M::ContentBlockStop { index: 0 });
        let out1 = asm.feed(&M::ContentBlockStop { index: 1 });
        match &out0[0] {
            SemanticEvent::ToolStart { id, input, .. } => {
                assert_eq!(id, "a");
                assert_eq!(input, &json!({"x": 1}));
            }
            other => panic!("unexpected: {other:?}"),
        }
        match &out1[0] {
            SemanticEvent::ToolStart { id, input, .. } => {
                assert_eq!(id, "b");
                assert_eq!(input, &json!({"y": 2}));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
