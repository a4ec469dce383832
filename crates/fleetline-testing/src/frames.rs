//! Builders for wire-accurate per-dialect frames, so scenario tests read as
//! "what the agent said" rather than hand-assembled JSON. Shapes mirror
//! exactly what each dialect's decoder in `fleetline-providers` expects.

use serde_json::{json, Value};

pub mod claude {
    use super::*;

    pub fn session_start(session_id: &str, model: &str) -> Value {
        json!({"type": "system", "subtype": "init", "session_id": session_id, "model": model})
    }

    pub fn message_start() -> Value {
        json!({"type": "message_start"})
    }

    pub fn text_block_start(index: u32) -> Value {
        json!({"type": "content_block_start", "index": index, "content_block": {"type": "text"}})
    }

    pub fn thinking_block_start(index: u32) -> Value {
        json!({"type": "content_block_start", "index": index, "content_block": {"type": "thinking"}})
    }

    pub fn tool_use_block_start(index: u32, tool_id: &str, name: &str) -> Value {
        json!({
            "type": "content_block_start",
            "index": index,
            "content_block": {"type": "tool_use", "id": tool_id, "name": name}
        })
    }

    pub fn text_delta(index: u32, text: &str) -> Value {
        json!({"type": "content_block_delta", "index": index, "delta": {"type": "text_delta", "text": text}})
    }

    pub fn thinking_delta(index: u32, text: &str) -> Value {
        json!({"type": "content_block_delta", "index": index, "delta": {"type": "thinking_delta", "thinking": text}})
    }

    pub fn input_json_delta(index: u32, partial_json: &str) -> Value {
        json!({
            "type": "content_block_delta",
            "index": index,
            "delta": {"type": "input_json_delta", "partial_json": partial_json}
        })
    }

    pub fn block_stop(index: u32) -> Value {
        json!({"type": "content_block_stop", "index": index})
    }

    pub fn message_stop() -> Value {
        json!({"type": "message_stop"})
    }

    pub fn tool_result(tool_use_id: &str, content: &str, is_error: bool) -> Value {
        json!({
            "type": "user",
            "message": {
                "content": [{
                    "type": "tool_result",
                    "tool_use_id": tool_use_id,
                    "content": content,
                    "is_error": is_error,
                }]
            }
        })
    }

    pub fn turn_result(
        text: &str,
        success: bool,
        input_tokens: u64,
        output_tokens: u64,
        cost_usd: f64,
    ) -> Value {
        json!({
            "type": "result",
            "result": text,
            "is_error": !success,
            "usage": {"input_tokens": input_tokens, "output_tokens": output_tokens},
            "total_cost_usd": cost_usd,
        })
    }

    pub fn control_request_can_use_tool(request_id: &str, tool_name: &str, input: Value) -> Value {
        json!({
            "type": "control_request",
            "request_id": request_id,
            "request": {"subtype": "can_use_tool", "tool_name": tool_name, "input": input}
        })
    }

    /// An unrecognised frame shape, used to verify the decoder's `Skip`
    /// tolerance path rather than erroring the session.
    pub fn unknown_frame() -> Value {
        json!({"type": "server_tool_use", "payload": "opaque"})
    }
}

pub mod codex {
    use super::*;

    pub fn session_start(session_id: &str, model: &str) -> Value {
        json!({"type": "session_configured", "session_id": session_id, "model": model})
    }

    pub fn text_delta(text: &str) -> Value {
        json!({"type": "agent_message_delta", "delta": text})
    }

    pub fn task_complete(last_agent_message: &str, input_tokens: u64, output_tokens: u64) -> Value {
        json!({
            "type": "task_complete",
            "last_agent_message": last_agent_message,
            "token_usage": {"input_tokens": input_tokens, "output_tokens": output_tokens},
        })
    }
}
