use fleetline_types::TurnUsage;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentBlockKind {
    Text,
    Thinking,
    ToolUse,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaKind {
    Text,
    Thinking,
    InputJson,
}

/// A nested JSON-RPC 2.0 request carried inside an `mcp_message` frame.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn method_not_found(id: Value, method: &str) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code: -32601,
                message: format!("method not found: {method}"),
            }),
        }
    }
}

/// The decoder's agent-agnostic output: every dialect's frames are decoded
/// into this one set of variants before reaching the Stream Assembler or the
/// Request Correlator, so neither has to know which agent is talking.
#[derive(Debug, Clone)]
pub enum TypedInboundMessage {
    // --- model-output stream ---
    SessionStart {
        session_id: String,
        model: String,
    },
    MessageStart,
    ContentBlockStart {
        index: u32,
        kind: ContentBlockKind,
        tool_id: Option<String>,
        tool_name: Option<String>,
    },
    ContentBlockDelta {
        index: u32,
        kind: DeltaKind,
        text: String,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageDelta {
        stop_reason: Option<String>,
        usage: Option<TurnUsage>,
    },
    MessageStop,
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
    TurnResult {
        text: Option<String>,
        success: bool,
        usage: TurnUsage,
    },

    // --- inbound requests from the agent ---
    CanUseTool {
        request_id: String,
        tool_name: String,
        input: Value,
    },
    SetPermissionMode {
        request_id: String,
        mode: String,
    },
    Interrupt {
        request_id: String,
    },
    McpMessage {
        request_id: String,
        rpc: JsonRpcRequest,
    },
    GenericPermissionRequest {
        request_id: String,
        payload: Value,
    },

    // --- responses to outbound requests, correlated by id ---
    Response {
        request_id: String,
        payload: Value,
    },

    /// Unrecognised discriminator: logged once by the caller, then dropped.
    Skip {
        discriminator: String,
    },
}

/// Messages the host writes back to the agent. The Correlator and Session
/// turn-runner build these; each dialect encodes them to the wire shape the
/// agent expects.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    UserTurn {
        text: String,
    },
    ToolPermissionAllow {
        request_id: String,
        updated_input: Value,
        updated_permissions: Option<Value>,
    },
    ToolPermissionDeny {
        request_id: String,
        message: String,
        interrupt: bool,
    },
    McpResponse {
        request_id: String,
        rpc: JsonRpcResponse,
    },
    Interrupt {
        request_id: String,
    },
    SetPermissionMode {
        request_id: String,
        mode: String,
    },
    SetModel {
        request_id: String,
        model: String,
    },
}
