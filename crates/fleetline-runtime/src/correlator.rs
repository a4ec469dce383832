use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};

use fleetline_providers::message::{
    JsonRpcRequest, JsonRpcResponse, OutboundMessage, TypedInboundMessage,
};
use fleetline_providers::traits::Dialect;
use fleetline_types::{PendingRequest, PendingRequestKind};

use crate::error::{Error, Result};
use crate::supervisor::Supervisor;

/// Default bound on how long an outbound request may sit unanswered before
/// [`Correlator::sweep_timed_out`] evicts it with [`Error::CorrelationTimeout`].
pub const DEFAULT_CORRELATION_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// A handler's answer to `can_use_tool`. `updated_input` being `None` on
/// allow means "echo the original input", matching the wire requirement
/// that `updatedInput` is always a non-null object.
pub enum PermissionDecision {
    Allow {
        updated_input: Option<Value>,
        updated_permissions: Option<Value>,
    },
    Deny {
        message: String,
        interrupt: bool,
    },
}

#[async_trait]
pub trait ToolPermissionHandler: Send + Sync {
    async fn handle(&self, tool_name: &str, input: &Value) -> PermissionDecision;
}

#[async_trait]
pub trait McpHandler: Send + Sync {
    async fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse;
}

/// Denies every tool call; the default when an embedding application hasn't
/// wired up a real policy.
pub struct DenyAllPermissions;

#[async_trait]
impl ToolPermissionHandler for DenyAllPermissions {
    async fn handle(&self, _tool_name: &str, _input: &Value) -> PermissionDecision {
        PermissionDecision::Deny {
            message: "no permission handler configured".to_string(),
            interrupt: false,
        }
    }
}

/// Answers `initialize`/`tools/list`/`tools/call` against an in-process
/// registry; unknown methods get a JSON-RPC `-32601`. `tools/call` dispatch
/// to the host's own tools is out of this crate's scope — callers register
/// host tools via [`McpRegistry::register`].
#[derive(Default)]
pub struct McpRegistry {
    tools: HashMap<String, Value>,
}

impl McpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, schema: Value) {
        self.tools.insert(name.into(), schema);
    }
}

#[async_trait]
impl McpHandler for McpRegistry {
    async fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => JsonRpcResponse::ok(
                request.id,
                serde_json::json!({"protocolVersion": "2024-11-05", "capabilities": {"tools": {}}}),
            ),
            "tools/list" => {
                let tools: Vec<Value> = self
                    .tools
                    .iter()
                    .map(|(name, schema)| {
                        serde_json::json!({"name": name, "inputSchema": schema})
                    })
                    .collect();
                JsonRpcResponse::ok(request.id, serde_json::json!({"tools": tools}))
            }
            "tools/call" => {
                let name = request.params.get("name").and_then(Value::as_str);
                match name.and_then(|n| self.tools.get(n)) {
                    Some(_) => JsonRpcResponse::ok(
                        request.id,
                        serde_json::json!({"content": [], "isError": false}),
                    ),
                    None => JsonRpcResponse::method_not_found(request.id, "tools/call"),
                }
            }
            other => JsonRpcResponse::method_not_found(request.id, other),
        }
    }
}

type PendingMap = HashMap<String, (PendingRequest, oneshot::Sender<std::result::Result<Value, Error>>)>;

/// Dispatches inbound agent requests to handlers on spawned tasks (so a
/// slow handler can't stall the stdout reader), and tracks outbound host
/// requests by id until the matching `Response` frame arrives, the request
/// times out, or the session is stopped.
pub struct Correlator {
    dialect: Arc<dyn Dialect>,
    supervisor: Arc<Supervisor>,
    permission_handler: Arc<dyn ToolPermissionHandler>,
    mcp_handler: Arc<dyn McpHandler>,
    pending: Mutex<PendingMap>,
    correlation_timeout: std::time::Duration,
}

impl Correlator {
    pub fn new(
        dialect: Arc<dyn Dialect>,
        supervisor: Arc<Supervisor>,
        permission_handler: Arc<dyn ToolPermissionHandler>,
        mcp_handler: Arc<dyn McpHandler>,
    ) -> Arc<Self> {
        Self::with_timeout(
            dialect,
            supervisor,
            permission_handler,
            mcp_handler,
            DEFAULT_CORRELATION_TIMEOUT,
        )
    }

    /// As [`Correlator::new`], but with an explicit bound on how long an
    /// outbound request may sit unanswered before [`Error::CorrelationTimeout`].
    pub fn with_timeout(
        dialect: Arc<dyn Dialect>,
        supervisor: Arc<Supervisor>,
        permission_handler: Arc<dyn ToolPermissionHandler>,
        mcp_handler: Arc<dyn McpHandler>,
        correlation_timeout: std::time::Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            dialect,
            supervisor,
            permission_handler,
            mcp_handler,
            pending: Mutex::new(HashMap::new()),
            correlation_timeout,
        })
    }

    /// Route one decoded inbound message. Request-shaped variants are
    /// dispatched to a spawned task; `Response` resolves a pending outbound
    /// request directly (cheap enough not to need its own task). Everything
    /// else is the Assembler's concern and is ignored here.
    pub fn dispatch_inbound(self: &Arc<Self>, message: TypedInboundMessage) {
        match message {
            TypedInboundMessage::CanUseTool {
                request_id,
                tool_name,
                input,
            } => {
                let this = Arc::clone(self);
                tokio::spawn(async move { this.answer_can_use_tool(request_id, tool_name, input).await });
            }
            TypedInboundMessage::McpMessage { request_id, rpc } => {
                let this = Arc::clone(self);
                tokio::spawn(async move { this.answer_mcp(request_id, rpc).await });
            }
            TypedInboundMessage::Interrupt { request_id } => {
                let this = Arc::clone(self);
                tokio::spawn(async move { this.acknowledge(request_id).await });
            }
            TypedInboundMessage::SetPermissionMode { request_id, .. }
            | TypedInboundMessage::GenericPermissionRequest { request_id, .. } => {
                let this = Arc::clone(self);
                tokio::spawn(async move { this.acknowledge(request_id).await });
            }
            TypedInboundMessage::Response {
                request_id,
                payload,
            } => {
                let this = Arc::clone(self);
                tokio::spawn(async move { this.resolve(&request_id, Ok(payload)).await });
            }
            _ => {}
        }
    }

    async fn answer_can_use_tool(&self, request_id: String, tool_name: String, input: Value) {
        let decision = self.permission_handler.handle(&tool_name, &input).await;
        let message = match decision {
            PermissionDecision::Allow {
                updated_input,
                updated_permissions,
            } => OutboundMessage::ToolPermissionAllow {
                request_id,
                // The wire requires a non-null object; echo the original
                // input when the handler didn't supply one.
                updated_input: updated_input.unwrap_or(input),
                updated_permissions,
            },
            PermissionDecision::Deny { message, interrupt } => {
                OutboundMessage::ToolPermissionDeny {
                    request_id,
                    message,
                    interrupt,
                }
            }
        };
        self.write(&message).await;
    }

    async fn answer_mcp(&self, request_id: String, rpc: JsonRpcRequest) {
        let rpc_response = self.mcp_handler.handle(rpc).await;
        self.write(&OutboundMessage::McpResponse {
            request_id,
            rpc: rpc_response,
        })
        .await;
    }

    /// `set_permission_mode`/generic permission requests/`interrupt` from
    /// the agent just need a `control_response` acknowledgement; there's no
    /// decision to make at this layer.
    async fn acknowledge(&self, request_id: String) {
        self.write(&OutboundMessage::ToolPermissionAllow {
            request_id,
            updated_input: Value::Object(Default::default()),
            updated_permissions: None,
        })
        .await;
    }

    async fn write(&self, message: &OutboundMessage) {
        match self.dialect.decode_outbound(message) {
            Ok(frame) => {
                if let Ok(line) = frame.to_line() {
                    if let Err(err) = self.supervisor.write_frame(line.as_bytes()).await {
                        tracing::warn!(error = %err, "failed to write correlator reply");
                    }
                }
            }
            Err(err) => tracing::warn!(error = %err, "failed to encode correlator reply"),
        }
    }

    /// Allocate a fresh request-id, write the outbound frame, and await the
    /// matching response (or `Cancelled` once [`Correlator::cancel_all`]
    /// runs on session stop, or `CorrelationTimeout` once
    /// [`Correlator::sweep_timed_out`] evicts it for outliving
    /// `correlation_timeout`).
    pub async fn request(
        &self,
        kind: PendingRequestKind,
        request_id: String,
        message: OutboundMessage,
    ) -> Result<Value> {
        let (tx, rx) = oneshot::channel();
        let pending = PendingRequest::new(request_id.clone(), kind);
        self.pending.lock().await.insert(request_id, (pending, tx));
        self.write(&message).await;
        rx.await.map_err(|_| Error::Cancelled)?
    }

    async fn resolve(&self, request_id: &str, result: std::result::Result<Value, Error>) {
        if let Some((pending, tx)) = self.pending.lock().await.remove(request_id) {
            tracing::debug!(
                request_id = %pending.request_id,
                kind = pending.kind.method_name(),
                age_ms = pending.created_at.elapsed().as_millis() as u64,
                "resolved outbound request"
            );
            let _ = tx.send(result);
        }
    }

    /// On session stop: fail every outstanding outbound request with
    /// `Cancelled` rather than leaving its waiter parked forever.
    pub async fn cancel_all(&self) {
        let mut pending = self.pending.lock().await;
        for (_, (_, tx)) in pending.drain() {
            let _ = tx.send(Err(Error::Cancelled));
        }
    }

    /// Evict every outbound request whose `created_at` is older than
    /// `correlation_timeout`, resolving each with `Err(CorrelationTimeout)`.
    /// Callers are expected to invoke this periodically (the Session's
    /// turn-runner does so on each event-loop tick) so a request the agent
    /// never answers doesn't park its waiter forever.
    pub async fn sweep_timed_out(&self) {
        let mut pending = self.pending.lock().await;
        let timed_out: Vec<String> = pending
            .iter()
            .filter(|(_, (req, _))| req.created_at.elapsed() >= self.correlation_timeout)
            .map(|(id, _)| id.clone())
            .collect();
        for id in timed_out {
            if let Some((pending_req, tx)) = pending.remove(&id) {
                tracing::warn!(
                    request_id = %pending_req.request_id,
                    kind = pending_req.kind.method_name(),
                    "outbound request timed out"
                );
                let _ = tx.send(Err(Error::CorrelationTimeout));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcp_registry_lists_registered_tools() {
        let mut registry = McpRegistry::new();
        registry.register("search", serde_json::json!({"type": "object"}));
        assert_eq!(registry.tools.len(), 1);
    }

    #[tokio::test]
    async fn unknown_mcp_method_is_method_not_found() {
        let registry = McpRegistry::new();
        let response = registry
            .handle(JsonRpcRequest {
                jsonrpc: "2.0".to_string(),
                id: serde_json::json!(1),
                method: "nonexistent".to_string(),
                params: Value::Null,
            })
            .await;
        assert_eq!(response.error.unwrap().code, -32601);
    }

    fn test_correlator(timeout: std::time::Duration) -> Arc<Correlator> {
        let dialect: Arc<dyn Dialect> = fleetline_providers::traits::dialect_by_name("claude")
            .unwrap()
            .into();
        let supervisor = Arc::new(Supervisor::new(fleetline_core::config::StopTimeline::default()));
        Correlator::with_timeout(
            dialect,
            supervisor,
            Arc::new(DenyAllPermissions),
            Arc::new(McpRegistry::new()),
            timeout,
        )
    }

    #[tokio::test]
    async fn sweep_evicts_requests_older_than_the_timeout() {
        let correlator = test_correlator(std::time::Duration::from_millis(1));
        let request = tokio::spawn({
            let correlator = Arc::clone(&correlator);
            async move {
                correlator
                    .request(
                        PendingRequestKind::Interrupt,
                        "req-1".to_string(),
                        OutboundMessage::Interrupt { request_id: "req-1".to_string() },
                    )
                    .await
            }
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        correlator.sweep_timed_out().await;
        let result = request.await.unwrap();
        assert!(matches!(result, Err(Error::CorrelationTimeout)));
    }

    #[tokio::test]
    async fn sweep_leaves_fresh_requests_pending() {
        let correlator = test_correlator(std::time::Duration::from_secs(30));
        let request = tokio::spawn({
            let correlator = Arc::clone(&correlator);
            async move {
                correlator
                    .request(
                        PendingRequestKind::Interrupt,
                        "req-2".to_string(),
                        OutboundMessage::Interrupt { request_id: "req-2".to_string() },
                    )
                    .await
            }
        });
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        correlator.sweep_timed_out().await;
        correlator.resolve("req-2", Ok(Value::Null)).await;
        let result = request.await.unwrap();
        assert!(result.is_ok());
    }
}
