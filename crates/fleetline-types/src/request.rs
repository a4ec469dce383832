use std::time::Instant;

/// Kinds of request the host can issue to an agent subprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingRequestKind {
    Interrupt,
    SetPermissionMode,
    SetModel,
}

impl PendingRequestKind {
    pub fn method_name(&self) -> &'static str {
        match self {
            PendingRequestKind::Interrupt => "interrupt",
            PendingRequestKind::SetPermissionMode => "set_permission_mode",
            PendingRequestKind::SetModel => "set_model",
        }
    }
}

/// Bookkeeping the Correlator holds for one outbound request until the
/// matching response arrives or the session ends. The resolver itself is a
/// `tokio::sync::oneshot::Sender` owned by `fleetline-runtime`; this type
/// carries only the data that is agent/transport agnostic.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub request_id: String,
    pub kind: PendingRequestKind,
    pub created_at: Instant,
}

impl PendingRequest {
    pub fn new(request_id: impl Into<String>, kind: PendingRequestKind) -> Self {
        Self {
            request_id: request_id.into(),
            kind,
            created_at: Instant::now(),
        }
    }
}
