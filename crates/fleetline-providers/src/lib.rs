//! Per-agent wire protocol decoders.
//!
//! One module per dialect, sharing no code with its siblings; all expose
//! the same [`traits::Dialect`] capability set and decode into the
//! agent-agnostic [`message::TypedInboundMessage`].

pub mod claude;
pub mod codex;
pub mod cursor;
pub mod error;
pub mod gemini;
pub mod message;
pub mod traits;

pub use error::{Error, Result};
pub use message::{
    ContentBlockKind, DeltaKind, JsonRpcError, JsonRpcRequest, JsonRpcResponse, OutboundMessage,
    TypedInboundMessage,
};
pub use traits::{dialect_by_name, Dialect};
