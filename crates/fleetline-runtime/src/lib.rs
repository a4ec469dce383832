//! The Session Runtime: process supervision, wire codec, stream assembly,
//! request correlation, the Session state machine and the Session Manager.

pub mod assembler;
pub mod codec;
pub mod correlator;
pub mod error;
pub mod manager;
pub mod session;
pub mod supervisor;

pub use assembler::Assembler;
pub use codec::{LineReader, EOF};
pub use correlator::{
    Correlator, DenyAllPermissions, McpHandler, McpRegistry, PermissionDecision,
    ToolPermissionHandler,
};
pub use error::{Error, Result};
pub use manager::{
    to_output_line, JsonlSessionStore, ManagerConfig, ManagerEvent, SessionManager, SessionStore,
};
pub use session::{Session, SessionConfig};
pub use supervisor::{StartedStreams, Supervisor};
