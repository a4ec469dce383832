//! Shared domain types for the fleetline session runtime and Fix-Agent Engine.

pub mod dialect;
pub mod event;
pub mod frame;
pub mod issue;
pub mod output;
pub mod request;
pub mod session;
pub mod tool;
pub mod usage;

pub use dialect::AgentDialect;
pub use event::SemanticEvent;
pub use frame::ProtocolFrame;
pub use issue::{FixAttempt, IssueGroup, IssueStatus, RunUnit};
pub use output::{push_line, OutputLine, OutputLineKind};
pub use request::{PendingRequest, PendingRequestKind};
pub use session::{Session, SessionStatus, SessionType};
pub use tool::{ToolCall, ToolCallState};
pub use usage::TurnUsage;
