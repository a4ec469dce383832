use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallState {
    Running,
    Complete,
    Error,
}

impl ToolCallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ToolCallState::Complete | ToolCallState::Error)
    }
}

/// A single tool invocation observed on the agent's stdio stream.
///
/// Created on first observed start for an `id`; mutated at most once into a
/// terminal state via [`ToolCall::complete`] or [`ToolCall::fail`], which are
/// the only mutation sites and the only places the terminal-duration
/// invariant needs enforcing.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
    pub state: ToolCallState,
    pub started_at: Instant,
    pub duration: Option<Duration>,
    pub result: Option<String>,
}

impl ToolCall {
    pub fn start(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
            state: ToolCallState::Running,
            started_at: Instant::now(),
            duration: None,
            result: None,
        }
    }

    pub fn complete(&mut self, result: impl Into<String>) {
        self.state = ToolCallState::Complete;
        self.duration = Some(self.started_at.elapsed());
        self.result = Some(result.into());
    }

    pub fn fail(&mut self, result: impl Into<String>) {
        self.state = ToolCallState::Error;
        self.duration = Some(self.started_at.elapsed());
        self.result = Some(result.into());
    }
}
