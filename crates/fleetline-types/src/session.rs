use crate::usage::TurnUsage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Planner,
    Builder,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Planner => "planner",
            SessionType::Builder => "builder",
        }
    }
}

/// `pending -> running <-> idle -> completed`, with `failed`/`stopped` reachable
/// from any non-terminal state. `completed`, `failed` and `stopped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Running,
    Idle,
    Completed,
    Failed,
    Stopped,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Stopped
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Running => "running",
            SessionStatus::Idle => "idle",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Stopped => "stopped",
        }
    }
}

/// A running-or-finished agent session, owned exclusively by one Process
/// Supervisor until teardown. `started_at` is set once status reaches
/// `Running`; `completed_at` is set iff status is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub prompt: String,
    pub model: String,
    pub work_dir: String,
    pub progress: TurnUsage,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        session_type: SessionType,
        prompt: impl Into<String>,
        model: impl Into<String>,
        work_dir: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            session_type,
            status: SessionStatus::Pending,
            prompt: prompt.into(),
            model: model.into(),
            work_dir: work_dir.into(),
            progress: TurnUsage::default(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }
}
