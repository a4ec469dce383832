use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::tool::ToolCallState;

pub const OUTPUT_BUFFER_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputLineKind {
    Text,
    Thinking,
    ToolStart,
    ToolResult,
    Status,
    Error,
    PlanReady,
    TurnEnd,
}

/// A persisted record of one [`crate::SemanticEvent`].
///
/// Tool-state fields are mutated in place by the Session Manager using
/// copy-on-write (clone, mutate, re-store) so readers deep-copying the buffer
/// never observe a torn update of `tool_state`/`tool_input`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputLine {
    pub kind: OutputLineKind,
    pub content: String,
    pub tool_id: Option<String>,
    pub tool_state: Option<ToolCallState>,
    pub duration_ms: Option<u64>,
    pub cost_usd: Option<f64>,
}

impl OutputLine {
    pub fn text(kind: OutputLineKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            tool_id: None,
            tool_state: None,
            duration_ms: None,
            cost_usd: None,
        }
    }
}

/// Appends `line` to `buffer` honouring the runtime's output-buffer rules:
///
/// 1. Tool-state copy-on-write — if `line` carries a `tool_id` that matches
///    an already-buffered line, that line is cloned, mutated with the new
///    content/state/duration/cost, and written back in place rather than
///    appended as a second line. This is how a `ToolStart` line becomes a
///    `complete`/`error` line in the buffer without doubling it.
/// 2. Streaming coalescing — if `line` is a `Text`/`Thinking` delta and the
///    previous buffered line is the same kind, the delta is appended to it
///    in place instead of growing the buffer (reduces render churn).
/// 3. Bounded FIFO — on overflow of [`OUTPUT_BUFFER_CAPACITY`] the oldest
///    line is dropped.
///
/// Used identically by the live Session Manager and the Replay Decoder so
/// both produce the same line sequence from the same event stream.
pub fn push_line(buffer: &mut VecDeque<OutputLine>, line: OutputLine) {
    if let Some(tool_id) = line.tool_id.clone() {
        if let Some(existing) = buffer
            .iter_mut()
            .rev()
            .find(|l| l.tool_id.as_deref() == Some(tool_id.as_str()))
        {
            let mut updated = existing.clone();
            if !line.content.is_empty() {
                updated.content = line.content;
            }
            if line.tool_state.is_some() {
                updated.tool_state = line.tool_state;
            }
            if line.duration_ms.is_some() {
                updated.duration_ms = line.duration_ms;
            }
            if line.cost_usd.is_some() {
                updated.cost_usd = line.cost_usd;
            }
            *existing = updated;
            return;
        }
    }

    let coalesces = matches!(line.kind, OutputLineKind::Text | OutputLineKind::Thinking);
    if coalesces {
        if let Some(last) = buffer.back_mut() {
            if last.kind == line.kind {
                last.content.push_str(&line.content);
                return;
            }
        }
    }
    buffer.push_back(line);
    while buffer.len() > OUTPUT_BUFFER_CAPACITY {
        buffer.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesces_consecutive_text_deltas() {
        let mut buf = VecDeque::new();
        push_line(&mut buf, OutputLine::text(OutputLineKind::Text, "hel"));
        push_line(&mut buf, OutputLine::text(OutputLineKind::Text, "lo"));
        push_line(&mut buf, OutputLine::text(OutputLineKind::Text, " world"));
        assert_eq!(buf.len(), 1);
        assert_eq!(buf[0].content, "hello world");
    }

    #[test]
    fn does_not_coalesce_across_kinds() {
        let mut buf = VecDeque::new();
        push_line(&mut buf, OutputLine::text(OutputLineKind::Text, "hi"));
        push_line(&mut buf, OutputLine::text(OutputLineKind::Status, "idle"));
        push_line(&mut buf, OutputLine::text(OutputLineKind::Text, "bye"));
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn drops_oldest_past_capacity() {
        let mut buf = VecDeque::new();
        for i in 0..OUTPUT_BUFFER_CAPACITY + 10 {
            push_line(
                &mut buf,
                OutputLine::text(OutputLineKind::Status, format!("s{i}")),
            );
        }
        assert_eq!(buf.len(), OUTPUT_BUFFER_CAPACITY);
        assert_eq!(buf.front().unwrap().content, "s10");
    }

    #[test]
    fn tool_completion_mutates_its_start_line_in_place() {
        let mut buf = VecDeque::new();
        let mut start = OutputLine::text(OutputLineKind::ToolStart, "Bash");
        start.tool_id = Some("t1".to_string());
        start.tool_state = Some(ToolCallState::Running);
        push_line(&mut buf, start);

        let mut complete = OutputLine::text(OutputLineKind::ToolResult, "a b c");
        complete.tool_id = Some("t1".to_string());
        complete.tool_state = Some(ToolCallState::Complete);
        push_line(&mut buf, complete);

        assert_eq!(buf.len(), 1);
        assert_eq!(buf[0].kind, OutputLineKind::ToolStart);
        assert_eq!(buf[0].content, "a b c");
        assert_eq!(buf[0].tool_state, Some(ToolCallState::Complete));
    }

    #[test]
    fn unrelated_tool_ids_stay_separate_lines() {
        let mut buf = VecDeque::new();
        let mut a = OutputLine::text(OutputLineKind::ToolStart, "Bash");
        a.tool_id = Some("a".to_string());
        push_line(&mut buf, a);
        let mut b = OutputLine::text(OutputLineKind::ToolStart, "Grep");
        b.tool_id = Some("b".to_string());
        push_line(&mut buf, b);
        assert_eq!(buf.len(), 2);
    }
}
