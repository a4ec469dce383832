//! Assertions over the runtime's public event/output types, shared by the
//! scenario tests that drive a real [`crate::fake_agent_binary`] process.

use fleetline_types::{OutputLine, OutputLineKind, SemanticEvent, TurnUsage};

/// Concatenation of every observed `TextDelta`, for checking against the
/// `result` text of a turn once it completes.
pub fn concat_text_deltas(events: &[SemanticEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            SemanticEvent::TextDelta { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

pub fn find_tool_start<'a>(events: &'a [SemanticEvent], id: &str) -> Option<&'a SemanticEvent> {
    events
        .iter()
        .find(|e| matches!(e, SemanticEvent::ToolStart { id: tool_id, .. } if tool_id == id))
}

pub fn find_tool_complete<'a>(events: &'a [SemanticEvent], id: &str) -> Option<&'a SemanticEvent> {
    events
        .iter()
        .find(|e| matches!(e, SemanticEvent::ToolComplete { id: tool_id, .. } if tool_id == id))
}

pub fn turn_complete_usage(events: &[SemanticEvent]) -> Option<&TurnUsage> {
    events.iter().find_map(|e| match e {
        SemanticEvent::TurnComplete { usage, .. } => Some(usage),
        _ => None,
    })
}

/// The output line carrying `tool_id`, regardless of whether it was
/// mutated in place from a `ToolStart` or freshly appended.
pub fn find_output_tool_line<'a>(lines: &'a [OutputLine], tool_id: &str) -> Option<&'a OutputLine> {
    lines.iter().find(|l| l.tool_id.as_deref() == Some(tool_id))
}

pub fn lines_of_kind(lines: &[OutputLine], kind: OutputLineKind) -> Vec<&OutputLine> {
    lines.iter().filter(|l| l.kind == kind).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetline_types::OutputLineKind;

    #[test]
    fn lines_of_kind_filters_by_kind() {
        let lines = vec![
            OutputLine::text(OutputLineKind::Text, "a"),
            OutputLine::text(OutputLineKind::Status, "b"),
        ];
        assert_eq!(lines_of_kind(&lines, OutputLineKind::Text).len(), 1);
    }

    #[test]
    fn find_output_tool_line_matches_by_id() {
        let mut line = OutputLine::text(OutputLineKind::ToolStart, "Bash");
        line.tool_id = Some("t1".to_string());
        let lines = vec![line];
        assert!(find_output_tool_line(&lines, "t1").is_some());
        assert!(find_output_tool_line(&lines, "t2").is_none());
    }
}
