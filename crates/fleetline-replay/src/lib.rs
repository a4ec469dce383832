//! The Replay Decoder: re-feeds a recorded line-per-frame file through the
//! same [`fleetline_providers::Dialect`] + [`fleetline_runtime::Assembler`]
//! used by the live Session, producing the same [`fleetline_types::OutputLine`]
//! sequence the live run would have buffered.

pub mod error;
pub mod format;

pub use error::{Error, Result};
pub use format::RecordedFormat;

use std::collections::VecDeque;

use fleetline_providers::traits::dialect_by_name;
use fleetline_runtime::{to_output_line, Assembler};
use fleetline_types::{push_line, OutputLine, ProtocolFrame};

/// One line of a recorded log in the host-recorded envelope:
/// `{"timestamp": ..., "direction": "sent"|"received", "message": {...}}`.
#[derive(Debug, Clone, serde::Deserialize)]
struct RecordedLine {
    #[serde(default)]
    direction: Option<Direction>,
    message: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum Direction {
    Sent,
    Received,
}

/// Replays `contents` (the full text of a recorded log file, one JSON
/// object per line) into an `OutputLine` sequence, auto-detecting whether
/// each line is a raw agent frame or a host-recorded envelope and which
/// dialect produced it.
pub fn replay(contents: &str) -> Result<Vec<OutputLine>> {
    let format = format::detect(contents)?;
    let dialect_name = match &format {
        RecordedFormat::HostRecorded { dialect } | RecordedFormat::RawAgent { dialect } => {
            dialect.clone()
        }
    };
    let dialect = dialect_by_name(&dialect_name)
        .ok_or_else(|| Error::UnrecognisedFormat(format!("unknown dialect: {dialect_name}")))?;

    let mut assembler = Assembler::new();
    let mut buffer: VecDeque<OutputLine> = VecDeque::new();

    for raw_line in contents.lines() {
        let raw_line = raw_line.trim();
        if raw_line.is_empty() {
            continue;
        }
        let frame_value = match &format {
            RecordedFormat::HostRecorded { .. } => {
                let recorded: RecordedLine = match serde_json::from_str(raw_line) {
                    Ok(r) => r,
                    Err(_) => continue,
                };
                // Only frames the host *received* carry model output/requests
                // the live decoder would have processed; sent frames are the
                // host's own writes and aren't fed back through the decoder.
                if recorded.direction == Some(Direction::Sent) {
                    continue;
                }
                recorded.message
            }
            RecordedFormat::RawAgent { .. } => match serde_json::from_str(raw_line) {
                Ok(v) => v,
                Err(_) => continue,
            },
        };

        let frame = ProtocolFrame::new(frame_value);
        let message = match dialect.decode_inbound(&frame) {
            Ok(m) => m,
            Err(_) => continue,
        };
        if matches!(
            message,
            fleetline_providers::message::TypedInboundMessage::Skip { .. }
        ) {
            continue;
        }
        for event in assembler.feed(&message) {
            push_line(&mut buffer, to_output_line(&event));
        }
    }

    Ok(buffer.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_host_recorded_text_turn() {
        let log = concat!(
            r#"{"timestamp":"2026-01-01T00:00:00Z","direction":"received","message":{"type":"system","subtype":"init","session_id":"s1","model":"claude-sonnet-4-5"}}"#,
            "\n",
            r#"{"timestamp":"2026-01-01T00:00:01Z","direction":"received","message":{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"hel"}}}"#,
            "\n",
            r#"{"timestamp":"2026-01-01T00:00:02Z","direction":"received","message":{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"lo"}}}"#,
            "\n",
            r#"{"timestamp":"2026-01-01T00:00:03Z","direction":"sent","message":{"type":"user"}}"#,
        );
        let lines = replay(log).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].content, "hello");
    }

    #[test]
    fn replays_raw_claude_dialect() {
        let log = concat!(
            r#"{"type":"system","subtype":"init","session_id":"s1","model":"claude-sonnet-4-5"}"#,
            "\n",
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"hi"}}"#,
        );
        let lines = replay(log).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].content, "hi");
    }

    #[test]
    fn unrecognised_format_is_an_error() {
        let err = replay("not json at all").unwrap_err();
        assert!(matches!(err, Error::UnrecognisedFormat(_)));
    }
}
