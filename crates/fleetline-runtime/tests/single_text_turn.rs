mod support;

use std::time::Duration;

use fleetline_testing::frames::claude;
use fleetline_testing::{assertions, Script};
use fleetline_types::OutputLineKind;

/// Scenario 1: a single turn streaming plain text ends with the
/// concatenation of its deltas stored as one coalesced output line and a
/// `TurnComplete`/`TurnEnd` carrying the usage the agent reported.
#[tokio::test]
async fn single_text_turn_produces_one_coalesced_line_and_turn_end() {
    let script = Script::builder()
        .emit(claude::session_start("sess-1", "claude-3-5"))
        .wait_for_line()
        .emit(claude::message_start())
        .emit(claude::text_block_start(0))
        .emit(claude::text_delta(0, "Hello, "))
        .emit(claude::text_delta(0, "world!"))
        .emit(claude::block_stop(0))
        .emit(claude::message_stop())
        .emit(claude::turn_result("Hello, world!", true, 12, 6, 0.0021))
        .wait_for_line()
        .build();

    let mut running = support::start_scripted_session(script, "say hello").await;
    let lines = support::collect_output_until_turn_end(&mut running, Duration::from_secs(5)).await;

    let text_lines = assertions::lines_of_kind(&lines, OutputLineKind::Text);
    assert_eq!(text_lines.len(), 1, "text deltas should coalesce: {lines:?}");
    assert_eq!(text_lines[0].content, "Hello, world!");

    let turn_end = lines
        .iter()
        .find(|l| l.kind == OutputLineKind::TurnEnd)
        .expect("a TurnEnd line");
    assert_eq!(turn_end.cost_usd, Some(0.0021));

    running.manager.stop_session(&running.id).await.unwrap();
}
