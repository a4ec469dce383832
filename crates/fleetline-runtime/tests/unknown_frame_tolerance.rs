mod support;

use std::time::Duration;

use fleetline_testing::frames::claude;
use fleetline_testing::Script;
use fleetline_types::OutputLineKind;

/// Scenario 4: a frame with an unrecognised discriminator is skipped
/// silently (no session-ending error, no spurious output line) and the
/// stream continues to the turn's normal completion.
#[tokio::test]
async fn unrecognised_discriminator_is_skipped_without_ending_the_session() {
    let script = Script::builder()
        .emit(claude::session_start("sess-4", "claude-3-5"))
        .wait_for_line()
        .emit(claude::message_start())
        .emit(claude::unknown_frame())
        .emit(claude::text_block_start(0))
        .emit(claude::text_delta(0, "still going"))
        .emit(claude::block_stop(0))
        .emit(claude::message_stop())
        .emit(claude::turn_result("still going", true, 4, 2, 0.0))
        .wait_for_line()
        .build();

    let mut running = support::start_scripted_session(script, "push through noise").await;
    let lines = support::collect_output_until_turn_end(&mut running, Duration::from_secs(5)).await;

    assert!(
        lines
            .iter()
            .any(|l| l.kind == OutputLineKind::Text && l.content == "still going"),
        "text after the unknown frame should still show up: {lines:?}"
    );
    assert!(lines.iter().any(|l| l.kind == OutputLineKind::TurnEnd));
    assert!(
        !lines.iter().any(|l| l.kind == OutputLineKind::Error),
        "an unrecognised discriminator must not surface as an error line: {lines:?}"
    );

    running.manager.stop_session(&running.id).await.unwrap();
}
