//! Commands dropped while the engine is still opening an item
//!
//! The mock's `open` creates the session and then suspends, so a
//! `timeout` around a command leaves a live engine session the controller
//! never received a handle for.

mod common;

use common::*;
use lumen_playback::{Generation, TransportState};
use std::time::Duration;
use tokio::time::timeout;

const OPEN_DELAY: Duration = Duration::from_millis(50);
const TOO_SHORT: Duration = Duration::from_millis(5);

async fn cancel_set_queue(
    controller: &mut lumen_playback::PlaybackController<MockEngine>,
    engine: &MockEngine,
    ids: &[&str],
) {
    engine.state().open_delay = Some(OPEN_DELAY);
    let result = timeout(TOO_SHORT, controller.set_queue(create_test_items(ids), 0)).await;
    assert!(result.is_err(), "open should still be pending");
    engine.state().open_delay = None;
}

#[tokio::test(start_paused = true)]
async fn play_after_cancelled_open_reopens_without_leaking() {
    let (mut controller, engine) = create_controller();
    cancel_set_queue(&mut controller, &engine, &["a", "b"]).await;

    assert_eq!(controller.transport(), TransportState::Loading);
    assert_eq!(controller.current_generation(), None);
    assert_eq!(engine.live_sessions(), 1);

    controller.play().await.unwrap();

    assert_eq!(engine.live_sessions(), 1);
    assert_eq!(engine.max_live_sessions(), 1);
    assert_eq!(controller.transport(), TransportState::Loading);
    assert!(controller.current_generation().is_some());
    assert_eq!(engine.opened_uris(), vec![uri("a"), uri("a")]);
    assert!(engine.calls().contains(&Call::Discard(Generation::new(1))));

    confirm_playing(&mut controller, &engine).await;
    assert_eq!(controller.transport(), TransportState::Playing);
}

#[tokio::test(start_paused = true)]
async fn stop_and_new_queue_after_cancelled_open() {
    let (mut controller, engine) = create_controller();
    cancel_set_queue(&mut controller, &engine, &["a", "b"]).await;

    controller.stop().await.unwrap();
    assert_eq!(controller.transport(), TransportState::Idle);
    assert_eq!(engine.live_sessions(), 0);

    controller
        .set_queue(create_test_items(&["c"]), 0)
        .await
        .unwrap();
    assert_eq!(engine.live_sessions(), 1);
    assert_eq!(engine.max_live_sessions(), 1);
    assert_eq!(controller.current_item().map(|item| item.id.as_str()), Some("c"));
}

#[tokio::test(start_paused = true)]
async fn status_from_cancelled_open_is_discarded() {
    let (mut controller, engine) = create_controller();
    cancel_set_queue(&mut controller, &engine, &["a"]).await;

    engine.last_sink().update(playing_at(1_000));
    controller.process_pending().await;

    assert_eq!(engine.live_sessions(), 0);
    assert_eq!(controller.transport(), TransportState::Paused);
    assert_eq!(controller.position().position_ms, 0);
    assert!(controller.recently_played().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancelled_next_keeps_single_session() {
    let (mut controller, engine) = create_controller();
    controller
        .set_queue(create_test_items(&["a", "b", "c"]), 0)
        .await
        .unwrap();
    confirm_playing(&mut controller, &engine).await;

    engine.state().open_delay = Some(OPEN_DELAY);
    assert!(timeout(TOO_SHORT, controller.next()).await.is_err());
    engine.state().open_delay = None;

    // Old session was released before the cancelled open began
    assert_eq!(engine.live_sessions(), 1);
    assert_eq!(controller.current_index(), Some(1));

    controller.next().await.unwrap();

    assert_eq!(engine.live_sessions(), 1);
    assert_eq!(engine.max_live_sessions(), 1);
    assert_eq!(controller.current_index(), Some(2));
}
