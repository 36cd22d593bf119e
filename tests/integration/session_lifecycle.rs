use std::sync::Arc;
use std::time::Duration;

use cadence::commands::music::utils::engine::{EngineEvent, EventBus, TrackSource};
use cadence::commands::music::utils::event_handlers::spawn_event_listener;
use cadence::commands::music::utils::session_manager::IdleReason;
use cadence::dispatcher::Outcome;
use cadence::utils::embeds::Severity;
use pretty_assertions::assert_eq;

use crate::common::fixtures::{self, GUILD_ID};
use crate::common::mocks::FakeEngine;
use crate::common::Harness;

fn harness_with_song() -> Harness {
    Harness::new(FakeEngine::new().with_result(
        "song",
        fixtures::single(fixtures::track("song", TrackSource::YouTube, Duration::from_secs(180))),
    ))
}

#[tokio::test]
async fn leave_tears_down_once() {
    let harness = harness_with_song();
    harness.run(fixtures::play("song")).await;
    let session = harness.sessions().get_existing(GUILD_ID).await.unwrap();

    let (outcome, replies) = harness.run(fixtures::command("leave")).await;
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(replies[0].severity, Severity::Success);
    assert!(replies[0].description.starts_with("**Leaving**"));
    assert!(session.is_deleted());

    // second leave is stopped by the active-session guard
    let (outcome, replies) = harness.run(fixtures::command("leave")).await;
    assert_eq!(outcome, Outcome::Refused);
    assert!(replies[0].description.contains("No tracks are currently playing"));

    assert_eq!(harness.engine.disconnects(), 1);
}

#[tokio::test]
async fn concurrent_leaves_disconnect_once() {
    let harness = Arc::new(harness_with_song());
    harness.run(fixtures::play("song")).await;

    let first = tokio::spawn({
        let harness = Arc::clone(&harness);
        async move { harness.sessions().teardown(GUILD_ID).await }
    });
    let second = tokio::spawn({
        let harness = Arc::clone(&harness);
        async move { harness.sessions().teardown(GUILD_ID).await }
    });

    let results = [
        tokio_test::assert_ok!(first.await),
        tokio_test::assert_ok!(second.await),
    ];

    assert_eq!(results.iter().filter(|torn_down| **torn_down).count(), 1);
    assert_eq!(harness.engine.disconnects(), 1);
}

#[tokio::test]
async fn play_after_leave_starts_a_fresh_session() {
    let harness = harness_with_song();
    harness.run(fixtures::play("song")).await;
    let old = harness.sessions().get_existing(GUILD_ID).await.unwrap();
    harness.run(fixtures::command("leave")).await;

    harness.run(fixtures::play("song")).await;

    let fresh = harness.sessions().get_existing(GUILD_ID).await.unwrap();
    assert!(!Arc::ptr_eq(&old, &fresh));
    assert_eq!(harness.engine.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn queue_end_leaves_after_cooldown() {
    let harness = harness_with_song();
    let bus = EventBus::default();
    let listener = spawn_event_listener(&bus, Arc::clone(harness.sessions()));
    harness.run(fixtures::play("song")).await;

    bus.publish(EngineEvent::TrackEnded { guild_id: GUILD_ID });
    bus.publish(EngineEvent::QueueEnded { guild_id: GUILD_ID });
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(harness.sessions().has_pending_idle(GUILD_ID, IdleReason::QueueEnded));
    assert_eq!(harness.engine.disconnects(), 0);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(harness.sessions().get_existing(GUILD_ID).await.is_none());
    assert_eq!(harness.engine.disconnects(), 1);

    listener.abort();
}

#[tokio::test(start_paused = true)]
async fn new_track_cancels_idle_leave() {
    let harness = harness_with_song();
    let bus = EventBus::default();
    let listener = spawn_event_listener(&bus, Arc::clone(harness.sessions()));
    harness.run(fixtures::play("song")).await;

    bus.publish(EngineEvent::QueueEnded { guild_id: GUILD_ID });
    tokio::time::sleep(Duration::from_secs(10)).await;
    bus.publish(EngineEvent::TrackStarted { guild_id: GUILD_ID });
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert!(harness.sessions().get_existing(GUILD_ID).await.is_some());
    assert_eq!(harness.engine.disconnects(), 0);

    listener.abort();
}
