use std::time::Duration;

use cadence::commands::music::utils::engine::{SearchResult, TrackSource};
use cadence::config::BotConfig;
use cadence::dispatcher::Outcome;
use cadence::utils::embeds::Severity;
use pretty_assertions::assert_eq;

use crate::common::fixtures::{self, GUILD_ID};
use crate::common::mocks::FakeEngine;
use crate::common::Harness;
use crate::test_utils;

fn minute_long(title: &str) -> SearchResult {
    fixtures::single(fixtures::track(title, TrackSource::YouTube, Duration::from_secs(60)))
}

#[tokio::test]
async fn no_results_reply_without_session() {
    test_utils::init();
    let harness = Harness::new(FakeEngine::new());

    let (outcome, replies) = harness.run(fixtures::play("asdfghjkl")).await;

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].severity, Severity::Warning);
    assert_eq!(
        replies[0].description,
        "**No track found**\nNo results found for `asdfghjkl`."
    );
    assert_eq!(harness.engine.connects(), 0);
    assert!(harness.sessions().get_existing(GUILD_ID).await.is_none());
}

#[tokio::test]
async fn youtube_live_stream_is_never_enqueued() {
    let engine = FakeEngine::new().with_result(
        "lofi radio",
        fixtures::single(fixtures::live_youtube("lofi hip hop radio")),
    );
    let harness = Harness::new(engine);

    let (_, replies) = harness.run(fixtures::play("lofi radio")).await;

    assert_eq!(replies.len(), 1);
    assert!(replies[0].description.starts_with("**Unsupported Source**"));
    assert!(harness.engine.enqueued().is_empty());
    assert_eq!(harness.sessions().active_sessions().await, 0);
}

#[tokio::test]
async fn live_stream_from_other_platform_is_playable() {
    let mut stream = fixtures::live_youtube("set");
    stream.source = TrackSource::SoundCloud;
    let harness = Harness::new(FakeEngine::new().with_result("set", fixtures::single(stream)));

    let (_, replies) = harness.run(fixtures::play("set")).await;

    assert_eq!(replies[0].severity, Severity::Success);
    assert_eq!(harness.engine.enqueued().len(), 1);
}

#[tokio::test]
async fn playlist_summary_counts_remaining_tracks() {
    let engine = FakeEngine::new().with_result(
        "https://soundcloud.com/artist/sets/album",
        fixtures::playlist(&["intro", "verse", "bridge", "outro"]),
    );
    let harness = Harness::new(engine);

    let (_, replies) = harness
        .run(fixtures::play("https://soundcloud.com/artist/sets/album"))
        .await;

    assert_eq!(replies.len(), 1);
    let reply = &replies[0];
    assert_eq!(
        reply.description,
        "**Added playlist to queue**\n`[3:20]` **[intro](https://media.example.com/intro)**\n\nAnd **3** more tracks..."
    );
    assert_eq!(reply.author, Some(fixtures::requester()));

    let titles: Vec<_> = harness
        .engine
        .enqueued()
        .into_iter()
        .map(|track| track.title)
        .collect();
    assert_eq!(titles, vec!["intro", "verse", "bridge", "outro"]);
}

#[tokio::test]
async fn single_track_with_unknown_length_has_no_duration() {
    let engine = FakeEngine::new().with_result(
        "song",
        fixtures::single(fixtures::track("song", TrackSource::YouTube, Duration::ZERO)),
    );
    let harness = Harness::new(engine);

    let (_, replies) = harness.run(fixtures::play("song")).await;

    assert_eq!(
        replies[0].description,
        "**Added to queue**\n**[song](https://media.example.com/song)**"
    );
}

#[tokio::test]
async fn arbitrary_url_carries_default_thumbnail() {
    let config = BotConfig {
        default_thumbnail: "https://cdn.example.com/cadence.png".to_string(),
        ..BotConfig::default()
    };
    let engine = FakeEngine::new().with_result(
        "https://files.example.com/mix.mp3",
        fixtures::single(fixtures::track("mix", TrackSource::Arbitrary, Duration::ZERO)),
    );
    let harness = Harness::with_config(engine, config);

    let (_, replies) = harness.run(fixtures::play("https://files.example.com/mix.mp3")).await;

    assert_eq!(
        replies[0].thumbnail.as_deref(),
        Some("https://cdn.example.com/cadence.png")
    );
    let session = harness.sessions().get_existing(GUILD_ID).await.unwrap();
    assert_eq!(
        session.current_track().await.unwrap().thumbnail.as_deref(),
        Some("https://cdn.example.com/cadence.png")
    );
}

#[tokio::test]
async fn second_play_reuses_the_session() {
    let engine = FakeEngine::new()
        .with_result("a", minute_long("a"))
        .with_result("b", minute_long("b"));
    let harness = Harness::new(engine);

    harness.run(fixtures::play("a")).await;
    harness.run(fixtures::play("b")).await;

    assert_eq!(harness.engine.connects(), 1);
    let session = harness.sessions().get_existing(GUILD_ID).await.unwrap();
    assert_eq!(session.current_track().await.unwrap().title, "a");
    assert_eq!(session.queued_tracks().await.len(), 1);
}

#[tokio::test]
async fn refused_connection_is_reported_as_failure() {
    let engine = FakeEngine::new()
        .with_result("a", minute_long("a"))
        .refusing_connect();
    let harness = Harness::new(engine);

    let (outcome, replies) = harness.run(fixtures::play("a")).await;

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].severity, Severity::Error);
    assert!(harness.engine.enqueued().is_empty());
    assert!(harness.sessions().get_existing(GUILD_ID).await.is_none());
}

#[tokio::test]
async fn full_queue_rejects_the_request() {
    let mut config = BotConfig::default();
    config.session.max_queue_size = 2;
    let engine = FakeEngine::new().with_result(
        "album",
        fixtures::playlist(&["1", "2", "3", "4"]),
    );
    let harness = Harness::with_config(engine, config);

    let (_, replies) = harness.run(fixtures::play("album")).await;

    assert_eq!(replies[0].severity, Severity::Warning);
    assert!(replies[0].description.starts_with("**Queue full**"));
    assert!(harness.engine.enqueued().is_empty());
}
