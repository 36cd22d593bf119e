use std::time::Duration;

use cadence::commands::music::utils::engine::{SearchResult, TrackSource};
use cadence::dispatcher::{CommandEvent, Outcome};
use cadence::utils::embeds::Severity;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::fixtures;
use crate::common::mocks::{FakeEngine, RecordingChannel};
use crate::common::Harness;

fn youtube_single(title: &str) -> SearchResult {
    fixtures::single(fixtures::track(title, TrackSource::YouTube, Duration::from_secs(90)))
}

#[tokio::test]
async fn unknown_command_is_silently_ignored() {
    let harness = Harness::new(FakeEngine::new());
    let channel = RecordingChannel::default();

    let outcome = harness
        .dispatcher
        .dispatch(fixtures::command("skip"), &channel)
        .await;

    assert_eq!(outcome, Outcome::Ignored);
    assert_eq!(channel.deferrals(), 0);
    assert!(channel.replies().is_empty());
}

#[tokio::test]
async fn known_command_is_deferred_once() {
    let harness = Harness::new(FakeEngine::new());
    let channel = RecordingChannel::default();

    harness
        .dispatcher
        .dispatch(fixtures::command("help"), &channel)
        .await;

    assert_eq!(channel.deferrals(), 1);
    assert_eq!(channel.replies().len(), 1);
}

#[rstest]
#[case("play")]
#[case("leave")]
#[tokio::test]
async fn caller_outside_voice_is_refused(#[case] name: &str) {
    let harness = Harness::new(FakeEngine::new());
    let mut event = if name == "play" {
        fixtures::play("anything")
    } else {
        fixtures::command(name)
    };
    event.context.voice_channel = None;

    let (outcome, replies) = harness.run(event).await;

    assert_eq!(outcome, Outcome::Refused);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].severity, Severity::Warning);
    assert!(replies[0].description.contains("You need to be in a voice channel"));
    assert_eq!(harness.engine.searches(), 0);
}

#[tokio::test]
async fn play_without_query_is_refused() {
    let harness = Harness::new(FakeEngine::new());

    let (outcome, replies) = harness.run(fixtures::command("play")).await;

    assert_eq!(outcome, Outcome::Refused);
    assert!(replies[0].description.contains("`query`"));
    assert_eq!(harness.engine.searches(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_play_gets_one_warning_after_its_reply() {
    let engine = FakeEngine::new()
        .with_result("slow", youtube_single("slow"))
        .with_search_delay(Duration::from_secs(25));
    let harness = Harness::new(engine);

    let (outcome, replies) = harness.run(fixtures::play("slow")).await;

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].severity, Severity::Success);
    assert_eq!(replies[1].severity, Severity::Warning);
    assert_eq!(
        replies[1].description,
        "**Warning**\n**This command took 25.00 seconds to execute.**\n\n_If you experienced problems with the command, please try again._"
    );
}

#[tokio::test(start_paused = true)]
async fn slow_acknowledgement_counts_towards_the_warning() {
    let engine = FakeEngine::new()
        .with_result("song", youtube_single("song"))
        .with_search_delay(Duration::from_secs(6));
    let harness = Harness::new(engine);
    let channel = RecordingChannel::with_defer_delay(Duration::from_secs(15));

    let outcome = harness
        .dispatcher
        .dispatch(fixtures::play("song"), &channel)
        .await;

    let replies = channel.replies();
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(channel.deferrals(), 1);
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].severity, Severity::Success);
    assert!(replies[1].description.contains("took 21.00 seconds"));
}

#[tokio::test(start_paused = true)]
async fn patient_command_skips_the_warning() {
    let mut config = cadence::config::BotConfig::default();
    config.dispatch.patient_commands.insert(
        "play".to_string(),
        humantime_serde::Serde::from(Duration::from_secs(55)),
    );
    let engine = FakeEngine::new()
        .with_result("menu", youtube_single("menu"))
        .with_search_delay(Duration::from_secs(56));
    let harness = Harness::with_config(engine, config);

    let (_, replies) = harness.run(fixtures::play("menu")).await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].severity, Severity::Success);
}

#[tokio::test]
async fn help_lists_visible_commands() {
    let harness = Harness::new(FakeEngine::new());

    let (_, replies) = harness.run(fixtures::command("help")).await;

    let help = &replies[0];
    assert_eq!(help.severity, Severity::Info);
    assert!(help.description.contains("**/play** `query`"));
    assert!(help.description.contains("**/leave**"));
    assert!(!help.description.contains("/status"));
}

#[tokio::test]
async fn status_requires_administrator() {
    let harness = Harness::new(FakeEngine::new());

    let (outcome, replies) = harness.run(fixtures::command("status")).await;
    assert_eq!(outcome, Outcome::Refused);
    assert_eq!(replies[0].severity, Severity::Warning);

    let mut event: CommandEvent = fixtures::command("status");
    event.context.is_administrator = true;
    let (outcome, replies) = harness.run(event).await;
    assert_eq!(outcome, Outcome::Completed);
    assert!(replies[0].description.contains("Active voice sessions: **0**"));
}
