//! [`PlaybackEngine`] on top of songbird's builtin queue, with `yt-dlp` for resolving
//! queries and streaming.

use std::sync::Arc;

use serenity::all::{ChannelId, GuildId};
use serenity::async_trait;
use songbird::error::JoinError;
use songbird::input::YoutubeDl;
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{Call, CoreEvent, Event, EventContext, Songbird, TrackEvent};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use super::engine::{
    EngineError, EngineEvent, EngineResult, EventBus, PlaybackEngine, Requester, SearchResult,
    Track,
};
use super::session_manager::SessionOptions;
use super::ytdlp;

/// Only http(s) inputs are handed to yt-dlp as URLs, everything else is a search.
pub fn is_url(input: &str) -> bool {
    Url::parse(input).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

pub struct SongbirdEngine {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    bus: EventBus,
}

impl SongbirdEngine {
    pub fn new(manager: Arc<Songbird>, bus: EventBus) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
            bus,
        }
    }

    fn call(&self, guild_id: GuildId) -> EngineResult<Arc<Mutex<Call>>> {
        self.manager.get(guild_id).ok_or(EngineError::NotConnected)
    }
}

#[async_trait]
impl PlaybackEngine for SongbirdEngine {
    async fn search(&self, query: &str, requested_by: &Requester) -> EngineResult<SearchResult> {
        let from_search = !is_url(query);
        let target = if from_search {
            format!("ytsearch1:{}", query)
        } else {
            query.to_string()
        };

        info!("Resolving '{}' with yt-dlp", target);

        let output = Command::new("yt-dlp")
            .args(["-J", "--flat-playlist", "--no-warnings", &target])
            .output()
            .await
            .map_err(|e| EngineError::Search(format!("Failed to run yt-dlp: {}", e)))?;

        // unsupported URLs and dead links exit non-zero; that is an empty result
        if !output.status.success() {
            debug!(
                "yt-dlp resolved nothing for '{}': {}",
                target,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(SearchResult::default());
        }

        ytdlp::parse_output(&output.stdout, from_search, requested_by)
    }

    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        options: &SessionOptions,
    ) -> EngineResult<()> {
        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| EngineError::Join(e.to_string()))?;

        let mut handler = call.lock().await;
        handler.remove_all_global_events();
        handler.add_global_event(
            Event::Core(CoreEvent::DriverDisconnect),
            DriverNotifier {
                guild_id,
                bus: self.bus.clone(),
            },
        );

        debug!(
            "Joined channel {} in guild {} with {:?}",
            channel_id, guild_id, options
        );

        Ok(())
    }

    async fn enqueue(&self, guild_id: GuildId, track: &Track) -> EngineResult<()> {
        let call = self.call(guild_id)?;
        let mut handler = call.lock().await;

        let input = YoutubeDl::new(self.http.clone(), track.url.clone());
        let handle = handler.enqueue_input(input.into()).await;

        let notifier = TrackNotifier {
            guild_id,
            title: track.title.clone(),
            call: Arc::clone(&call),
            bus: self.bus.clone(),
        };

        for event in [TrackEvent::Play, TrackEvent::End, TrackEvent::Error] {
            handle
                .add_event(Event::Track(event), notifier.clone())
                .map_err(|e| EngineError::Playback(e.to_string()))?;
        }

        debug!(
            "Queued '{}' in guild {} ({} in songbird queue)",
            track.title,
            guild_id,
            handler.queue().len()
        );

        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> EngineResult<()> {
        if let Ok(call) = self.call(guild_id) {
            call.lock().await.queue().stop();
        }

        match self.manager.remove(guild_id).await {
            Ok(()) | Err(JoinError::NoCall) => Ok(()),
            Err(err) => Err(EngineError::Playback(err.to_string())),
        }
    }
}

/// How a queued track left (or entered) the player.
#[derive(Debug, Clone, PartialEq)]
enum TrackOutcome {
    Started,
    Finished,
    Stopped,
    Failed(String),
}

/// Events to publish for one track transition. `remaining` counts the tracks still queued
/// behind the one that changed state.
fn lifecycle_events(
    guild_id: GuildId,
    title: &str,
    outcome: TrackOutcome,
    remaining: usize,
) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    match outcome {
        TrackOutcome::Started => events.push(EngineEvent::TrackStarted { guild_id }),
        TrackOutcome::Stopped => events.push(EngineEvent::PlaybackStopped { guild_id }),
        TrackOutcome::Failed(message) => {
            events.push(EngineEvent::PlayerError {
                guild_id,
                track: Some(title.to_string()),
                message,
            });
            // songbird drops an errored track and moves on, same as a finished one
            events.extend(ended(guild_id, remaining));
        }
        TrackOutcome::Finished => events.extend(ended(guild_id, remaining)),
    }
    events
}

fn ended(guild_id: GuildId, remaining: usize) -> Vec<EngineEvent> {
    let mut events = vec![EngineEvent::TrackEnded { guild_id }];
    if remaining == 0 {
        events.push(EngineEvent::QueueEnded { guild_id });
    }
    events
}

/// Publishes track lifecycle events for one queued track
#[derive(Clone)]
struct TrackNotifier {
    guild_id: GuildId,
    title: String,
    call: Arc<Mutex<Call>>,
    bus: EventBus,
}

impl TrackNotifier {
    /// Tracks in the songbird queue other than `handle`.
    async fn remaining_after(&self, handle: &TrackHandle) -> usize {
        self.call
            .lock()
            .await
            .queue()
            .current_queue()
            .iter()
            .filter(|queued| queued.uuid() != handle.uuid())
            .count()
    }
}

#[async_trait]
impl songbird::EventHandler for TrackNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let EventContext::Track(tracks) = ctx else {
            return None;
        };

        for (state, handle) in tracks.iter() {
            let (outcome, remaining) = match &state.playing {
                PlayMode::Play => (TrackOutcome::Started, 0),
                PlayMode::Stop => (TrackOutcome::Stopped, 0),
                PlayMode::End => (TrackOutcome::Finished, self.remaining_after(handle).await),
                PlayMode::Errored(err) => (
                    TrackOutcome::Failed(err.to_string()),
                    self.remaining_after(handle).await,
                ),
                _ => continue,
            };

            for event in lifecycle_events(self.guild_id, &self.title, outcome, remaining) {
                self.bus.publish(event);
            }
        }

        None
    }
}

/// Reports the voice driver dropping its connection
struct DriverNotifier {
    guild_id: GuildId,
    bus: EventBus,
}

#[async_trait]
impl songbird::EventHandler for DriverNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::DriverDisconnect(data) = ctx {
            self.bus.publish(EngineEvent::Error {
                guild_id: Some(self.guild_id),
                message: format!("Voice driver disconnected ({:?})", data.reason),
            });
        }
        None
    }
}
