//! The boundary to the playback engine: search, voice connections and the audio queue.
//!
//! Cadence never decodes or streams audio itself. Everything that touches voice goes
//! through a [`PlaybackEngine`], and everything the engine wants to report asynchronously
//! is published on an [`EventBus`].

use std::fmt;
use std::time::Duration;

use serenity::all::{ChannelId, GuildId, UserId};
use serenity::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use super::session_manager::SessionOptions;

/// The member a track or reply is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Where a track was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackSource {
    YouTube,
    SoundCloud,
    Bandcamp,
    /// A plain media URL with no platform behind it.
    Arbitrary,
    Other(String),
}

impl TrackSource {
    /// Map a yt-dlp extractor key to a source.
    pub fn from_extractor(key: &str) -> Self {
        match key.to_ascii_lowercase().as_str() {
            "youtube" | "youtubetab" | "youtubesearch" => Self::YouTube,
            "soundcloud" | "soundcloudset" => Self::SoundCloud,
            "bandcamp" | "bandcampalbum" => Self::Bandcamp,
            "generic" => Self::Arbitrary,
            _ => Self::Other(key.to_string()),
        }
    }

    /// Live streams reported with no length cannot be streamed from these sources.
    pub fn rejects_zero_length_live(&self) -> bool {
        matches!(self, Self::YouTube)
    }
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::YouTube => write!(f, "youtube"),
            Self::SoundCloud => write!(f, "soundcloud"),
            Self::Bandcamp => write!(f, "bandcamp"),
            Self::Arbitrary => write!(f, "arbitrary"),
            Self::Other(key) => write!(f, "{}", key.to_ascii_lowercase()),
        }
    }
}

/// A playable track as resolved by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub title: String,
    pub url: String,
    /// Zero when the engine does not know the length (live streams, raw files).
    pub duration: Duration,
    pub source: TrackSource,
    pub thumbnail: Option<String>,
    pub requested_by: Requester,
    pub is_live: bool,
}

impl Track {
    pub fn is_unsupported_live(&self) -> bool {
        self.is_live && self.duration.is_zero() && self.source.rejects_zero_length_live()
    }

    /// Arbitrary URLs never come with artwork, so they get the default image.
    pub fn backfill_thumbnail(&mut self, default_thumbnail: &str) {
        if self.source == TrackSource::Arbitrary {
            self.thumbnail = Some(default_thumbnail.to_string());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub tracks: Vec<Track>,
    pub is_playlist: bool,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Errors reported by a playback engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Search failed: {0}")]
    Search(String),

    #[error("Failed to join voice channel: {0}")]
    Join(String),

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Playback error: {0}")]
    Playback(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Everything the core needs from an audio backend.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Resolve a search query or URL. An empty result is not an error.
    async fn search(&self, query: &str, requested_by: &Requester) -> EngineResult<SearchResult>;

    /// Join `channel_id` in `guild_id`, ready to play.
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        options: &SessionOptions,
    ) -> EngineResult<()>;

    /// Start `track` if nothing is playing, otherwise queue it.
    async fn enqueue(&self, guild_id: GuildId, track: &Track) -> EngineResult<()>;

    /// Clear the guild's queue and leave its voice channel.
    async fn disconnect(&self, guild_id: GuildId) -> EngineResult<()>;
}

/// Asynchronous notifications from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// General engine failure, not tied to a track.
    Error {
        guild_id: Option<GuildId>,
        message: String,
    },
    /// The audio player failed while streaming a track.
    PlayerError {
        guild_id: GuildId,
        track: Option<String>,
        message: String,
    },
    TrackStarted {
        guild_id: GuildId,
    },
    TrackEnded {
        guild_id: GuildId,
    },
    /// The last queued track finished.
    QueueEnded {
        guild_id: GuildId,
    },
    /// Playback was stopped before the track finished.
    PlaybackStopped {
        guild_id: GuildId,
    },
}

/// Typed fan-out of [`EngineEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: EngineEvent) {
        if let Err(err) = self.sender.send(event) {
            debug!("Dropped engine event with no subscribers: {:?}", err.0);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}
