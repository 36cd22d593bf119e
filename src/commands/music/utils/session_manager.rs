use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::Deserialize;
use serenity::all::{ChannelId, GuildId};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::engine::{EngineError, PlaybackEngine, Track};

/// Errors that can occur while managing playback sessions
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to create playback session: {0}")]
    Creation(#[source] EngineError),

    #[error("Session for guild {0} has been deleted")]
    Deleted(GuildId),

    #[error("Queue is full ({max} tracks)")]
    QueueFull { max: usize },

    #[error("Nothing to enqueue")]
    NothingToEnqueue,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Idle cooldowns and queue caps applied to every new session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// How long to stay once the voice channel has no listeners left.
    #[serde(with = "humantime_serde")]
    pub leave_on_empty_cooldown: Duration,
    /// How long to stay after the last queued track finished.
    #[serde(with = "humantime_serde")]
    pub leave_on_end_cooldown: Duration,
    /// How long to stay after playback was stopped.
    #[serde(with = "humantime_serde")]
    pub leave_on_stop_cooldown: Duration,
    pub max_queue_size: usize,
    pub max_history_size: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            leave_on_empty_cooldown: Duration::from_secs(60),
            leave_on_end_cooldown: Duration::from_secs(60),
            leave_on_stop_cooldown: Duration::from_secs(60),
            max_queue_size: 10_000,
            max_history_size: 100,
        }
    }
}

/// Why a session is about to be left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdleReason {
    ChannelEmpty,
    QueueEnded,
    Stopped,
}

impl IdleReason {
    fn cooldown(self, options: &SessionOptions) -> Duration {
        match self {
            Self::ChannelEmpty => options.leave_on_empty_cooldown,
            Self::QueueEnded => options.leave_on_end_cooldown,
            Self::Stopped => options.leave_on_stop_cooldown,
        }
    }
}

impl fmt::Display for IdleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelEmpty => write!(f, "voice channel empty"),
            Self::QueueEnded => write!(f, "queue ended"),
            Self::Stopped => write!(f, "playback stopped"),
        }
    }
}

#[derive(Default)]
struct SessionState {
    queue: VecDeque<Track>,
    current: Option<Track>,
    // most recent first
    history: VecDeque<Track>,
}

/// The live playback context of one guild.
///
/// A session mirrors the engine's queue so the bot can answer questions about it without
/// a round trip. Once deleted it rejects every further enqueue; a new `/play` creates a
/// fresh session instead.
pub struct PlaybackSession {
    guild_id: GuildId,
    voice_channel: ChannelId,
    options: SessionOptions,
    deleted: AtomicBool,
    state: Mutex<SessionState>,
}

impl PlaybackSession {
    fn new(guild_id: GuildId, voice_channel: ChannelId, options: SessionOptions) -> Self {
        Self {
            guild_id,
            voice_channel,
            options,
            deleted: AtomicBool::new(false),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn voice_channel(&self) -> ChannelId {
        self.voice_channel
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    /// Hand `tracks` to the engine in order and mirror them in the queue.
    ///
    /// Returns the first track, which is the one the engine started or queued for this
    /// request. If the engine fails part way, the tracks handed over so far stay queued.
    pub async fn enqueue(
        &self,
        engine: &dyn PlaybackEngine,
        tracks: Vec<Track>,
    ) -> SessionResult<Track> {
        let mut state = self.state.lock().await;

        if self.is_deleted() {
            return Err(SessionError::Deleted(self.guild_id));
        }

        let first = tracks.first().cloned().ok_or(SessionError::NothingToEnqueue)?;

        // the first track starts right away when nothing is playing
        let waiting = tracks.len() - usize::from(state.current.is_none());
        if state.queue.len() + waiting > self.options.max_queue_size {
            return Err(SessionError::QueueFull {
                max: self.options.max_queue_size,
            });
        }

        let total = tracks.len();
        for (index, track) in tracks.into_iter().enumerate() {
            if let Err(err) = engine.enqueue(self.guild_id, &track).await {
                warn!(
                    "Engine rejected track {} of {} for guild {}: {}",
                    index + 1,
                    total,
                    self.guild_id,
                    err
                );
                return Err(err.into());
            }

            if state.current.is_none() {
                state.current = Some(track);
            } else {
                state.queue.push_back(track);
            }
        }

        debug!(
            "Enqueued {} track(s) for guild {}, {} waiting",
            total,
            self.guild_id,
            state.queue.len()
        );

        Ok(first)
    }

    /// Move the finished track into history and promote the next one.
    pub async fn advance(&self) -> Option<Track> {
        let mut state = self.state.lock().await;

        if let Some(finished) = state.current.take() {
            state.history.push_front(finished);
            state.history.truncate(self.options.max_history_size);
        }

        state.current = state.queue.pop_front();
        state.current.clone()
    }

    pub async fn current_track(&self) -> Option<Track> {
        self.state.lock().await.current.clone()
    }

    pub async fn queued_tracks(&self) -> Vec<Track> {
        self.state.lock().await.queue.iter().cloned().collect()
    }

    pub async fn history_len(&self) -> usize {
        self.state.lock().await.history.len()
    }

    /// Returns false if the session was already deleted.
    async fn mark_deleted(&self) -> bool {
        let mut state = self.state.lock().await;

        if self.deleted.swap(true, Ordering::AcqRel) {
            return false;
        }

        state.queue.clear();
        state.current = None;
        true
    }
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("guild_id", &self.guild_id)
            .field("voice_channel", &self.voice_channel)
            .field("deleted", &self.is_deleted())
            .finish_non_exhaustive()
    }
}

type SessionSlot = Arc<Mutex<Option<Arc<PlaybackSession>>>>;

struct IdleTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Owns the playback session of every guild.
///
/// Each guild has its own slot guarded by an async mutex, so check-then-create and
/// teardown for one guild never interleave while other guilds proceed independently.
pub struct SessionManager {
    engine: Arc<dyn PlaybackEngine>,
    slots: DashMap<GuildId, SessionSlot>,
    idle_timers: DashMap<(GuildId, IdleReason), IdleTimer>,
    next_generation: AtomicU64,
}

impl SessionManager {
    pub fn new(engine: Arc<dyn PlaybackEngine>) -> Self {
        Self {
            engine,
            slots: DashMap::new(),
            idle_timers: DashMap::new(),
            next_generation: AtomicU64::new(0),
        }
    }

    fn slot(&self, guild_id: GuildId) -> SessionSlot {
        Arc::clone(self.slots.entry(guild_id).or_default().value())
    }

    /// Return the guild's live session, or connect a new one to `voice_channel`.
    pub async fn get_or_create(
        &self,
        guild_id: GuildId,
        voice_channel: ChannelId,
        options: &SessionOptions,
    ) -> SessionResult<Arc<PlaybackSession>> {
        let slot = self.slot(guild_id);
        let mut current = slot.lock().await;

        if let Some(session) = current.as_ref().filter(|session| !session.is_deleted()) {
            return Ok(Arc::clone(session));
        }

        if let Err(err) = self.engine.connect(guild_id, voice_channel, options).await {
            drop(current);
            drop(slot);
            self.prune_slot(guild_id);
            return Err(SessionError::Creation(err));
        }

        let session = Arc::new(PlaybackSession::new(
            guild_id,
            voice_channel,
            options.clone(),
        ));
        *current = Some(Arc::clone(&session));

        info!(
            "Created playback session for guild {} in channel {}",
            guild_id, voice_channel
        );

        Ok(session)
    }

    /// Return the guild's live session without creating one.
    pub async fn get_existing(&self, guild_id: GuildId) -> Option<Arc<PlaybackSession>> {
        let slot = self.slots.get(&guild_id).map(|slot| Arc::clone(slot.value()))?;
        let current = slot.lock().await;
        current
            .as_ref()
            .filter(|session| !session.is_deleted())
            .cloned()
    }

    /// Delete the guild's session, clear its queue and leave voice.
    ///
    /// Returns false when there was nothing to tear down. Safe to call repeatedly.
    pub async fn teardown(&self, guild_id: GuildId) -> bool {
        self.cancel_idle(guild_id, None);
        self.release(guild_id, None).await
    }

    /// Number of guilds with a live session.
    pub async fn active_sessions(&self) -> usize {
        let slots: Vec<SessionSlot> = self
            .slots
            .iter()
            .map(|slot| Arc::clone(slot.value()))
            .collect();

        let mut active = 0;
        for slot in slots {
            if slot.lock().await.as_ref().is_some_and(|s| !s.is_deleted()) {
                active += 1;
            }
        }
        active
    }

    async fn release(&self, guild_id: GuildId, expected: Option<&Arc<PlaybackSession>>) -> bool {
        let Some(slot) = self.slots.get(&guild_id).map(|slot| Arc::clone(slot.value())) else {
            return false;
        };
        let mut current = slot.lock().await;

        // an idle timer may outlive the session it was started for
        if let (Some(expected), Some(session)) = (expected, current.as_ref()) {
            if !Arc::ptr_eq(expected, session) {
                return false;
            }
        }

        let Some(session) = current.take() else {
            return false;
        };

        if !session.mark_deleted().await {
            return false;
        }

        if let Err(err) = self.engine.disconnect(guild_id).await {
            warn!(
                "Failed to disconnect engine while tearing down guild {}: {}",
                guild_id, err
            );
        }

        drop(current);
        drop(slot);
        self.prune_slot(guild_id);

        info!("Tore down playback session for guild {}", guild_id);
        true
    }

    /// Forget the guild's slot if it is empty and nobody else holds it.
    fn prune_slot(&self, guild_id: GuildId) {
        self.slots.remove_if(&guild_id, |_, slot| {
            Arc::strong_count(slot) == 1
                && slot.try_lock().is_ok_and(|current| current.is_none())
        });
    }

    /// Start the cooldown for `reason`. When it runs out, the session is torn down.
    pub async fn start_idle(self: &Arc<Self>, guild_id: GuildId, reason: IdleReason) {
        let Some(session) = self.get_existing(guild_id).await else {
            return;
        };
        let cooldown = reason.cooldown(session.options());
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let manager = Arc::clone(self);

        debug!(
            "Guild {} idle ({}), leaving in {:?}",
            guild_id, reason, cooldown
        );

        let handle = tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            manager
                .idle_timers
                .remove_if(&(guild_id, reason), |_, timer| timer.generation == generation);

            if manager.release(guild_id, Some(&session)).await {
                info!(
                    "Left guild {} after {:?} idle ({})",
                    guild_id, cooldown, reason
                );
            }
        });

        if let Some(previous) = self
            .idle_timers
            .insert((guild_id, reason), IdleTimer { generation, handle })
        {
            previous.handle.abort();
        }
    }

    /// The last queued track finished.
    pub async fn on_queue_end(self: &Arc<Self>, guild_id: GuildId) {
        self.start_idle(guild_id, IdleReason::QueueEnded).await;
    }

    /// Only bots are left in the session's voice channel.
    pub async fn on_channel_empty(self: &Arc<Self>, guild_id: GuildId) {
        self.start_idle(guild_id, IdleReason::ChannelEmpty).await;
    }

    pub async fn on_playback_stopped(self: &Arc<Self>, guild_id: GuildId) {
        self.start_idle(guild_id, IdleReason::Stopped).await;
    }

    /// Cancel pending idle teardowns. `None` cancels every reason.
    pub fn cancel_idle(&self, guild_id: GuildId, reason: Option<IdleReason>) {
        let reasons = match reason {
            Some(reason) => vec![reason],
            None => vec![
                IdleReason::ChannelEmpty,
                IdleReason::QueueEnded,
                IdleReason::Stopped,
            ],
        };

        for reason in reasons {
            if let Some((_, timer)) = self.idle_timers.remove(&(guild_id, reason)) {
                debug!("Cancelled idle timer for guild {} ({})", guild_id, reason);
                timer.handle.abort();
            }
        }
    }

    /// Playback resumed, so pending queue-ended and stopped timers no longer apply.
    pub fn on_activity(&self, guild_id: GuildId) {
        self.cancel_idle(guild_id, Some(IdleReason::QueueEnded));
        self.cancel_idle(guild_id, Some(IdleReason::Stopped));
    }

    /// Someone is listening again.
    pub fn on_channel_occupied(&self, guild_id: GuildId) {
        self.cancel_idle(guild_id, Some(IdleReason::ChannelEmpty));
    }

    pub fn has_pending_idle(&self, guild_id: GuildId, reason: IdleReason) -> bool {
        self.idle_timers.contains_key(&(guild_id, reason))
    }
}
