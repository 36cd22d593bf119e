use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::engine::{EngineEvent, EventBus};
use super::session_manager::SessionManager;

/// Subscribe to the engine's events once and route them for the lifetime of the bot.
///
/// Errors are only logged. Playback progress keeps the session mirror in step and drives
/// the idle cooldowns.
pub fn spawn_event_listener(bus: &EventBus, sessions: Arc<SessionManager>) -> JoinHandle<()> {
    let mut events = bus.subscribe();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => handle_event(&sessions, event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Engine event listener lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("Engine event listener stopped");
    })
}

async fn handle_event(sessions: &Arc<SessionManager>, event: EngineEvent) {
    match event {
        EngineEvent::Error { guild_id, message } => match guild_id {
            Some(guild_id) => {
                error!("🚨 General player error event in guild {}: {}", guild_id, message)
            }
            None => error!("🚨 General player error event: {}", message),
        },
        EngineEvent::PlayerError {
            guild_id,
            track,
            message,
        } => {
            error!(
                "🚨 Player error event in guild {} while streaming {}: {}",
                guild_id,
                track.as_deref().unwrap_or("unknown track"),
                message
            );
        }
        EngineEvent::TrackStarted { guild_id } => {
            debug!("Track started in guild {}", guild_id);
            sessions.on_activity(guild_id);
        }
        EngineEvent::TrackEnded { guild_id } => {
            if let Some(session) = sessions.get_existing(guild_id).await {
                let next = session.advance().await;
                debug!(
                    "Track ended in guild {}, next: {:?}",
                    guild_id,
                    next.map(|track| track.title)
                );
            }
        }
        EngineEvent::QueueEnded { guild_id } => {
            sessions.on_queue_end(guild_id).await;
        }
        EngineEvent::PlaybackStopped { guild_id } => {
            sessions.on_playback_stopped(guild_id).await;
        }
    }
}
