//! Cadence: slash-command dispatch and per-guild playback sessions for a Discord music bot.
//!
//! Inbound command interactions go through the [`dispatcher::Dispatcher`], which looks the
//! command up in the [`commands::CommandRegistry`], evaluates its guards, runs the handler
//! and reports exactly one final reply. Music commands drive the
//! [`SessionManager`](commands::music::utils::session_manager::SessionManager), which owns
//! one playback session per guild on top of a
//! [`PlaybackEngine`](commands::music::utils::engine::PlaybackEngine).

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod events;
pub mod utils;

use commands::music::utils::{engine::PlaybackEngine, session_manager::SessionManager};
use config::BotConfig;
use utils::embeds::Reply;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type CommandResult = Result<Reply, Error>;

/// State shared by every command invocation.
pub struct Data {
    pub config: BotConfig,
    pub engine: Arc<dyn PlaybackEngine>,
    pub sessions: Arc<SessionManager>,
    pub started_at: DateTime<Utc>,
}

impl Data {
    pub fn new(config: BotConfig, engine: Arc<dyn PlaybackEngine>) -> Self {
        let sessions = Arc::new(SessionManager::new(Arc::clone(&engine)));

        Self {
            config,
            engine,
            sessions,
            started_at: Utc::now(),
        }
    }
}
