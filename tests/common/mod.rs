//! Common test utilities, fixtures, and mocks
//! This module contains shared functionality used across different test categories


use std::sync::Arc;

use cadence::commands::music::utils::engine::PlaybackEngine;
use cadence::commands::music::utils::session_manager::SessionManager;
use cadence::commands::{system_commands, user_commands, CommandRegistry};
use cadence::config::BotConfig;
use cadence::dispatcher::{CommandEvent, Dispatcher, Outcome};
use cadence::utils::embeds::Reply;
use cadence::Data;

use mocks::{FakeEngine, RecordingChannel};

/// A dispatcher with the built-in commands wired to a [`FakeEngine`].
pub struct Harness {
    pub engine: Arc<FakeEngine>,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub fn new(engine: FakeEngine) -> Self {
        Self::with_config(engine, BotConfig::default())
    }

    pub fn with_config(engine: FakeEngine, config: BotConfig) -> Self {
        let engine = Arc::new(engine);
        let registry = CommandRegistry::from_sources(user_commands(&config), system_commands())
            .expect("built-in commands must not collide");
        let data = Data::new(config, Arc::clone(&engine) as Arc<dyn PlaybackEngine>);

        Self {
            engine,
            dispatcher: Dispatcher::new(registry, Arc::new(data)),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.dispatcher.data().sessions
    }

    /// Dispatch `event` and collect everything sent back.
    pub async fn run(&self, event: CommandEvent) -> (Outcome, Vec<Reply>) {
        let channel = RecordingChannel::default();
        let outcome = self.dispatcher.dispatch(event, &channel).await;
        (outcome, channel.replies())
    }
}
