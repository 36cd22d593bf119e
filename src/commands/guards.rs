use tracing::debug;

use super::InvocationContext;
use crate::commands::music::utils::embedded_messages;
use crate::commands::music::utils::session_manager::SessionManager;
use crate::utils::embeds::Reply;

/// A precondition a command declares. Evaluated in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// The caller is connected to a voice channel in this guild.
    InVoiceChannel,
    /// The guild has a live playback session.
    ActiveSession,
    /// The caller has the Administrator permission.
    Administrator,
}

/// Why an invocation was refused before its handler ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardFailure {
    NotInVoiceChannel,
    NoActiveSession,
    NotAdministrator,
    MissingArgument(String),
}

impl GuardFailure {
    /// The warning shown to the caller.
    pub fn reply(&self) -> Reply {
        match self {
            Self::NotInVoiceChannel => embedded_messages::user_not_in_voice_channel(),
            Self::NoActiveSession => embedded_messages::no_active_session(),
            Self::NotAdministrator => Reply::warning(
                "**Failed**\nYou need the Administrator permission to use this command.",
            ),
            Self::MissingArgument(name) => embedded_messages::missing_argument(name),
        }
    }
}

/// Check `guards` in order and stop at the first one that fails.
pub async fn evaluate(
    guards: &[Guard],
    invocation: &InvocationContext,
    sessions: &SessionManager,
) -> Result<(), GuardFailure> {
    for guard in guards {
        let passed = match guard {
            Guard::InVoiceChannel => invocation.voice_channel.is_some(),
            Guard::ActiveSession => sessions.get_existing(invocation.guild.id).await.is_some(),
            Guard::Administrator => invocation.is_administrator,
        };

        if !passed {
            debug!(
                "Guard {:?} failed for {} in guild {}",
                guard, invocation.caller.name, invocation.guild.id
            );
            return Err(match guard {
                Guard::InVoiceChannel => GuardFailure::NotInVoiceChannel,
                Guard::ActiveSession => GuardFailure::NoActiveSession,
                Guard::Administrator => GuardFailure::NotAdministrator,
            });
        }
    }

    Ok(())
}
