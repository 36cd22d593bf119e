use serenity::async_trait;
use tracing::info;

use crate::commands::guards::Guard;
use crate::commands::music::utils::embedded_messages;
use crate::commands::{CommandDescriptor, CommandHandler, Context};
use crate::CommandResult;

/// Leave the voice channel and clear the queue
pub struct Leave;

pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor::new(
        "leave",
        "Clear the track queue and remove the bot from voice channel.",
        Leave,
    )
    .guard(Guard::InVoiceChannel)
    .guard(Guard::ActiveSession)
}

#[async_trait]
impl CommandHandler for Leave {
    async fn handle(&self, ctx: Context<'_>) -> CommandResult {
        let guild_id = ctx.invocation.guild.id;

        // the session may have gone idle since the guards ran
        if !ctx.data.sessions.teardown(guild_id).await {
            return Ok(embedded_messages::no_active_session());
        }

        info!(
            "{} made the bot leave the voice channel in guild {}",
            ctx.invocation.caller.name, guild_id
        );
        Ok(embedded_messages::left_voice_channel())
    }
}
