use chrono::Utc;
use serenity::async_trait;

use crate::commands::guards::Guard;
use crate::commands::music::utils::format_duration;
use crate::commands::{CommandDescriptor, CommandHandler, Context};
use crate::utils::embeds::Reply;
use crate::CommandResult;

/// Report uptime and the number of active playback sessions
pub struct Status;

pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor::new("status", "Show bot uptime and active sessions.", Status)
        .guard(Guard::Administrator)
        .hidden()
}

#[async_trait]
impl CommandHandler for Status {
    async fn handle(&self, ctx: Context<'_>) -> CommandResult {
        let uptime = (Utc::now() - ctx.data.started_at)
            .to_std()
            .unwrap_or_default();
        let active = ctx.data.sessions.active_sessions().await;

        Ok(Reply::info(format!(
            "**Status**\nUptime: `{}`\nActive voice sessions: **{}**",
            format_duration(uptime),
            active
        )))
    }
}
