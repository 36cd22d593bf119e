use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serenity::all::{
    ActivityData, ChannelId, CommandDataOptionValue, CommandInteraction,
    CreateInteractionResponseFollowup, EditInteractionResponse, Guild, Interaction, Ready,
    UnavailableGuild, VoiceState,
};
use serenity::async_trait;
use serenity::prelude::*;
use thousands::Separable;
use tracing::{debug, info};

use crate::commands::music::utils::engine::Requester;
use crate::commands::{ArgumentValue, GuildInfo, InvocationContext};
use crate::config::EmbedColors;
use crate::dispatcher::{CommandEvent, Dispatcher, ReplyError, ResponseChannel};
use crate::utils::embeds::Reply;

pub struct Handler {
    dispatcher: Arc<Dispatcher>,
}

impl Handler {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl serenity::prelude::EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            "🟢 Logged in as {} in {} guilds",
            ready.user.tag(),
            ready.guilds.len()
        );
        ctx.set_activity(Some(ActivityData::watching("/help")));
    }

    async fn guild_create(&self, _ctx: Context, guild: Guild, is_new: Option<bool>) {
        if is_new == Some(true) {
            info!(
                "🟢 Added to guild {} (#{})",
                guild.name,
                guild.member_count.separate_with_commas()
            );
        }
    }

    async fn guild_delete(&self, _ctx: Context, incomplete: UnavailableGuild, full: Option<Guild>) {
        // an outage also reports the guild as deleted
        if incomplete.unavailable {
            return;
        }

        match full {
            Some(guild) => info!(
                "🔴 Removed from guild {} (#{})",
                guild.name,
                guild.member_count.separate_with_commas()
            ),
            None => info!("🔴 Removed from guild {}", incomplete.id),
        }
        self.dispatcher.data().sessions.teardown(incomplete.id).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        let Some(invocation) = invocation_context(&ctx, &command) else {
            debug!("Ignoring /{} outside of a guild", command.data.name);
            return;
        };

        let responder = InteractionResponder {
            ctx: &ctx,
            interaction: &command,
            colors: self.dispatcher.data().config.embed_colors,
            responded: AtomicBool::new(false),
        };
        let event = CommandEvent {
            name: command.data.name.clone(),
            context: invocation,
        };

        self.dispatcher.dispatch(event, &responder).await;
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            return;
        };
        let sessions = &self.dispatcher.data().sessions;
        let Some(session) = sessions.get_existing(guild_id).await else {
            return;
        };
        let bot_id = ctx.cache.current_user().id;

        // kicked or disconnected by someone else
        if new.user_id == bot_id && new.channel_id.is_none() {
            info!("Disconnected from voice in guild {}", guild_id);
            sessions.teardown(guild_id).await;
            return;
        }

        let channel = session.voice_channel();
        let touched = new.channel_id == Some(channel)
            || old.as_ref().and_then(|state| state.channel_id) == Some(channel);
        if !touched {
            return;
        }

        let listeners = {
            let Some(guild) = ctx.cache.guild(guild_id) else {
                return;
            };
            count_listeners(
                guild.voice_states.values().map(|state| {
                    let is_bot = state
                        .member
                        .as_ref()
                        .map(|member| member.user.bot)
                        .unwrap_or(state.user_id == bot_id);
                    (state.channel_id, is_bot)
                }),
                channel,
            )
        };

        if listeners == 0 {
            sessions.on_channel_empty(guild_id).await;
        } else {
            sessions.on_channel_occupied(guild_id);
        }
    }
}

/// Humans connected to `channel`, given `(channel, is_bot)` per voice state.
fn count_listeners(
    occupants: impl IntoIterator<Item = (Option<ChannelId>, bool)>,
    channel: ChannelId,
) -> usize {
    occupants
        .into_iter()
        .filter(|(occupied, is_bot)| *occupied == Some(channel) && !is_bot)
        .count()
}

fn invocation_context(ctx: &Context, command: &CommandInteraction) -> Option<InvocationContext> {
    let guild_id = command.guild_id?;

    // the cache guard must not live across an await
    let (name, member_count, voice_channel) = match ctx.cache.guild(guild_id) {
        Some(guild) => (
            guild.name.clone(),
            guild.member_count,
            guild
                .voice_states
                .get(&command.user.id)
                .and_then(|state| state.channel_id),
        ),
        None => (guild_id.to_string(), 0, None),
    };

    let is_administrator = command
        .member
        .as_ref()
        .and_then(|member| member.permissions)
        .is_some_and(|permissions| permissions.administrator());

    let arguments: HashMap<String, ArgumentValue> = command
        .data
        .options
        .iter()
        .filter_map(|option| {
            let value = match &option.value {
                CommandDataOptionValue::String(value) => ArgumentValue::String(value.clone()),
                CommandDataOptionValue::Integer(value) => ArgumentValue::Integer(*value),
                CommandDataOptionValue::Boolean(value) => ArgumentValue::Boolean(*value),
                _ => return None,
            };
            Some((option.name.clone(), value))
        })
        .collect();

    Some(InvocationContext {
        caller: Requester {
            id: command.user.id,
            name: command.user.display_name().to_string(),
            avatar_url: command.user.avatar_url(),
        },
        guild: GuildInfo {
            id: guild_id,
            name,
            member_count,
        },
        voice_channel,
        is_administrator,
        arguments,
    })
}

/// Replies to a deferred slash command. The first reply fills in the deferred response,
/// later ones are sent as followups.
struct InteractionResponder<'a> {
    ctx: &'a Context,
    interaction: &'a CommandInteraction,
    colors: EmbedColors,
    responded: AtomicBool,
}

#[async_trait]
impl ResponseChannel for InteractionResponder<'_> {
    async fn defer(&self) -> Result<(), ReplyError> {
        self.interaction.defer(&self.ctx.http).await?;
        Ok(())
    }

    async fn reply(&self, reply: Reply) -> Result<(), ReplyError> {
        let embed = reply.to_embed(&self.colors);

        if self.responded.swap(true, Ordering::AcqRel) {
            self.interaction
                .create_followup(
                    &self.ctx.http,
                    CreateInteractionResponseFollowup::new().embed(embed),
                )
                .await?;
        } else {
            self.interaction
                .edit_response(&self.ctx.http, EditInteractionResponse::new().embed(embed))
                .await?;
        }

        Ok(())
    }
}
