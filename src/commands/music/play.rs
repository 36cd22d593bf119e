use serenity::all::{ChannelId, GuildId};
use serenity::async_trait;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::commands::guards::Guard;
use crate::commands::music::utils::{
    embedded_messages,
    engine::{EngineError, Requester, Track},
    session_manager::SessionError,
};
use crate::commands::{ArgumentKind, ArgumentSpec, CommandDescriptor, CommandHandler, Context};
use crate::utils::embeds::Reply;
use crate::{CommandResult, Data};

/// Why a query could not be played.
#[derive(Error, Debug)]
pub enum PlayError {
    #[error("No results found")]
    NoResults,

    #[error("Top result is a live stream without a known length")]
    UnsupportedSource,

    #[error("Search failed: {0}")]
    Search(#[source] EngineError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// What ended up in the queue for one `/play`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnqueueSummary {
    /// The track that was started or queued first.
    pub first: Track,
    pub total: usize,
    pub is_playlist: bool,
}

impl EnqueueSummary {
    pub fn reply(&self, requester: &Requester) -> Reply {
        if self.is_playlist && self.total > 1 {
            embedded_messages::added_playlist(&self.first, self.total - 1, requester)
        } else {
            embedded_messages::added_to_queue(&self.first, requester)
        }
    }
}

/// Resolve `query` and queue the results in the guild's session.
///
/// Nothing is created or queued unless the search produced a playable top result.
pub async fn resolve_and_enqueue(
    data: &Data,
    requester: &Requester,
    guild_id: GuildId,
    voice_channel: ChannelId,
    query: &str,
) -> Result<EnqueueSummary, PlayError> {
    let result = data
        .engine
        .search(query, requester)
        .await
        .map_err(PlayError::Search)?;

    let Some(top) = result.tracks.first() else {
        return Err(PlayError::NoResults);
    };

    if top.is_unsupported_live() {
        debug!("Rejecting live stream '{}' from {}", top.title, top.source);
        return Err(PlayError::UnsupportedSource);
    }

    let is_playlist = result.is_playlist;
    let mut tracks = result.tracks;
    for track in tracks.iter_mut() {
        track.backfill_thumbnail(&data.config.default_thumbnail);
    }
    let total = tracks.len();

    let session = data
        .sessions
        .get_or_create(guild_id, voice_channel, &data.config.session)
        .await?;
    let first = session.enqueue(data.engine.as_ref(), tracks).await?;

    Ok(EnqueueSummary {
        first,
        total,
        is_playlist,
    })
}

/// Play a song from YouTube or a direct URL
pub struct Play;

pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor::new(
        "play",
        "Add a track or playlist to the queue by searching or using a URL.",
        Play,
    )
    .argument(ArgumentSpec::required(
        "query",
        "Search query or URL.",
        ArgumentKind::String,
    ))
    .guard(Guard::InVoiceChannel)
}

#[async_trait]
impl CommandHandler for Play {
    async fn handle(&self, ctx: Context<'_>) -> CommandResult {
        let invocation = ctx.invocation;
        let Some(query) = invocation.string_argument("query") else {
            return Ok(embedded_messages::missing_argument("query"));
        };
        let Some(voice_channel) = invocation.voice_channel else {
            return Ok(embedded_messages::user_not_in_voice_channel());
        };
        let support_server = ctx.data.config.support_server_url.as_deref();

        info!("Received play command with query: {}", query);

        let result = resolve_and_enqueue(
            ctx.data,
            &invocation.caller,
            invocation.guild.id,
            voice_channel,
            query,
        )
        .await;

        let reply = match result {
            Ok(summary) => {
                info!(
                    "Queued {} track(s) in guild {}, first: '{}'",
                    summary.total, invocation.guild.id, summary.first.title
                );
                summary.reply(&invocation.caller)
            }
            Err(PlayError::NoResults) => embedded_messages::no_results(query),
            Err(PlayError::UnsupportedSource) => {
                embedded_messages::unsupported_source(support_server)
            }
            Err(PlayError::Session(SessionError::QueueFull { max })) => {
                embedded_messages::queue_full(max)
            }
            Err(err @ PlayError::Session(SessionError::Creation(_))) => {
                error!("Failed to join voice channel: {:#?}", err);
                embedded_messages::failed_to_join_voice_channel(support_server)
            }
            Err(err) => {
                error!("Failed to play '{}': {:#?}", query, err);
                embedded_messages::playback_failed(support_server)
            }
        };

        Ok(reply)
    }
}
