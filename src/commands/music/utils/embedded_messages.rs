use crate::utils::embeds::Reply;

use super::engine::{Requester, Track};
use super::format_duration;

/// Appended to failure replies when a support server is configured
pub(crate) fn bug_report_footer(support_server: Option<&str>) -> String {
    match support_server {
        Some(url) => format!(
            "\n\n_If you think that this is incorrect, please submit a bug report in the bot [support server]({})._",
            url
        ),
        None => String::new(),
    }
}

/// "`[3:45]` " for tracks with a known length, nothing otherwise
fn duration_prefix(track: &Track) -> String {
    if track.duration.is_zero() {
        String::new()
    } else {
        format!("`[{}]` ", format_duration(track.duration))
    }
}

fn track_line(track: &Track) -> String {
    format!("{}**[{}]({})**", duration_prefix(track), track.title, track.url)
}

/// Create a reply for when a user is not connected to a voice channel
pub fn user_not_in_voice_channel() -> Reply {
    Reply::warning("**Failed**\nYou need to be in a voice channel to use this command.")
}

/// Create a reply for when the guild has no playback session
pub fn no_active_session() -> Reply {
    Reply::warning(
        "**Failed**\nNo tracks are currently playing, and the queue is empty. Use the `/play` command to play some music!",
    )
}

/// Create a reply for when a required command option is missing
pub fn missing_argument(name: &str) -> Reply {
    Reply::warning(format!("**Failed**\nMissing required option `{}`.", name))
}

/// Create a reply for when the search returned nothing
pub fn no_results(query: &str) -> Reply {
    Reply::warning(format!("**No track found**\nNo results found for `{}`.", query))
}

/// Create a reply for live streams that the engine cannot play
pub fn unsupported_source(support_server: Option<&str>) -> Reply {
    Reply::warning(format!(
        "**Unsupported Source**\nThis audio source is a YouTube live stream, which is currently not a supported format.{}",
        bug_report_footer(support_server)
    ))
}

/// Create a reply for when the queue cannot take more tracks
pub fn queue_full(max: usize) -> Reply {
    Reply::warning(format!(
        "**Queue full**\nThe queue can hold at most **{}** tracks. Remove some before adding more.",
        max
    ))
}

/// Create a reply for when the bot fails to join the caller's voice channel
pub fn failed_to_join_voice_channel(support_server: Option<&str>) -> Reply {
    Reply::error(format!(
        "**Failed**\nI could not join your voice channel. Please check that I have permission to connect and speak there.{}",
        bug_report_footer(support_server)
    ))
}

/// Create a reply for when the engine fails to search or start playback
pub fn playback_failed(support_server: Option<&str>) -> Reply {
    Reply::error(format!(
        "**Playback Error**\nSomething went wrong while loading that track. Please try again.{}",
        bug_report_footer(support_server)
    ))
}

/// Create a reply for a single track added to the queue
pub fn added_to_queue(track: &Track, requester: &Requester) -> Reply {
    Reply::success(format!("**Added to queue**\n{}", track_line(track)))
        .with_author(requester)
        .with_thumbnail(track.thumbnail.clone())
}

/// Create a reply for a playlist added to the queue
pub fn added_playlist(track: &Track, remaining: usize, requester: &Requester) -> Reply {
    Reply::success(format!(
        "**Added playlist to queue**\n{}\n\nAnd **{}** more tracks...",
        track_line(track),
        remaining
    ))
    .with_author(requester)
    .with_thumbnail(track.thumbnail.clone())
}

/// Create a reply for when the bot leaves a voice channel
pub fn left_voice_channel() -> Reply {
    Reply::success(
        "**Leaving**\nCleared the track queue and left voice channel. To play more music, use the `/play` command!",
    )
}
