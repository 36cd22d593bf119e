//! Converts `yt-dlp -J --flat-playlist` output into tracks.
//!
//! yt-dlp prints a single JSON document. For a video it describes the video itself; for a
//! playlist, or a `ytsearchN:` query, it wraps the items in `entries`.

use std::time::Duration;

use serde::Deserialize;

use super::engine::{EngineError, Requester, SearchResult, Track, TrackSource};

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct Entry {
    title: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    #[serde(default)]
    thumbnails: Vec<Thumbnail>,
    is_live: Option<bool>,
    live_status: Option<String>,
    extractor_key: Option<String>,
    ie_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Output {
    #[serde(rename = "_type")]
    kind: Option<String>,
    entries: Option<Vec<Entry>>,
    #[serde(flatten)]
    item: Entry,
}

impl Entry {
    fn into_track(self, requested_by: &Requester) -> Option<Track> {
        let url = self.webpage_url.or(self.url)?;
        let source = self
            .extractor_key
            .or(self.ie_key)
            .map(|key| TrackSource::from_extractor(&key))
            .unwrap_or(TrackSource::Arbitrary);
        let is_live = self.is_live.unwrap_or(false)
            || self.live_status.as_deref() == Some("is_live");
        let duration = self
            .duration
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or_default();
        // flat entries only list thumbnails, the last one is the largest
        let thumbnail = self
            .thumbnail
            .or_else(|| self.thumbnails.into_iter().last().map(|thumb| thumb.url));

        Some(Track {
            title: self.title.unwrap_or_else(|| "Unknown Title".to_string()),
            url,
            duration,
            source,
            thumbnail,
            requested_by: requested_by.clone(),
            is_live,
        })
    }
}

/// Parse yt-dlp's JSON for `query`. Search results are never reported as playlists.
pub fn parse_output(
    stdout: &[u8],
    from_search: bool,
    requested_by: &Requester,
) -> Result<SearchResult, EngineError> {
    let output: Output = serde_json::from_slice(stdout)
        .map_err(|e| EngineError::Search(format!("Failed to parse yt-dlp output: {}", e)))?;

    let is_playlist = output.kind.as_deref() == Some("playlist") && !from_search;

    let tracks = match output.entries {
        Some(entries) => entries
            .into_iter()
            .filter_map(|entry| entry.into_track(requested_by))
            .collect(),
        None => output.item.into_track(requested_by).into_iter().collect(),
    };

    Ok(SearchResult {
        tracks,
        is_playlist,
    })
}
