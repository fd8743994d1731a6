use crate::error::{ExtractionError, Result};
use crate::linkhandler::{
    LinkHandlerFactory, SearchQueryHandlerFactory, bare_host, parse_url, query_param,
};

use super::utils::{
    BASE_URL, build_playlist_url, build_search_url, build_watch_url, is_valid_playlist_id,
    is_valid_video_id, is_youtube_host,
};

pub const VIDEOS: &str = "videos";
pub const CHANNELS: &str = "channels";
pub const PLAYLISTS: &str = "playlists";
pub const ALL: &str = "all";

fn youtube_url(url: &str) -> Result<(url::Url, String)> {
    let parsed = parse_url(url)?;
    match bare_host(&parsed) {
        Some(host) if is_youtube_host(&host) => Ok((parsed, host)),
        _ => Err(ExtractionError::InvalidUrl(format!("not a YouTube URL: {url}"))),
    }
}

fn segments(url: &url::Url) -> Vec<&str> {
    url.path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy)]
pub struct YoutubeStreamLinkHandlerFactory;

impl LinkHandlerFactory for YoutubeStreamLinkHandlerFactory {
    fn id_from_url(&self, url: &str) -> Result<String> {
        let (parsed, host) = youtube_url(url)?;
        let path = segments(&parsed);

        let candidate = if host == "youtu.be" {
            path.first().map(|s| s.to_string())
        } else {
            match path.as_slice() {
                ["watch", ..] => query_param(&parsed, "v"),
                ["shorts" | "embed" | "live" | "v", id, ..] => Some(id.to_string()),
                _ => None,
            }
        };

        candidate
            .filter(|id| is_valid_video_id(id))
            .ok_or_else(|| ExtractionError::parsing("video id", url))
    }

    fn url_from_id(&self, id: &str) -> Result<String> {
        if !is_valid_video_id(id) {
            return Err(ExtractionError::parsing("video id", id));
        }
        Ok(build_watch_url(id))
    }
}

/// Channel ids keep their path prefix: `channel/UC…`, `user/name`, `c/name`, `@handle`.
#[derive(Debug, Clone, Copy)]
pub struct YoutubeChannelLinkHandlerFactory;

impl LinkHandlerFactory for YoutubeChannelLinkHandlerFactory {
    fn id_from_url(&self, url: &str) -> Result<String> {
        let (parsed, host) = youtube_url(url)?;
        if host != "youtube.com" && host != "music.youtube.com" {
            return Err(ExtractionError::InvalidUrl(url.to_string()));
        }
        match segments(&parsed).as_slice() {
            [kind @ ("channel" | "user" | "c"), name, ..] if !name.is_empty() => {
                Ok(format!("{kind}/{name}"))
            }
            [handle, ..] if handle.starts_with('@') && handle.len() > 1 => Ok(handle.to_string()),
            _ => Err(ExtractionError::parsing("channel id", url)),
        }
    }

    fn url_from_id(&self, id: &str) -> Result<String> {
        let valid = id.starts_with('@')
            || ["channel/", "user/", "c/"]
                .iter()
                .any(|prefix| id.len() > prefix.len() && id.starts_with(prefix));
        if !valid {
            return Err(ExtractionError::parsing("channel id", id));
        }
        Ok(format!("{BASE_URL}/{id}"))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct YoutubePlaylistLinkHandlerFactory;

impl LinkHandlerFactory for YoutubePlaylistLinkHandlerFactory {
    fn id_from_url(&self, url: &str) -> Result<String> {
        let (parsed, _) = youtube_url(url)?;
        query_param(&parsed, "list")
            .filter(|id| is_valid_playlist_id(id))
            .ok_or_else(|| ExtractionError::parsing("playlist id", url))
    }

    fn url_from_id(&self, id: &str) -> Result<String> {
        if !is_valid_playlist_id(id) {
            return Err(ExtractionError::parsing("playlist id", id));
        }
        Ok(build_playlist_url(id))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct YoutubeSearchQueryHandlerFactory;

impl YoutubeSearchQueryHandlerFactory {
    /// InnerTube `params` value selecting one result kind.
    pub fn search_params(content_filters: &[String]) -> Option<&'static str> {
        match content_filters.first().map(String::as_str) {
            Some(VIDEOS) => Some("EgIQAQ=="),
            Some(CHANNELS) => Some("EgIQAg=="),
            Some(PLAYLISTS) => Some("EgIQAw=="),
            _ => None,
        }
    }
}

impl SearchQueryHandlerFactory for YoutubeSearchQueryHandlerFactory {
    fn url(&self, query: &str, content_filters: &[String], _sort_filter: &str) -> Result<String> {
        Ok(build_search_url(query, Self::search_params(content_filters)))
    }

    fn available_content_filters(&self) -> &'static [&'static str] {
        &[ALL, VIDEOS, CHANNELS, PLAYLISTS]
    }
}
