use crate::error::{ExtractionError, Result};
use crate::linkhandler::{LinkHandlerFactory, SearchQueryHandlerFactory, bare_host, parse_url};

use super::utils::{API_V2_URL, BASE_URL};

pub const TRACKS: &str = "tracks";
pub const USERS: &str = "users";
pub const PLAYLIST: &str = "playlist";
pub const ANY: &str = "any";

pub const ITEMS_PER_PAGE: u32 = 10;

/// First path segments that are site pages, not users.
const RESERVED: &[&str] = &[
    "charts", "discover", "imprint", "jobs", "logout", "messages", "mobile", "notifications",
    "pages", "people", "popular", "search", "settings", "signin", "signup", "stream", "tags",
    "terms-of-use", "upload", "you",
];

/// Second segments that name a tab of a user page.
const USER_TABS: &[&str] = &[
    "albums", "comments", "followers", "following", "likes", "popular-tracks", "reposts", "sets",
    "spotlight", "tracks",
];

/// Normalized path segments of a soundcloud.com URL whose owner is not reserved.
fn user_segments(url: &str) -> Result<Vec<String>> {
    let parsed = parse_url(url)?;
    if bare_host(&parsed).as_deref() != Some("soundcloud.com") {
        return Err(ExtractionError::InvalidUrl(format!("not a SoundCloud URL: {url}")));
    }
    let segments: Vec<String> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).map(normalize_segment).collect())
        .unwrap_or_default();
    match segments.first() {
        Some(user) if !RESERVED.contains(&user.as_str()) => Ok(segments),
        _ => Err(ExtractionError::parsing("user", url)),
    }
}

/// Slugs are case-insensitive, private `s-` tokens are not.
fn normalize_segment(segment: &str) -> String {
    if segment.starts_with("s-") {
        segment.to_string()
    } else {
        segment.to_lowercase()
    }
}

fn id_segments(id: &str) -> Vec<&str> {
    id.split('/').collect()
}

fn is_track_path(segments: &[&str]) -> bool {
    match segments {
        [_, track] => !USER_TABS.contains(track),
        [_, track, secret] => !USER_TABS.contains(track) && secret.starts_with("s-"),
        _ => false,
    }
}

fn is_user_path(segments: &[&str]) -> bool {
    segments.len() == 1
}

fn is_playlist_path(segments: &[&str]) -> bool {
    matches!(segments, [_, "sets", name] if !name.is_empty())
}

fn from_url_checked(url: &str, field: &str, check: fn(&[&str]) -> bool) -> Result<String> {
    let segments = user_segments(url)?;
    let view: Vec<&str> = segments.iter().map(String::as_str).collect();
    if !check(&view) {
        return Err(ExtractionError::parsing(field, url));
    }
    Ok(view.join("/"))
}

fn url_checked(id: &str, field: &str, check: fn(&[&str]) -> bool) -> Result<String> {
    if !check(&id_segments(id)) || RESERVED.contains(&id_segments(id)[0]) {
        return Err(ExtractionError::parsing(field, id));
    }
    Ok(format!("{BASE_URL}/{id}"))
}

/// Track ids are `user/track`, with a trailing `s-…` token for private links.
#[derive(Debug, Clone, Copy)]
pub struct SoundcloudStreamLinkHandlerFactory;

impl LinkHandlerFactory for SoundcloudStreamLinkHandlerFactory {
    fn id_from_url(&self, url: &str) -> Result<String> {
        from_url_checked(url, "track id", is_track_path)
    }

    fn url_from_id(&self, id: &str) -> Result<String> {
        url_checked(id, "track id", is_track_path)
    }
}

/// User pages and their tabs all map to the user's permalink.
#[derive(Debug, Clone, Copy)]
pub struct SoundcloudChannelLinkHandlerFactory;

impl LinkHandlerFactory for SoundcloudChannelLinkHandlerFactory {
    fn id_from_url(&self, url: &str) -> Result<String> {
        let segments = user_segments(url)?;
        match segments.as_slice() {
            [user] => Ok(user.clone()),
            [user, tab] if USER_TABS.contains(&tab.as_str()) => Ok(user.clone()),
            _ => Err(ExtractionError::parsing("user id", url)),
        }
    }

    fn url_from_id(&self, id: &str) -> Result<String> {
        url_checked(id, "user id", is_user_path)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SoundcloudPlaylistLinkHandlerFactory;

impl LinkHandlerFactory for SoundcloudPlaylistLinkHandlerFactory {
    fn id_from_url(&self, url: &str) -> Result<String> {
        from_url_checked(url, "playlist id", is_playlist_path)
    }

    fn url_from_id(&self, id: &str) -> Result<String> {
        url_checked(id, "playlist id", is_playlist_path)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SoundcloudSearchQueryHandlerFactory;

impl SearchQueryHandlerFactory for SoundcloudSearchQueryHandlerFactory {
    /// The client id is added when the request is made.
    fn url(&self, query: &str, content_filters: &[String], _sort_filter: &str) -> Result<String> {
        let kind = match content_filters.first().map(String::as_str) {
            Some(TRACKS) => "/tracks",
            Some(USERS) => "/users",
            Some(PLAYLIST) => "/playlists",
            _ => "",
        };
        Ok(format!(
            "{API_V2_URL}/search{kind}?q={}&limit={ITEMS_PER_PAGE}&offset=0",
            urlencoding::encode(query)
        ))
    }

    fn available_content_filters(&self) -> &'static [&'static str] {
        &[TRACKS, USERS, PLAYLIST, ANY]
    }
}
