use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::collector::{
    ChannelInfoItemExtractor, CommentsInfoItemExtractor, InfoItemExtractor,
    PlaylistInfoItemExtractor, StreamInfoItemExtractor,
};
use crate::core::{Image, InfoItem, Platform, StreamInfoItem, StreamType};
use crate::error::{ExtractionError, Result};
use crate::parsing::{non_empty_str, replace_http_with_https, required_str};

use super::utils::{artwork_images, artwork_or_avatar, parse_date, uploader_name, uploader_url};

fn permalink(record: &Value) -> Result<String> {
    required_str(record, "/permalink_url", "url").map(|u| replace_http_with_https(&u))
}

fn count(record: &Value, key: &str) -> Result<i64> {
    record
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| ExtractionError::parsing(key, "missing"))
}

/// A track record as found in search results, playlists and user pages.
pub struct SoundcloudStreamInfoItem<'a>(pub &'a Value);

impl InfoItemExtractor for SoundcloudStreamInfoItem<'_> {
    fn name(&self) -> Result<String> {
        required_str(self.0, "/title", "name")
    }

    fn url(&self) -> Result<String> {
        permalink(self.0)
    }

    fn thumbnails(&self) -> Result<Vec<Image>> {
        Ok(artwork_or_avatar(self.0))
    }
}

impl StreamInfoItemExtractor for SoundcloudStreamInfoItem<'_> {
    fn stream_type(&self) -> Result<StreamType> {
        Ok(StreamType::AudioStream)
    }

    fn duration(&self) -> Result<i64> {
        count(self.0, "duration").map(|ms| ms / 1000)
    }

    fn view_count(&self) -> Result<i64> {
        count(self.0, "playback_count")
    }

    fn uploader_name(&self) -> Result<Option<String>> {
        Ok(uploader_name(self.0))
    }

    fn uploader_url(&self) -> Result<Option<String>> {
        Ok(uploader_url(self.0))
    }

    fn textual_upload_date(&self) -> Result<Option<String>> {
        Ok(non_empty_str(self.0.get("created_at")))
    }

    fn upload_date(&self) -> Result<Option<DateTime<Utc>>> {
        self.textual_upload_date()?.map(|d| parse_date(&d)).transpose()
    }

    fn short_description(&self) -> Result<Option<String>> {
        Ok(non_empty_str(self.0.get("description")))
    }
}

pub struct SoundcloudPlaylistInfoItem<'a>(pub &'a Value);

impl InfoItemExtractor for SoundcloudPlaylistInfoItem<'_> {
    fn name(&self) -> Result<String> {
        required_str(self.0, "/title", "name")
    }

    fn url(&self) -> Result<String> {
        permalink(self.0)
    }

    /// Playlist artwork, else the first track's artwork or uploader, else the owner.
    fn thumbnails(&self) -> Result<Vec<Image>> {
        if let Some(url) = non_empty_str(self.0.get("artwork_url")) {
            return Ok(artwork_images(&url));
        }
        let from_tracks = self
            .0
            .get("tracks")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(artwork_or_avatar)
            .find(|images| !images.is_empty());
        match from_tracks {
            Some(images) => Ok(images),
            None => Ok(artwork_images(
                &non_empty_str(self.0.pointer("/user/avatar_url")).unwrap_or_default(),
            )),
        }
    }
}

impl PlaylistInfoItemExtractor for SoundcloudPlaylistInfoItem<'_> {
    fn uploader_name(&self) -> Result<Option<String>> {
        Ok(uploader_name(self.0))
    }

    fn stream_count(&self) -> Result<i64> {
        count(self.0, "track_count")
    }
}

pub struct SoundcloudChannelInfoItem<'a>(pub &'a Value);

impl InfoItemExtractor for SoundcloudChannelInfoItem<'_> {
    fn name(&self) -> Result<String> {
        required_str(self.0, "/username", "name")
    }

    fn url(&self) -> Result<String> {
        permalink(self.0)
    }

    fn thumbnails(&self) -> Result<Vec<Image>> {
        Ok(artwork_images(
            &non_empty_str(self.0.get("avatar_url")).unwrap_or_default(),
        ))
    }
}

impl ChannelInfoItemExtractor for SoundcloudChannelInfoItem<'_> {
    fn description(&self) -> Result<Option<String>> {
        Ok(non_empty_str(self.0.get("description")))
    }

    fn subscriber_count(&self) -> Result<i64> {
        count(self.0, "followers_count")
    }

    fn stream_count(&self) -> Result<i64> {
        count(self.0, "track_count")
    }
}

/// A comment; `track_url` is the track it was left on.
pub struct SoundcloudCommentsInfoItem<'a> {
    pub record: &'a Value,
    pub track_url: &'a str,
}

impl InfoItemExtractor for SoundcloudCommentsInfoItem<'_> {
    fn name(&self) -> Result<String> {
        required_str(self.record, "/user/username", "comment author")
    }

    fn url(&self) -> Result<String> {
        Ok(self.track_url.to_string())
    }

    fn thumbnails(&self) -> Result<Vec<Image>> {
        Ok(artwork_images(
            &non_empty_str(self.record.pointer("/user/avatar_url")).unwrap_or_default(),
        ))
    }
}

impl CommentsInfoItemExtractor for SoundcloudCommentsInfoItem<'_> {
    fn comment_id(&self) -> Result<String> {
        match self.record.get("id") {
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            _ => Err(ExtractionError::parsing("comment id", "missing")),
        }
    }

    fn comment_text(&self) -> Result<String> {
        required_str(self.record, "/body", "comment text")
    }

    fn uploader_url(&self) -> Result<Option<String>> {
        Ok(uploader_url(self.record))
    }

    fn textual_upload_date(&self) -> Result<Option<String>> {
        Ok(non_empty_str(self.record.get("created_at")))
    }

    fn upload_date(&self) -> Result<Option<DateTime<Utc>>> {
        self.textual_upload_date()?.map(|d| parse_date(&d)).transpose()
    }

    fn like_count(&self) -> Result<i64> {
        count(self.record, "likes_count")
    }

    fn stream_position(&self) -> Result<i64> {
        count(self.record, "timestamp")
    }
}

pub fn stream_item(platform: Platform, record: &Value) -> Result<Option<StreamInfoItem>> {
    SoundcloudStreamInfoItem(record).to_item(platform).map(Some)
}

/// Search results mix tracks, playlists and users; `kind` tells them apart.
pub fn info_item(platform: Platform, record: &Value) -> Result<Option<InfoItem>> {
    let item = match record.get("kind").and_then(Value::as_str) {
        Some("track") => SoundcloudStreamInfoItem(record).to_item(platform)?.into(),
        Some("playlist") => SoundcloudPlaylistInfoItem(record).to_item(platform)?.into(),
        Some("user") => SoundcloudChannelInfoItem(record).to_item(platform)?.into(),
        _ => return Ok(None),
    };
    Ok(Some(item))
}
