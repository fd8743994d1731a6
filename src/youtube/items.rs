//! Renderer records found in search results, feeds and playlists.

use serde_json::Value;

use crate::collector::{
    ChannelInfoItemExtractor, InfoItemExtractor, PlaylistInfoItemExtractor,
    StreamInfoItemExtractor,
};
use crate::core::{Image, InfoItem, Platform, StreamInfoItem, StreamType};
use crate::error::{ExtractionError, Result};
use crate::parsing::{
    FieldChain, mixed_number_word_to_long, number_at, parse_duration_string,
    remove_non_digit_characters, text_from_object, url_from_navigation_endpoint,
};

use super::utils::{BASE_URL, build_playlist_url, build_watch_url, thumbnails_from};

const STREAM_RENDERERS: &[&str] = &[
    "videoRenderer",
    "compactVideoRenderer",
    "gridVideoRenderer",
    "playlistVideoRenderer",
    "playlistPanelVideoRenderer",
];

const BYLINES: &[&str] = &["/longBylineText", "/ownerText", "/shortBylineText"];

/// Unwrap `richItemRenderer` and `richSectionRenderer` wrappers.
fn unwrap_record(record: &Value) -> &Value {
    record
        .pointer("/richItemRenderer/content")
        .unwrap_or(record)
}

fn renderer<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let record = unwrap_record(record);
    keys.iter().find_map(|key| record.get(*key))
}

/// Stream item from any supported record, `None` for other record kinds,
/// ads and placeholders.
pub fn stream_item(platform: Platform, record: &Value) -> Result<Option<StreamInfoItem>> {
    let Some(video) = renderer(record, STREAM_RENDERERS) else {
        return Ok(None);
    };
    let extractor = YoutubeStreamInfoItem(video);
    if extractor.is_ad() {
        return Ok(None);
    }
    extractor.to_item(platform).map(Some)
}

/// Any item a search can return.
pub fn info_item(platform: Platform, record: &Value) -> Result<Option<InfoItem>> {
    if let Some(channel) = renderer(record, &["channelRenderer"]) {
        return YoutubeChannelInfoItem(channel)
            .to_item(platform)
            .map(|i| Some(i.into()));
    }
    if let Some(playlist) = renderer(record, &["playlistRenderer"]) {
        return YoutubePlaylistInfoItem(playlist)
            .to_item(platform)
            .map(|i| Some(i.into()));
    }
    Ok(stream_item(platform, record)?.map(InfoItem::from))
}

pub struct YoutubeStreamInfoItem<'a>(pub &'a Value);

impl YoutubeStreamInfoItem<'_> {
    fn badge_labels(&self) -> impl Iterator<Item = &str> {
        self.0
            .get("badges")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|b| b.pointer("/metadataBadgeRenderer/label").and_then(Value::as_str))
    }

    fn is_premium(&self) -> bool {
        self.badge_labels().any(|label| label == "Premium")
    }

    fn is_live(&self) -> bool {
        self.badge_labels().any(|label| label == "LIVE NOW" || label == "LIVE")
            || self
                .0
                .pointer("/thumbnailOverlays/0/thumbnailOverlayTimeStatusRenderer/style")
                .and_then(Value::as_str)
                == Some("LIVE")
    }
}

impl InfoItemExtractor for YoutubeStreamInfoItem<'_> {
    fn name(&self) -> Result<String> {
        FieldChain::texts("name", &["/title", "/headline"]).extract(self.0)
    }

    fn url(&self) -> Result<String> {
        FieldChain::strings("url", &["/videoId"])
            .extract(self.0)
            .map(|id| build_watch_url(&id))
    }

    fn thumbnails(&self) -> Result<Vec<Image>> {
        Ok(thumbnails_from(self.0.get("thumbnail")))
    }
}

impl StreamInfoItemExtractor for YoutubeStreamInfoItem<'_> {
    fn stream_type(&self) -> Result<StreamType> {
        Ok(if self.is_live() {
            StreamType::LiveStream
        } else {
            StreamType::VideoStream
        })
    }

    fn duration(&self) -> Result<i64> {
        if self.is_live() {
            return Ok(-1);
        }
        FieldChain::new("duration")
            .or_lookup(|v| number_at(v, "/lengthSeconds"))
            .or_try(|v| match v.get("lengthText").and_then(text_from_object) {
                Some(text) => parse_duration_string(&text).map(Some),
                None => Ok(None),
            })
            .or_try(|v| {
                let overlay = v
                    .get("thumbnailOverlays")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .find_map(|o| o.pointer("/thumbnailOverlayTimeStatusRenderer/text"))
                    .and_then(text_from_object);
                match overlay {
                    Some(text) => parse_duration_string(&text).map(Some),
                    None => Ok(None),
                }
            })
            .extract(self.0)
    }

    fn view_count(&self) -> Result<i64> {
        if self.0.get("topStandaloneBadge").is_some() || self.is_premium() {
            return Ok(-1);
        }
        let text = FieldChain::texts("view count", &["/viewCountText", "/shortViewCountText"])
            .extract(self.0)?;
        if text.to_lowercase().starts_with("no views") {
            return Ok(0);
        }
        // "1.2M views" on compact renderers, "1,234,567 views" elsewhere
        if text.contains(['K', 'M', 'B']) {
            return mixed_number_word_to_long(&text);
        }
        Ok(remove_non_digit_characters(&text).parse().unwrap_or(-1))
    }

    fn uploader_name(&self) -> Result<Option<String>> {
        FieldChain::texts("uploader name", BYLINES).extract_optional(self.0)
    }

    fn uploader_url(&self) -> Result<Option<String>> {
        let mut chain = FieldChain::new("uploader url");
        for byline in BYLINES {
            chain = chain.or_lookup(move |v| {
                v.pointer(&format!("{byline}/runs/0/navigationEndpoint"))
                    .and_then(url_from_navigation_endpoint)
            });
        }
        chain.extract_optional(self.0)
    }

    fn textual_upload_date(&self) -> Result<Option<String>> {
        FieldChain::texts("upload date", &["/publishedTimeText"]).extract_optional(self.0)
    }

    fn short_description(&self) -> Result<Option<String>> {
        FieldChain::new("description")
            .or_lookup(|v| {
                v.pointer("/detailedMetadataSnippets/0/snippetText")
                    .and_then(text_from_object)
            })
            .or_lookup(|v| v.get("descriptionSnippet").and_then(text_from_object))
            .extract_optional(self.0)
    }

    fn is_ad(&self) -> bool {
        if self.is_premium() {
            return true;
        }
        if self.0.get("isPlayable").and_then(Value::as_bool) == Some(false) {
            return true;
        }
        matches!(
            self.name().as_deref(),
            Ok("[Private video]") | Ok("[Deleted video]")
        )
    }
}

pub struct YoutubeChannelInfoItem<'a>(pub &'a Value);

impl InfoItemExtractor for YoutubeChannelInfoItem<'_> {
    fn name(&self) -> Result<String> {
        FieldChain::texts("name", &["/title"]).extract(self.0)
    }

    fn url(&self) -> Result<String> {
        FieldChain::new("url")
            .or_lookup(|v| {
                v.get("navigationEndpoint")
                    .and_then(url_from_navigation_endpoint)
            })
            .or_lookup(|v| {
                v.get("channelId")
                    .and_then(Value::as_str)
                    .map(|id| format!("{BASE_URL}/channel/{id}"))
            })
            .extract(self.0)
    }

    fn thumbnails(&self) -> Result<Vec<Image>> {
        Ok(thumbnails_from(self.0.get("thumbnail")))
    }
}

impl ChannelInfoItemExtractor for YoutubeChannelInfoItem<'_> {
    fn description(&self) -> Result<Option<String>> {
        FieldChain::texts("description", &["/descriptionSnippet"]).extract_optional(self.0)
    }

    fn subscriber_count(&self) -> Result<i64> {
        // Handles moved the subscriber count into videoCountText.
        let text = FieldChain::texts("subscriber count", &["/subscriberCountText", "/videoCountText"])
            .extract(self.0)?;
        if !text.to_lowercase().contains("subscriber") {
            return Err(ExtractionError::parsing("subscriber count", text));
        }
        mixed_number_word_to_long(&text)
    }

    fn stream_count(&self) -> Result<i64> {
        let text = FieldChain::texts("stream count", &["/videoCountText"]).extract(self.0)?;
        if text.to_lowercase().contains("subscriber") {
            return Ok(-1);
        }
        remove_non_digit_characters(&text)
            .parse()
            .map_err(|_| ExtractionError::parsing("stream count", text))
    }
}

pub struct YoutubePlaylistInfoItem<'a>(pub &'a Value);

impl InfoItemExtractor for YoutubePlaylistInfoItem<'_> {
    fn name(&self) -> Result<String> {
        FieldChain::texts("name", &["/title"]).extract(self.0)
    }

    fn url(&self) -> Result<String> {
        FieldChain::strings("url", &["/playlistId"])
            .extract(self.0)
            .map(|id| build_playlist_url(&id))
    }

    fn thumbnails(&self) -> Result<Vec<Image>> {
        let images = thumbnails_from(self.0.pointer("/thumbnails/0"));
        if images.is_empty() {
            return Ok(thumbnails_from(self.0.get("thumbnail")));
        }
        Ok(images)
    }
}

impl PlaylistInfoItemExtractor for YoutubePlaylistInfoItem<'_> {
    fn uploader_name(&self) -> Result<Option<String>> {
        FieldChain::texts("uploader name", BYLINES).extract_optional(self.0)
    }

    fn stream_count(&self) -> Result<i64> {
        FieldChain::new("stream count")
            .or_lookup(|v| number_at(v, "/videoCount"))
            .or_try(|v| match v.get("videoCountText").and_then(text_from_object) {
                Some(text) => remove_non_digit_characters(&text)
                    .parse()
                    .map(Some)
                    .map_err(|_| ExtractionError::parsing("stream count", text)),
                None => Ok(None),
            })
            .extract(self.0)
    }
}
