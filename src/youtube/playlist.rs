use async_trait::async_trait;
use serde_json::Value;

use crate::collector::InfoItemsCollector;
use crate::core::{Image, StreamInfoItem};
use crate::error::{ExtractionError, Result};
use crate::extractor::{ExtractorBase, PageFetcher};
use crate::list::{Cursor, ListExtractor, Page, PlaylistExtractor, next_cursor, require_cursor};
use crate::parsing::{FieldChain, number_at, remove_non_digit_characters, text_from_object};

use super::items;
use super::utils::{
    build_playlist_url, continuation_cursor, continuation_items, continuation_token, error_alert,
    extract_initial_data, fetch_continuation, fetch_html, thumbnails_from,
};

const VIDEO_LIST: &str = "/contents/twoColumnBrowseResultsRenderer/tabs/0/tabRenderer/content/sectionListRenderer/contents/0/itemSectionRenderer/contents/0/playlistVideoListRenderer/contents";
const HEADER: &str = "/header/playlistHeaderRenderer";
const SIDEBAR_PRIMARY: &str = "/sidebar/playlistSidebarRenderer/items/0/playlistSidebarPrimaryInfoRenderer";
const SIDEBAR_OWNER: &str = "/sidebar/playlistSidebarRenderer/items/1/playlistSidebarSecondaryInfoRenderer/videoOwner/videoOwnerRenderer";

pub struct YoutubePlaylistExtractor {
    base: ExtractorBase<Value>,
}

impl YoutubePlaylistExtractor {
    pub fn new(base: ExtractorBase<Value>) -> Self {
        Self { base }
    }

    fn collect_videos(&self, records: &[Value], previous: Option<&Cursor>) -> Result<Page<StreamInfoItem>> {
        let platform = self.base.platform();
        let mut collector = InfoItemsCollector::new(platform);
        let mut token = None;
        collector.collect(records, |record| {
            if let Some(t) = continuation_token(record) {
                token = Some(t);
                return Ok(None);
            }
            items::stream_item(platform, record)
        })?;

        let candidate = token.map(|t| continuation_cursor("browse", &t));
        Ok(Page::from_collector(collector, next_cursor(previous, candidate)))
    }
}

#[async_trait]
impl PageFetcher for YoutubePlaylistExtractor {
    type Document = Value;

    fn base(&self) -> &ExtractorBase<Value> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ExtractorBase<Value> {
        &mut self.base
    }

    async fn on_fetch_page(&self) -> Result<Value> {
        let url = build_playlist_url(self.base.id());
        let html = fetch_html(self.base.downloader(), &url, self.base.localization()).await?;
        let data = extract_initial_data(&html)?;
        if let Some(message) = error_alert(&data) {
            return Err(ExtractionError::ContentNotAvailable(message));
        }
        Ok(data)
    }

    fn document_name(&self, data: &Value) -> Result<String> {
        FieldChain::new("name")
            .or_lookup(|v| crate::parsing::non_empty_str(v.pointer("/metadata/playlistMetadataRenderer/title")))
            .or_lookup(|v| v.pointer(&format!("{HEADER}/title")).and_then(text_from_object))
            .or_lookup(|v| v.pointer(&format!("{SIDEBAR_PRIMARY}/title")).and_then(text_from_object))
            .or_lookup(|v| v.pointer("/header/pageHeaderRenderer/pageTitle").and_then(Value::as_str).map(str::to_string))
            .extract(data)
    }
}

#[async_trait]
impl ListExtractor<StreamInfoItem> for YoutubePlaylistExtractor {
    async fn initial_page(&self) -> Result<Page<StreamInfoItem>> {
        let records = self
            .base
            .document()
            .pointer(VIDEO_LIST)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        self.collect_videos(records, None)
    }

    async fn page(&self, cursor: Option<&Cursor>) -> Result<Page<StreamInfoItem>> {
        let cursor = require_cursor(cursor)?;
        let response =
            fetch_continuation(self.base.downloader(), cursor, self.base.localization()).await?;
        self.collect_videos(&continuation_items(&response), Some(cursor))
    }
}

#[async_trait]
impl PlaylistExtractor for YoutubePlaylistExtractor {
    fn uploader_name(&self) -> Result<Option<String>> {
        FieldChain::new("uploader name")
            .or_lookup(|v| v.pointer(&format!("{HEADER}/ownerText")).and_then(text_from_object))
            .or_lookup(|v| v.pointer(&format!("{SIDEBAR_OWNER}/title")).and_then(text_from_object))
            .extract_optional(self.base.document())
    }

    fn uploader_url(&self) -> Result<Option<String>> {
        FieldChain::new("uploader url")
            .or_lookup(|v| {
                v.pointer(&format!("{HEADER}/ownerText/runs/0/navigationEndpoint"))
                    .or_else(|| v.pointer(&format!("{SIDEBAR_OWNER}/navigationEndpoint")))
                    .and_then(crate::parsing::url_from_navigation_endpoint)
            })
            .extract_optional(self.base.document())
    }

    fn stream_count(&self) -> Result<i64> {
        let parse = |text: String| -> Result<Option<i64>> {
            remove_non_digit_characters(&text)
                .parse()
                .map(Some)
                .map_err(|_| ExtractionError::parsing("stream count", text))
        };
        FieldChain::new("stream count")
            .or_lookup(|v| number_at(v, &format!("{HEADER}/numVideosText/runs/0/text")))
            .or_try(|v| match v.pointer(&format!("{HEADER}/numVideosText")).and_then(text_from_object) {
                Some(text) => parse(text),
                None => Ok(None),
            })
            .or_try(|v| match v.pointer(&format!("{SIDEBAR_PRIMARY}/stats/0")).and_then(text_from_object) {
                Some(text) => parse(text),
                None => Ok(None),
            })
            .extract(self.base.document())
    }

    fn thumbnails(&self) -> Result<Vec<Image>> {
        let data = self.base.document();
        let images = thumbnails_from(data.pointer("/microformat/microformatDataRenderer/thumbnail"));
        if !images.is_empty() {
            return Ok(images);
        }
        Ok(thumbnails_from(data.pointer(&format!(
            "{SIDEBAR_PRIMARY}/thumbnailRenderer/playlistVideoThumbnailRenderer/thumbnail"
        ))))
    }
}
