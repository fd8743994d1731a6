use async_trait::async_trait;
use serde_json::Value;

use crate::collector::InfoItemsCollector;
use crate::core::{Image, StreamInfoItem};
use crate::error::{ExtractionError, Result};
use crate::extractor::{ExtractorBase, PageFetcher};
use crate::list::{ChannelExtractor, Cursor, ListExtractor, Page, next_cursor, require_cursor};
use crate::parsing::{FieldChain, mixed_number_word_to_long, non_empty_str, text_from_object};

use super::items;
use super::utils::{
    BASE_URL, continuation_cursor, continuation_items, continuation_token, error_alert,
    extract_initial_data, fetch_continuation, fetch_html, thumbnails_from,
};

const METADATA: &str = "/metadata/channelMetadataRenderer";
const HEADER: &str = "/header/c4TabbedHeaderRenderer";

pub struct YoutubeChannelExtractor {
    base: ExtractorBase<Value>,
}

impl YoutubeChannelExtractor {
    pub fn new(base: ExtractorBase<Value>) -> Self {
        Self { base }
    }

    /// Contents of the selected tab (the videos tab we asked for).
    fn tab_records(&self) -> &[Value] {
        let tabs = self
            .base
            .document()
            .pointer("/contents/twoColumnBrowseResultsRenderer/tabs")
            .and_then(Value::as_array);
        let Some(content) = tabs
            .into_iter()
            .flatten()
            .filter_map(|t| t.get("tabRenderer"))
            .find(|t| t.get("selected").and_then(Value::as_bool) == Some(true))
            .and_then(|t| t.get("content"))
        else {
            return &[];
        };

        content
            .pointer("/richGridRenderer/contents")
            .or_else(|| {
                content.pointer(
                    "/sectionListRenderer/contents/0/itemSectionRenderer/contents/0/gridRenderer/items",
                )
            })
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn collect_videos(
        &self,
        records: &[Value],
        previous: Option<&Cursor>,
    ) -> Result<Page<StreamInfoItem>> {
        let platform = self.base.platform();
        // grid records carry no byline, the channel is the uploader
        let uploader_name = self.name_or_none();
        let uploader_url = self.base.url().to_string();

        let mut collector = InfoItemsCollector::new(platform);
        let mut token = None;
        collector.collect(records, |record| {
            if let Some(t) = continuation_token(record) {
                token = Some(t);
                return Ok(None);
            }
            Ok(items::stream_item(platform, record)?.map(|mut item| {
                if item.uploader_name.is_none() {
                    item.uploader_name = uploader_name.clone();
                    item.uploader_url = Some(uploader_url.clone());
                }
                item
            }))
        })?;

        let candidate = token.map(|t| continuation_cursor("browse", &t));
        Ok(Page::from_collector(collector, next_cursor(previous, candidate)))
    }

    fn name_or_none(&self) -> Option<String> {
        self.document_name(self.base.document()).ok()
    }
}

#[async_trait]
impl PageFetcher for YoutubeChannelExtractor {
    type Document = Value;

    fn base(&self) -> &ExtractorBase<Value> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ExtractorBase<Value> {
        &mut self.base
    }

    async fn on_fetch_page(&self) -> Result<Value> {
        let url = format!("{}/videos", self.base.url());
        let html = fetch_html(self.base.downloader(), &url, self.base.localization()).await?;
        let data = extract_initial_data(&html)?;
        if let Some(message) = error_alert(&data) {
            return Err(ExtractionError::ContentNotAvailable(message));
        }
        Ok(data)
    }

    fn document_name(&self, data: &Value) -> Result<String> {
        FieldChain::new("name")
            .or_lookup(|v| non_empty_str(v.pointer(&format!("{METADATA}/title"))))
            .or_lookup(|v| non_empty_str(v.pointer(&format!("{HEADER}/title"))))
            .or_lookup(|v| {
                v.pointer("/header/pageHeaderRenderer/pageTitle")
                    .and_then(|t| non_empty_str(Some(t)))
            })
            .extract(data)
    }
}

#[async_trait]
impl ListExtractor<StreamInfoItem> for YoutubeChannelExtractor {
    async fn initial_page(&self) -> Result<Page<StreamInfoItem>> {
        self.collect_videos(self.tab_records(), None)
    }

    async fn page(&self, cursor: Option<&Cursor>) -> Result<Page<StreamInfoItem>> {
        let cursor = require_cursor(cursor)?;
        let response =
            fetch_continuation(self.base.downloader(), cursor, self.base.localization()).await?;
        self.collect_videos(&continuation_items(&response), Some(cursor))
    }
}

#[async_trait]
impl ChannelExtractor for YoutubeChannelExtractor {
    fn avatars(&self) -> Result<Vec<Image>> {
        let data = self.base.document();
        let images = thumbnails_from(data.pointer(&format!("{METADATA}/avatar")));
        if !images.is_empty() {
            return Ok(images);
        }
        Ok(thumbnails_from(data.pointer(&format!("{HEADER}/avatar"))))
    }

    fn banners(&self) -> Result<Vec<Image>> {
        Ok(thumbnails_from(
            self.base.document().pointer(&format!("{HEADER}/banner")),
        ))
    }

    fn subscriber_count(&self) -> Result<i64> {
        let text = FieldChain::new("subscriber count")
            .or_lookup(|v| {
                v.pointer(&format!("{HEADER}/subscriberCountText"))
                    .and_then(text_from_object)
            })
            .extract(self.base.document())?;
        mixed_number_word_to_long(&text)
    }

    fn description(&self) -> Result<Option<String>> {
        Ok(non_empty_str(
            self.base
                .document()
                .pointer(&format!("{METADATA}/description")),
        ))
    }

    fn feed_url(&self) -> Result<Option<String>> {
        let metadata = self.base.document().pointer(METADATA);
        Ok(metadata
            .and_then(|m| non_empty_str(m.get("rssUrl")))
            .or_else(|| {
                metadata
                    .and_then(|m| non_empty_str(m.get("externalId")))
                    .map(|id| format!("{BASE_URL}/feeds/videos.xml?channel_id={id}"))
            }))
    }
}
