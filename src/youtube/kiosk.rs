use async_trait::async_trait;
use serde_json::Value;

use crate::collector::InfoItemsCollector;
use crate::core::StreamInfoItem;
use crate::error::{ExtractionError, Result};
use crate::extractor::{ExtractorBase, PageFetcher};
use crate::linkhandler::LinkHandler;
use crate::list::{Cursor, KioskExtractor, ListExtractor, Page, next_cursor, require_cursor};
use crate::parsing::{FieldChain, non_empty_str, text_from_object};

use super::items;
use super::utils::{
    BASE_URL, continuation_cursor, continuation_items, continuation_token, error_alert,
    extract_initial_data, fetch_continuation, fetch_html,
};

pub const TRENDING: &str = "Trending";

/// Kiosk ids YouTube offers, default first.
pub const KIOSKS: &[&str] = &[TRENDING];

pub fn trending_link() -> LinkHandler {
    let url = format!("{BASE_URL}/feed/trending");
    LinkHandler::new(TRENDING.to_string(), url.clone(), url)
}

/// Video records of a feed, with section and shelf wrappers taken off.
/// Anything else (continuations included) passes through unchanged.
fn video_records(records: &[Value]) -> Vec<&Value> {
    let mut out = Vec::new();
    for record in records {
        if let Some(contents) = record
            .pointer("/itemSectionRenderer/contents")
            .and_then(Value::as_array)
        {
            out.extend(video_records(contents));
        } else if let Some(items) = record
            .pointer("/shelfRenderer/content/expandedShelfContentsRenderer/items")
            .or_else(|| record.pointer("/shelfRenderer/content/gridRenderer/items"))
            .or_else(|| record.pointer("/richSectionRenderer/content/richShelfRenderer/contents"))
            .and_then(Value::as_array)
        {
            out.extend(items);
        } else {
            out.push(record);
        }
    }
    out
}

/// The trending feed: first page embedded in the feed HTML, further pages
/// through browse continuations.
pub struct YoutubeTrendingExtractor {
    base: ExtractorBase<Value>,
}

impl YoutubeTrendingExtractor {
    pub fn new(base: ExtractorBase<Value>) -> Self {
        Self { base }
    }

    fn tab_records(&self) -> &[Value] {
        let tabs = self
            .base
            .document()
            .pointer("/contents/twoColumnBrowseResultsRenderer/tabs")
            .and_then(Value::as_array);
        // the feed has a single tab when no category is chosen
        let Some(content) = tabs
            .into_iter()
            .flatten()
            .filter_map(|t| t.get("tabRenderer"))
            .find(|t| t.get("selected").and_then(Value::as_bool) != Some(false))
            .and_then(|t| t.get("content"))
        else {
            return &[];
        };

        content
            .pointer("/sectionListRenderer/contents")
            .or_else(|| content.pointer("/richGridRenderer/contents"))
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
        let mut collector = InfoItemsCollector::new(platform);
        let mut token = None;
        collector.collect(video_records(records), |record| {
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
impl PageFetcher for YoutubeTrendingExtractor {
    type Document = Value;

    fn base(&self) -> &ExtractorBase<Value> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ExtractorBase<Value> {
        &mut self.base
    }

    async fn on_fetch_page(&self) -> Result<Value> {
        let localization = self.base.localization();
        let url = match &localization.country_code {
            Some(country) => format!("{}?gl={country}", self.base.url()),
            None => self.base.url().to_string(),
        };
        let html = fetch_html(self.base.downloader(), &url, localization).await?;
        let data = extract_initial_data(&html)?;
        if let Some(message) = error_alert(&data) {
            return Err(ExtractionError::ContentNotAvailable(message));
        }
        Ok(data)
    }

    fn document_name(&self, data: &Value) -> Result<String> {
        FieldChain::new("name")
            .or_lookup(|v| {
                v.pointer("/header/feedTabbedHeaderRenderer/title")
                    .and_then(text_from_object)
            })
            .or_lookup(|v| non_empty_str(v.pointer("/header/pageHeaderRenderer/pageTitle")))
            .or_lookup(|v| {
                non_empty_str(v.pointer("/contents/twoColumnBrowseResultsRenderer/tabs/0/tabRenderer/title"))
            })
            .extract(data)
    }
}

#[async_trait]
impl ListExtractor<StreamInfoItem> for YoutubeTrendingExtractor {
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

impl KioskExtractor for YoutubeTrendingExtractor {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Platform;
    use crate::download::Localization;
    use crate::download::mock::MockDownloader;
    use crate::extractor::Extractor;
    use crate::list::collect_pages;
    use serde_json::json;
    use std::sync::Arc;

    fn video(id: &str, title: &str) -> Value {
        json!({"videoRenderer": {
            "videoId": id,
            "title": {"runs": [{"text": title}]},
            "lengthText": {"simpleText": "3:30"},
            "longBylineText": {"runs": [{"text": "Some Artist", "navigationEndpoint": {"browseEndpoint": {"canonicalBaseUrl": "/@someartist"}}}]}
        }})
    }

    fn trending_html() -> String {
        let data = json!({
            "header": {"feedTabbedHeaderRenderer": {"title": {"runs": [{"text": "Trending"}]}}},
            "contents": {"twoColumnBrowseResultsRenderer": {"tabs": [
                {"tabRenderer": {"title": "Now", "selected": true, "content": {"sectionListRenderer": {"contents": [
                    {"itemSectionRenderer": {"contents": [
                        {"shelfRenderer": {"content": {"expandedShelfContentsRenderer": {"items": [
                            video("aaaaaaaaaaa", "First"),
                            {"videoRenderer": {"videoId": "bbbbbbbbbbb"}},
                            video("ccccccccccc", "Third")
                        ]}}}}
                    ]}},
                    {"continuationItemRenderer": {"continuationEndpoint": {"continuationCommand": {"token": "TRENDING2"}}}}
                ]}}}},
                {"tabRenderer": {"title": "Music", "selected": false}}
            ]}}
        });
        format!("<script>var ytInitialData = {data};</script>")
    }

    fn continuation() -> String {
        json!({"onResponseReceivedActions": [{"appendContinuationItemsAction": {"continuationItems": [
            {"itemSectionRenderer": {"contents": [video("ddddddddddd", "Fourth")]}}
        ]}}]})
        .to_string()
    }

    fn extractor(mock: &Arc<MockDownloader>, localization: Localization) -> YoutubeTrendingExtractor {
        let base = ExtractorBase::new(Platform::YouTube, trending_link(), mock.clone(), localization);
        YoutubeTrendingExtractor::new(base)
    }

    #[tokio::test]
    async fn test_trending_pages() {
        let mock = Arc::new(
            MockDownloader::new()
                .route("\"continuation\":\"TRENDING2\"", &continuation())
                .route("/feed/trending", &trending_html()),
        );
        let mut e = extractor(&mock, Localization::new("en", Some("DE")));

        e.fetch_page().await.unwrap();
        assert_eq!(e.name().unwrap(), "Trending");
        assert_eq!(e.kiosk_id(), TRENDING);
        assert_eq!(e.url(), "https://www.youtube.com/feed/trending");

        let first = e.initial_page().await.unwrap();
        let names: Vec<_> = first.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["First", "Third"]);
        assert_eq!(first.errors.len(), 1);
        assert_eq!(first.next_cursor.as_ref().and_then(|c| c.id.as_deref()), Some("TRENDING2"));
        assert_eq!(mock.calls(), 1);

        let all = collect_pages(&e, None).await.unwrap();
        assert_eq!(all.items.len(), 3);
        assert_eq!(all.items[2].name, "Fourth");
        assert!(all.next_cursor.is_none());

        let urls = mock.urls();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], "https://www.youtube.com/feed/trending?gl=DE");
        assert!(urls[1].contains("youtubei/v1/browse"));
    }

    #[tokio::test]
    async fn test_trending_without_country() {
        let mock = Arc::new(MockDownloader::new().route("/feed/trending", &trending_html()));
        let mut e = extractor(&mock, Localization::new("en", None));
        e.fetch_page().await.unwrap();
        assert_eq!(mock.urls(), ["https://www.youtube.com/feed/trending"]);
    }
}
