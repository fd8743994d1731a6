use async_trait::async_trait;
use serde_json::Value;

use crate::collector::{CommentsInfoItemExtractor, InfoItemsCollector};
use crate::core::CommentsInfoItem;
use crate::error::{ExtractionError, Result};
use crate::extractor::{ExtractorBase, PageFetcher};
use crate::list::{CommentsExtractor, Cursor, ListExtractor, Page, next_cursor, require_cursor};
use crate::parsing::required_str;

use super::items::SoundcloudCommentsInfoItem;
use super::utils::{API_V2_URL, api_json, collection_page, expect_kind, resolve};

/// Comments of one track, oldest first as the api pages them.
pub struct SoundcloudCommentsExtractor {
    base: ExtractorBase<Value>,
}

impl SoundcloudCommentsExtractor {
    pub fn new(base: ExtractorBase<Value>) -> Self {
        Self { base }
    }

    async fn comments_page(&self, url: &str, previous: Option<&Cursor>) -> Result<Page<CommentsInfoItem>> {
        let response = api_json(self.base.downloader(), url, self.base.localization()).await?;
        let (records, candidate) = collection_page(&response);
        let platform = self.base.platform();
        let track_url = self.base.url();
        let mut collector = InfoItemsCollector::new(platform);
        collector.collect(records, |record| {
            SoundcloudCommentsInfoItem { record, track_url }
                .to_item(platform)
                .map(Some)
        })?;
        Ok(Page::from_collector(collector, next_cursor(previous, candidate)))
    }
}

#[async_trait]
impl PageFetcher for SoundcloudCommentsExtractor {
    type Document = Value;

    fn base(&self) -> &ExtractorBase<Value> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ExtractorBase<Value> {
        &mut self.base
    }

    async fn on_fetch_page(&self) -> Result<Value> {
        let track = resolve(self.base.downloader(), self.base.url(), self.base.localization()).await?;
        expect_kind(&track, "track")?;
        Ok(track)
    }

    fn document_name(&self, track: &Value) -> Result<String> {
        required_str(track, "/title", "name")
    }
}

#[async_trait]
impl ListExtractor<CommentsInfoItem> for SoundcloudCommentsExtractor {
    async fn initial_page(&self) -> Result<Page<CommentsInfoItem>> {
        let id = match self.base.document().get("id") {
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(ExtractionError::parsing("track id", "missing")),
        };
        let url = format!(
            "{API_V2_URL}/tracks/{id}/comments?filter_replies=0&threaded=1&limit=20&offset=0&linked_partitioning=1"
        );
        self.comments_page(&url, None).await
    }

    async fn page(&self, cursor: Option<&Cursor>) -> Result<Page<CommentsInfoItem>> {
        let cursor = require_cursor(cursor)?;
        self.comments_page(&cursor.url, Some(cursor)).await
    }
}

impl CommentsExtractor for SoundcloudCommentsExtractor {
    fn is_comments_disabled(&self) -> Result<bool> {
        Ok(self.base.document().get("commentable").and_then(Value::as_bool) == Some(false))
    }
}
