use async_trait::async_trait;
use serde_json::Value;

use crate::collector::InfoItemsCollector;
use crate::core::{Image, StreamInfoItem};
use crate::error::{ExtractionError, Result};
use crate::extractor::{ExtractorBase, PageFetcher};
use crate::list::{ChannelExtractor, Cursor, ListExtractor, Page, next_cursor, require_cursor};
use crate::parsing::{non_empty_str, required_str};

use super::items;
use super::utils::{API_V2_URL, api_json, artwork_images, collection_page, expect_kind, resolve};

pub struct SoundcloudChannelExtractor {
    base: ExtractorBase<Value>,
}

impl SoundcloudChannelExtractor {
    pub fn new(base: ExtractorBase<Value>) -> Self {
        Self { base }
    }

    fn user(&self) -> &Value {
        self.base.document()
    }

    fn user_id(&self) -> Result<String> {
        match self.user().get("id") {
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(ExtractionError::parsing("user id", "missing")),
        }
    }

    async fn tracks_page(&self, url: &str, previous: Option<&Cursor>) -> Result<Page<StreamInfoItem>> {
        let response = api_json(self.base.downloader(), url, self.base.localization()).await?;
        let (records, candidate) = collection_page(&response);
        let platform = self.base.platform();
        let mut collector = InfoItemsCollector::new(platform);
        collector.collect(records, |record| items::stream_item(platform, record))?;
        Ok(Page::from_collector(collector, next_cursor(previous, candidate)))
    }
}

#[async_trait]
impl PageFetcher for SoundcloudChannelExtractor {
    type Document = Value;

    fn base(&self) -> &ExtractorBase<Value> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ExtractorBase<Value> {
        &mut self.base
    }

    async fn on_fetch_page(&self) -> Result<Value> {
        let user = resolve(self.base.downloader(), self.base.url(), self.base.localization()).await?;
        expect_kind(&user, "user")?;
        Ok(user)
    }

    fn document_name(&self, user: &Value) -> Result<String> {
        required_str(user, "/username", "name")
    }
}

#[async_trait]
impl ListExtractor<StreamInfoItem> for SoundcloudChannelExtractor {
    /// Tracks are not part of the user object; this is one more request.
    async fn initial_page(&self) -> Result<Page<StreamInfoItem>> {
        let url = format!(
            "{API_V2_URL}/users/{}/tracks?limit=20&linked_partitioning=1",
            self.user_id()?
        );
        self.tracks_page(&url, None).await
    }

    async fn page(&self, cursor: Option<&Cursor>) -> Result<Page<StreamInfoItem>> {
        let cursor = require_cursor(cursor)?;
        self.tracks_page(&cursor.url, Some(cursor)).await
    }
}

impl ChannelExtractor for SoundcloudChannelExtractor {
    fn avatars(&self) -> Result<Vec<Image>> {
        Ok(artwork_images(
            &non_empty_str(self.user().get("avatar_url")).unwrap_or_default(),
        ))
    }

    fn banners(&self) -> Result<Vec<Image>> {
        Ok(non_empty_str(self.user().pointer("/visuals/visuals/0/visual_url"))
            .map(|url| vec![Image::new(url, None, None)])
            .unwrap_or_default())
    }

    fn subscriber_count(&self) -> Result<i64> {
        Ok(self
            .user()
            .get("followers_count")
            .and_then(Value::as_i64)
            .unwrap_or(-1))
    }

    fn description(&self) -> Result<Option<String>> {
        Ok(non_empty_str(self.user().get("description")))
    }

    fn feed_url(&self) -> Result<Option<String>> {
        Ok(Some(format!(
            "https://feeds.soundcloud.com/users/soundcloud:users:{}/sounds.rss",
            self.user_id()?
        )))
    }
}
