use async_trait::async_trait;
use serde_json::Value;

use crate::collector::InfoItemsCollector;
use crate::core::InfoItem;
use crate::error::Result;
use crate::extractor::{ExtractorBase, PageFetcher};
use crate::linkhandler::SearchQueryHandler;
use crate::list::{Cursor, ListExtractor, Page, SearchExtractor, next_cursor, require_cursor};

use super::items;
use super::utils::{api_json, collection_page};

pub struct SoundcloudSearchExtractor {
    base: ExtractorBase<Value>,
    query: SearchQueryHandler,
}

impl SoundcloudSearchExtractor {
    pub fn new(base: ExtractorBase<Value>, query: SearchQueryHandler) -> Self {
        Self { base, query }
    }

    fn collect(&self, response: &Value, previous: Option<&Cursor>) -> Result<Page<InfoItem>> {
        let (records, candidate) = collection_page(response);
        let platform = self.base.platform();
        let mut collector = InfoItemsCollector::new(platform);
        collector.collect(records, |record| items::info_item(platform, record))?;
        Ok(Page::from_collector(collector, next_cursor(previous, candidate)))
    }
}

#[async_trait]
impl PageFetcher for SoundcloudSearchExtractor {
    type Document = Value;

    fn base(&self) -> &ExtractorBase<Value> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ExtractorBase<Value> {
        &mut self.base
    }

    async fn on_fetch_page(&self) -> Result<Value> {
        api_json(self.base.downloader(), &self.query.url, self.base.localization()).await
    }

    fn document_name(&self, _: &Value) -> Result<String> {
        Ok(self.query.query.clone())
    }
}

#[async_trait]
impl ListExtractor<InfoItem> for SoundcloudSearchExtractor {
    async fn initial_page(&self) -> Result<Page<InfoItem>> {
        self.collect(self.base.document(), None)
    }

    async fn page(&self, cursor: Option<&Cursor>) -> Result<Page<InfoItem>> {
        let cursor = require_cursor(cursor)?;
        let response = api_json(self.base.downloader(), &cursor.url, self.base.localization()).await?;
        self.collect(&response, Some(cursor))
    }
}

impl SearchExtractor for SoundcloudSearchExtractor {
    fn search_string(&self) -> &str {
        &self.query.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Platform;
    use crate::download::Localization;
    use crate::download::mock::MockDownloader;
    use crate::extractor::Extractor;
    use crate::linkhandler::SearchQueryHandlerFactory;
    use crate::list::collect_pages;
    use crate::service::search_link;
    use crate::soundcloud::links::SoundcloudSearchQueryHandlerFactory;
    use serde_json::json;
    use std::sync::Arc;

    fn track(n: u32) -> Value {
        json!({"kind": "track", "title": format!("t{n}"), "permalink_url": format!("https://soundcloud.com/a/t{n}")})
    }

    #[tokio::test]
    async fn test_search_pages() {
        let page1 = json!({"collection": [track(1), {"kind": "user", "username": "a", "permalink_url": "https://soundcloud.com/a"}],
            "next_href": "https://api-v2.soundcloud.com/search?q=lofi&offset=10"});
        let page2 = json!({"collection": [track(2)], "next_href": "https://api-v2.soundcloud.com/search?q=lofi&offset=20"});
        let page3 = json!({"collection": [], "next_href": "https://api-v2.soundcloud.com/search?q=lofi&offset=30"});
        let mock = Arc::new(
            MockDownloader::new()
                .route("offset=10", &page2.to_string())
                .route("offset=20", &page3.to_string())
                .route("offset=0", &page1.to_string())
                .route("https://soundcloud.com ", r#"{client_id:"testclientid"}"#),
        );

        let query = SoundcloudSearchQueryHandlerFactory.from_query("lofi", &[], "").unwrap();
        let base = ExtractorBase::new(Platform::SoundCloud, search_link(&query), mock.clone(), Localization::default());
        let mut e = SoundcloudSearchExtractor::new(base, query);
        e.fetch_page().await.unwrap();

        let all = collect_pages(&e, None).await.unwrap();
        let names: Vec<_> = all.items.iter().map(|i| i.name().to_string()).collect();
        assert_eq!(names, ["t1", "a", "t2"]);
        assert!(all.next_cursor.is_none());
        let api_calls = mock.urls().iter().filter(|u| u.contains("api-v2")).count();
        assert_eq!(api_calls, 3);
    }
}
