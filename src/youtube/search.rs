use async_trait::async_trait;
use serde_json::{Value, json};

use crate::collector::InfoItemsCollector;
use crate::core::InfoItem;
use crate::error::Result;
use crate::extractor::{ExtractorBase, PageFetcher};
use crate::linkhandler::SearchQueryHandler;
use crate::list::{Cursor, ListExtractor, Page, SearchExtractor, next_cursor, require_cursor};
use crate::parsing::text_from_object;

use super::items;
use super::links::YoutubeSearchQueryHandlerFactory;
use super::utils::{
    client_version, continuation_cursor, continuation_items, continuation_token,
    fetch_continuation, innertube_context, innertube_post, innertube_url,
};

pub struct YoutubeSearchExtractor {
    base: ExtractorBase<Value>,
    query: SearchQueryHandler,
}

impl YoutubeSearchExtractor {
    pub fn new(base: ExtractorBase<Value>, query: SearchQueryHandler) -> Self {
        Self { base, query }
    }

    fn sections(&self) -> &[Value] {
        self.base
            .document()
            .pointer("/contents/twoColumnSearchResultsRenderer/primaryContents/sectionListRenderer/contents")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First record of the first item section, where corrections live.
    fn correction(&self) -> Option<&Value> {
        self.sections()
            .iter()
            .filter_map(|s| s.pointer("/itemSectionRenderer/contents/0"))
            .next()
    }

    /// Feed item sections and continuation records to a collector.
    fn collect_sections(&self, sections: &[Value], previous: Option<&Cursor>) -> Result<Page<InfoItem>> {
        let platform = self.base.platform();
        let mut collector = InfoItemsCollector::new(platform);
        let mut token = None;

        for section in sections {
            if let Some(t) = continuation_token(section) {
                token = Some(t);
                continue;
            }
            let Some(contents) = section
                .pointer("/itemSectionRenderer/contents")
                .and_then(Value::as_array)
            else {
                continue;
            };
            collector.collect(contents, |record| items::info_item(platform, record))?;
        }

        let candidate = token.map(|t| continuation_cursor("search", &t));
        Ok(Page::from_collector(collector, next_cursor(previous, candidate)))
    }
}

#[async_trait]
impl PageFetcher for YoutubeSearchExtractor {
    type Document = Value;

    fn base(&self) -> &ExtractorBase<Value> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ExtractorBase<Value> {
        &mut self.base
    }

    async fn on_fetch_page(&self) -> Result<Value> {
        let downloader = self.base.downloader();
        let localization = self.base.localization();
        let version = client_version(downloader, localization).await;

        let mut body = json!({
            "context": innertube_context(&version, localization),
            "query": self.query.query,
        });
        if let Some(params) =
            YoutubeSearchQueryHandlerFactory::search_params(&self.query.content_filters)
        {
            body["params"] = json!(params);
        }
        innertube_post(
            downloader,
            &innertube_url("search"),
            serde_json::to_vec(&body)?,
            localization,
        )
        .await
    }

    fn document_name(&self, _: &Value) -> Result<String> {
        Ok(self.query.query.clone())
    }
}

#[async_trait]
impl ListExtractor<InfoItem> for YoutubeSearchExtractor {
    async fn initial_page(&self) -> Result<Page<InfoItem>> {
        self.collect_sections(self.sections(), None)
    }

    async fn page(&self, cursor: Option<&Cursor>) -> Result<Page<InfoItem>> {
        let cursor = require_cursor(cursor)?;
        let response =
            fetch_continuation(self.base.downloader(), cursor, self.base.localization()).await?;
        self.collect_sections(&continuation_items(&response), Some(cursor))
    }
}

#[async_trait]
impl SearchExtractor for YoutubeSearchExtractor {
    fn search_string(&self) -> &str {
        &self.query.query
    }

    fn search_suggestion(&self) -> Result<String> {
        let Some(record) = self.correction() else {
            return Ok(String::new());
        };
        Ok(record
            .pointer("/showingResultsForRenderer/correctedQuery")
            .or_else(|| record.pointer("/didYouMeanRenderer/correctedQuery"))
            .and_then(text_from_object)
            .unwrap_or_default())
    }

    fn is_corrected_search(&self) -> Result<bool> {
        Ok(self
            .correction()
            .is_some_and(|r| r.get("showingResultsForRenderer").is_some()))
    }
}
