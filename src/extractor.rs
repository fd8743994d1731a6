//! Fetch-once lifecycle shared by every extractor.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::core::{Image, InfoItem, Platform, StreamType};
use crate::download::{Downloader, Localization};
use crate::error::{ExtractionError, Result};
use crate::linkhandler::LinkHandler;
use crate::list::Page;
use crate::stream::{AudioStream, SubtitlesStream, VideoStream};

#[derive(Debug)]
pub enum FetchState<D> {
    NotFetched,
    Fetched(D),
    /// Holds the message of the error that ended the fetch.
    Failed(String),
}

/// State every concrete extractor embeds: identity, transport and the
/// fetched document.
pub struct ExtractorBase<D> {
    platform: Platform,
    link: LinkHandler,
    downloader: Arc<dyn Downloader>,
    localization: Localization,
    state: FetchState<D>,
}

impl<D> ExtractorBase<D> {
    pub fn new(
        platform: Platform,
        link: LinkHandler,
        downloader: Arc<dyn Downloader>,
        localization: Localization,
    ) -> Self {
        Self {
            platform,
            link,
            downloader,
            localization,
            state: FetchState::NotFetched,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn link(&self) -> &LinkHandler {
        &self.link
    }

    pub fn id(&self) -> &str {
        &self.link.id
    }

    pub fn url(&self) -> &str {
        &self.link.url
    }

    pub fn downloader(&self) -> &dyn Downloader {
        self.downloader.as_ref()
    }

    pub fn localization(&self) -> &Localization {
        &self.localization
    }

    pub fn state(&self) -> &FetchState<D> {
        &self.state
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self.state, FetchState::Fetched(_))
    }

    /// The fetched document.
    ///
    /// # Panics
    ///
    /// When called before a successful fetch. Accessors are only valid
    /// after `fetch_page` has returned `Ok`.
    pub fn document(&self) -> &D {
        match &self.state {
            FetchState::Fetched(document) => document,
            FetchState::NotFetched => {
                panic!("{} accessed before fetch_page()", self.link.url)
            }
            FetchState::Failed(reason) => {
                panic!("{} accessed after a failed fetch: {reason}", self.link.url)
            }
        }
    }
}

/// What a concrete extractor implements; [`Extractor`] comes for free.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    type Document: Send + Sync;

    fn base(&self) -> &ExtractorBase<Self::Document>;

    fn base_mut(&mut self) -> &mut ExtractorBase<Self::Document>;

    /// Issue the request(s) that produce the document.
    async fn on_fetch_page(&self) -> Result<Self::Document>;

    fn document_name(&self, document: &Self::Document) -> Result<String>;
}

/// One remote resource behind a fetch-once lifecycle.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn platform(&self) -> Platform;

    fn link_handler(&self) -> &LinkHandler;

    fn id(&self) -> &str {
        &self.link_handler().id
    }

    fn url(&self) -> &str {
        &self.link_handler().url
    }

    fn original_url(&self) -> &str {
        &self.link_handler().original_url
    }

    fn is_fetched(&self) -> bool;

    /// Fetch the resource. Later calls after a success are no-ops; after a
    /// failure they return `PreviouslyFailed` without a new request.
    async fn fetch_page(&mut self) -> Result<()>;

    fn name(&self) -> Result<String>;
}

#[async_trait]
impl<T: PageFetcher> Extractor for T {
    fn platform(&self) -> Platform {
        self.base().platform()
    }

    fn link_handler(&self) -> &LinkHandler {
        self.base().link()
    }

    fn is_fetched(&self) -> bool {
        self.base().is_fetched()
    }

    async fn fetch_page(&mut self) -> Result<()> {
        match self.base().state() {
            FetchState::Fetched(_) => return Ok(()),
            FetchState::Failed(reason) => {
                return Err(ExtractionError::PreviouslyFailed(reason.clone()));
            }
            FetchState::NotFetched => {}
        }

        debug!(platform = %self.base().platform(), url = %self.base().url(), "fetching page");
        match self.on_fetch_page().await {
            Ok(document) => {
                self.base_mut().state = FetchState::Fetched(document);
                Ok(())
            }
            Err(e) => {
                warn!(url = %self.base().url(), error = %e, "fetch failed");
                self.base_mut().state = FetchState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    fn name(&self) -> Result<String> {
        self.document_name(self.base().document())
    }
}

/// A single video or track.
#[async_trait]
pub trait StreamExtractor: Extractor {
    fn stream_type(&self) -> Result<StreamType>;

    /// Seconds, 0 for live streams.
    fn length(&self) -> Result<i64>;

    fn view_count(&self) -> Result<i64>;

    fn description(&self) -> Result<Option<String>>;

    fn uploader_name(&self) -> Result<String>;

    fn uploader_url(&self) -> Result<Option<String>>;

    fn thumbnails(&self) -> Result<Vec<Image>>;

    fn textual_upload_date(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn upload_date(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(None)
    }

    /// May issue further requests (one per stream on some platforms).
    async fn audio_streams(&self) -> Result<Vec<AudioStream>>;

    fn video_streams(&self) -> Result<Vec<VideoStream>> {
        Ok(Vec::new())
    }

    fn video_only_streams(&self) -> Result<Vec<VideoStream>> {
        Ok(Vec::new())
    }

    fn subtitles(&self) -> Result<Vec<SubtitlesStream>> {
        Ok(Vec::new())
    }

    /// DASH manifest covering all formats, if the platform serves one.
    fn dash_mpd_url(&self) -> Result<Option<String>> {
        Ok(None)
    }

    /// HLS playlist, the usual source for live streams.
    fn hls_url(&self) -> Result<Option<String>> {
        Ok(None)
    }

    async fn related_items(&self) -> Result<Option<Page<InfoItem>>> {
        Ok(None)
    }

    /// Message the platform shows instead of the content, if any.
    fn error_message(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::mock::MockDownloader;
    use strum::IntoEnumIterator;

    struct TitleExtractor {
        base: ExtractorBase<String>,
        downloader: Arc<MockDownloader>,
    }

    #[async_trait]
    impl PageFetcher for TitleExtractor {
        type Document = String;

        fn base(&self) -> &ExtractorBase<String> {
            &self.base
        }

        fn base_mut(&mut self) -> &mut ExtractorBase<String> {
            &mut self.base
        }

        async fn on_fetch_page(&self) -> Result<String> {
            let response = self
                .downloader
                .get(self.base.url(), self.base.localization())
                .await?
                .error_for_status()?;
            Ok(response.body)
        }

        fn document_name(&self, document: &String) -> Result<String> {
            Ok(document.trim().to_string())
        }
    }

    fn extractor(mock: MockDownloader) -> TitleExtractor {
        let downloader = Arc::new(mock);
        let link = LinkHandler::new(
            "1".into(),
            "https://example.com/1".into(),
            "https://example.com/1".into(),
        );
        TitleExtractor {
            base: ExtractorBase::new(
                Platform::iter().next().unwrap(),
                link,
                downloader.clone(),
                Localization::default(),
            ),
            downloader,
        }
    }

    #[tokio::test]
    async fn test_fetch_once() {
        let mut e = extractor(MockDownloader::new().route("example.com/1", " Title "));
        e.fetch_page().await.unwrap();
        e.fetch_page().await.unwrap();
        assert_eq!(e.name().unwrap(), "Title");
        assert_eq!(e.name().unwrap(), "Title");
        assert_eq!(e.downloader.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_terminal() {
        let mut e = extractor(MockDownloader::new().route_status("example.com/1", 503, ""));
        assert!(matches!(
            e.fetch_page().await,
            Err(ExtractionError::Http { status: 503, .. })
        ));
        assert!(matches!(
            e.fetch_page().await,
            Err(ExtractionError::PreviouslyFailed(_))
        ));
        assert_eq!(e.downloader.calls(), 1);
        assert!(!e.is_fetched());
    }

    #[test]
    #[should_panic(expected = "accessed before fetch_page()")]
    fn test_accessor_before_fetch_panics() {
        let e = extractor(MockDownloader::new());
        let _ = e.name();
    }
}
