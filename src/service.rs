//! Per-platform services: which URLs a platform owns and how to build
//! extractors for them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::core::Platform;
use crate::download::{Downloader, Localization};
use crate::error::{ExtractionError, Result};
use crate::extractor::{ExtractorBase, StreamExtractor};
use crate::linkhandler::{
    LinkHandler, LinkHandlerFactory, SearchQueryHandler, SearchQueryHandlerFactory,
};
use crate::list::{
    ChannelExtractor, CommentsExtractor, KioskExtractor, PlaylistExtractor, SearchExtractor,
};

/// What every extractor built by a service shares.
#[derive(Clone)]
pub struct ExtractorContext {
    pub downloader: Arc<dyn Downloader>,
    pub localization: Localization,
}

impl ExtractorContext {
    pub fn new(downloader: Arc<dyn Downloader>) -> Self {
        Self {
            downloader,
            localization: Localization::default(),
        }
    }

    pub fn with_localization(mut self, localization: Localization) -> Self {
        self.localization = localization;
        self
    }

    pub fn base<D>(&self, platform: Platform, link: LinkHandler) -> ExtractorBase<D> {
        ExtractorBase::new(
            platform,
            link,
            self.downloader.clone(),
            self.localization.clone(),
        )
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkType {
    Stream,
    Channel,
    Playlist,
    None,
}

fn not_supported<T>(service: &str, kind: &str) -> Result<T> {
    Err(ExtractionError::ContentNotSupported(format!(
        "{service} has no {kind} extractor"
    )))
}

pub trait StreamingService: Send + Sync {
    fn platform(&self) -> Platform;

    fn name(&self) -> &'static str;

    fn base_url(&self) -> &'static str;

    fn stream_lh_factory(&self) -> Option<&dyn LinkHandlerFactory>;

    fn channel_lh_factory(&self) -> Option<&dyn LinkHandlerFactory> {
        None
    }

    fn playlist_lh_factory(&self) -> Option<&dyn LinkHandlerFactory> {
        None
    }

    fn comments_lh_factory(&self) -> Option<&dyn LinkHandlerFactory> {
        None
    }

    fn search_qh_factory(&self) -> &dyn SearchQueryHandlerFactory;

    fn stream_extractor(&self, url: &str, ctx: &ExtractorContext)
    -> Result<Box<dyn StreamExtractor>>;

    fn channel_extractor(
        &self,
        _url: &str,
        _ctx: &ExtractorContext,
    ) -> Result<Box<dyn ChannelExtractor>> {
        not_supported(self.name(), "channel")
    }

    fn playlist_extractor(
        &self,
        _url: &str,
        _ctx: &ExtractorContext,
    ) -> Result<Box<dyn PlaylistExtractor>> {
        not_supported(self.name(), "playlist")
    }

    fn search_extractor(
        &self,
        query: &str,
        content_filters: &[String],
        ctx: &ExtractorContext,
    ) -> Result<Box<dyn SearchExtractor>>;

    fn comments_extractor(
        &self,
        _url: &str,
        _ctx: &ExtractorContext,
    ) -> Result<Box<dyn CommentsExtractor>> {
        not_supported(self.name(), "comments")
    }

    /// Ids of the kiosks this service offers, the default one first.
    fn kiosk_list(&self) -> &'static [&'static str] {
        &[]
    }

    fn default_kiosk(&self) -> Option<&'static str> {
        self.kiosk_list().first().copied()
    }

    fn kiosk_extractor(
        &self,
        _kiosk_id: &str,
        _ctx: &ExtractorContext,
    ) -> Result<Box<dyn KioskExtractor>> {
        not_supported(self.name(), "kiosk")
    }

    /// Try the factories in order: stream, channel, playlist.
    fn link_type(&self, url: &str) -> LinkType {
        let candidates = [
            (self.stream_lh_factory(), LinkType::Stream),
            (self.channel_lh_factory(), LinkType::Channel),
            (self.playlist_lh_factory(), LinkType::Playlist),
        ];
        candidates
            .into_iter()
            .find(|(factory, _)| factory.is_some_and(|f| f.accepts_url(url)))
            .map_or(LinkType::None, |(_, kind)| kind)
    }

    fn accepts_url(&self, url: &str) -> bool {
        self.link_type(url) != LinkType::None
    }
}

/// Link handler for a search, so search extractors share the base state.
pub fn search_link(query: &SearchQueryHandler) -> LinkHandler {
    LinkHandler::new(query.query.clone(), query.url.clone(), query.url.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::linkhandler::{bare_host, parse_url};

    struct PathFactory(&'static str);

    impl LinkHandlerFactory for PathFactory {
        fn id_from_url(&self, url: &str) -> Result<String> {
            let parsed = parse_url(url)?;
            if bare_host(&parsed).as_deref() != Some("example.com") {
                return Err(ExtractionError::InvalidUrl(url.to_string()));
            }
            parsed
                .path()
                .strip_prefix(self.0)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .ok_or_else(|| ExtractionError::parsing("id", url))
        }

        fn url_from_id(&self, id: &str) -> Result<String> {
            Ok(format!("https://example.com{}{id}", self.0))
        }
    }

    struct NoQueries;

    impl SearchQueryHandlerFactory for NoQueries {
        fn url(&self, query: &str, _: &[String], _: &str) -> Result<String> {
            Ok(format!("https://example.com/search?q={query}"))
        }
    }

    struct ExampleService;

    impl StreamingService for ExampleService {
        fn platform(&self) -> Platform {
            use strum::IntoEnumIterator;
            Platform::iter().next().unwrap()
        }

        fn name(&self) -> &'static str {
            "Example"
        }

        fn base_url(&self) -> &'static str {
            "https://example.com"
        }

        fn stream_lh_factory(&self) -> Option<&dyn LinkHandlerFactory> {
            Some(&PathFactory("/watch/"))
        }

        fn playlist_lh_factory(&self) -> Option<&dyn LinkHandlerFactory> {
            Some(&PathFactory("/list/"))
        }

        fn search_qh_factory(&self) -> &dyn SearchQueryHandlerFactory {
            &NoQueries
        }

        fn stream_extractor(&self, url: &str, _: &ExtractorContext) -> Result<Box<dyn StreamExtractor>> {
            not_supported(url, "stream")
        }

        fn search_extractor(
            &self,
            query: &str,
            _: &[String],
            _: &ExtractorContext,
        ) -> Result<Box<dyn SearchExtractor>> {
            not_supported(query, "search")
        }
    }

    #[test]
    fn test_link_type_order() {
        assert_eq!(ExampleService.link_type("https://example.com/watch/1"), LinkType::Stream);
        assert_eq!(ExampleService.link_type("https://example.com/list/1"), LinkType::Playlist);
        assert_eq!(ExampleService.link_type("https://example.com/user/1"), LinkType::None);
        assert!(!ExampleService.accepts_url("https://other.com/watch/1"));
    }

    #[test]
    fn test_missing_kind_is_not_supported() {
        let ctx = ExtractorContext::new(Arc::new(crate::download::mock::MockDownloader::new()));
        assert!(matches!(
            ExampleService.channel_extractor("https://example.com/c/1", &ctx),
            Err(ExtractionError::ContentNotSupported(_))
        ));
        assert!(ExampleService.kiosk_list().is_empty());
        assert_eq!(ExampleService.default_kiosk(), None);
        assert!(matches!(
            ExampleService.kiosk_extractor("Trending", &ctx),
            Err(ExtractionError::ContentNotSupported(_))
        ));
    }
}
