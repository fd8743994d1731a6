pub mod channel;
pub mod items;
pub mod kiosk;
pub mod links;
pub mod playlist;
pub mod search;
pub mod stream;
pub mod types;
pub mod utils;

pub use channel::YoutubeChannelExtractor;
pub use kiosk::YoutubeTrendingExtractor;
pub use links::{
    YoutubeChannelLinkHandlerFactory, YoutubePlaylistLinkHandlerFactory,
    YoutubeSearchQueryHandlerFactory, YoutubeStreamLinkHandlerFactory,
};
pub use playlist::YoutubePlaylistExtractor;
pub use search::YoutubeSearchExtractor;
pub use stream::YoutubeStreamExtractor;

use crate::core::Platform;
use crate::error::{ExtractionError, Result};
use crate::extractor::StreamExtractor;
use crate::linkhandler::{LinkHandlerFactory, SearchQueryHandlerFactory};
use crate::list::{ChannelExtractor, KioskExtractor, PlaylistExtractor, SearchExtractor};
use crate::service::{ExtractorContext, StreamingService, search_link};

/// YouTube: watch pages, channels, playlists, search and the trending kiosk.
#[derive(Debug, Clone, Copy)]
pub struct YoutubeService;

impl StreamingService for YoutubeService {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    fn name(&self) -> &'static str {
        "YouTube"
    }

    fn base_url(&self) -> &'static str {
        utils::BASE_URL
    }

    fn stream_lh_factory(&self) -> Option<&dyn LinkHandlerFactory> {
        Some(&YoutubeStreamLinkHandlerFactory)
    }

    fn channel_lh_factory(&self) -> Option<&dyn LinkHandlerFactory> {
        Some(&YoutubeChannelLinkHandlerFactory)
    }

    fn playlist_lh_factory(&self) -> Option<&dyn LinkHandlerFactory> {
        Some(&YoutubePlaylistLinkHandlerFactory)
    }

    fn search_qh_factory(&self) -> &dyn SearchQueryHandlerFactory {
        &YoutubeSearchQueryHandlerFactory
    }

    fn stream_extractor(&self, url: &str, ctx: &ExtractorContext) -> Result<Box<dyn StreamExtractor>> {
        let link = YoutubeStreamLinkHandlerFactory.from_url(url)?;
        Ok(Box::new(YoutubeStreamExtractor::new(
            ctx.base(Platform::YouTube, link),
        )))
    }

    fn channel_extractor(
        &self,
        url: &str,
        ctx: &ExtractorContext,
    ) -> Result<Box<dyn ChannelExtractor>> {
        let link = YoutubeChannelLinkHandlerFactory.from_url(url)?;
        Ok(Box::new(YoutubeChannelExtractor::new(
            ctx.base(Platform::YouTube, link),
        )))
    }

    fn playlist_extractor(
        &self,
        url: &str,
        ctx: &ExtractorContext,
    ) -> Result<Box<dyn PlaylistExtractor>> {
        let link = YoutubePlaylistLinkHandlerFactory.from_url(url)?;
        Ok(Box::new(YoutubePlaylistExtractor::new(
            ctx.base(Platform::YouTube, link),
        )))
    }

    fn search_extractor(
        &self,
        query: &str,
        content_filters: &[String],
        ctx: &ExtractorContext,
    ) -> Result<Box<dyn SearchExtractor>> {
        let query = YoutubeSearchQueryHandlerFactory.from_query(query, content_filters, "")?;
        let base = ctx.base(Platform::YouTube, search_link(&query));
        Ok(Box::new(YoutubeSearchExtractor::new(base, query)))
    }

    fn kiosk_list(&self) -> &'static [&'static str] {
        kiosk::KIOSKS
    }

    fn kiosk_extractor(
        &self,
        kiosk_id: &str,
        ctx: &ExtractorContext,
    ) -> Result<Box<dyn KioskExtractor>> {
        match kiosk_id {
            kiosk::TRENDING => Ok(Box::new(YoutubeTrendingExtractor::new(
                ctx.base(Platform::YouTube, kiosk::trending_link()),
            ))),
            other => Err(ExtractionError::ContentNotSupported(format!(
                "YouTube has no kiosk {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Extractor;
    use crate::service::LinkType;

    #[test]
    fn test_link_types() {
        let s = YoutubeService;
        assert_eq!(s.link_type("https://youtu.be/dQw4w9WgXcQ"), LinkType::Stream);
        assert_eq!(
            s.link_type("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLbpi6ZahtOH6Ar_3GPy3workp2Ra4kd5M"),
            LinkType::Stream
        );
        assert_eq!(s.link_type("https://www.youtube.com/@rustlang"), LinkType::Channel);
        assert_eq!(
            s.link_type("https://www.youtube.com/playlist?list=PLbpi6ZahtOH6Ar_3GPy3workp2Ra4kd5M"),
            LinkType::Playlist
        );
        assert_eq!(s.link_type("https://soundcloud.com/a/b"), LinkType::None);
    }

    #[test]
    fn test_kiosks() {
        let s = YoutubeService;
        let ctx = ExtractorContext::new(std::sync::Arc::new(crate::download::mock::MockDownloader::new()));
        assert_eq!(s.default_kiosk(), Some("Trending"));
        let kiosk = s.kiosk_extractor("Trending", &ctx).unwrap();
        assert_eq!(kiosk.kiosk_id(), "Trending");
        assert!(!kiosk.is_fetched());
        assert!(matches!(
            s.kiosk_extractor("Gaming", &ctx),
            Err(ExtractionError::ContentNotSupported(_))
        ));
    }
}
