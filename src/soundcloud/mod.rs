pub mod channel;
pub mod comments;
pub mod items;
pub mod links;
pub mod playlist;
pub mod search;
pub mod stream;
pub mod utils;

pub use channel::SoundcloudChannelExtractor;
pub use comments::SoundcloudCommentsExtractor;
pub use links::{
    SoundcloudChannelLinkHandlerFactory, SoundcloudPlaylistLinkHandlerFactory,
    SoundcloudSearchQueryHandlerFactory, SoundcloudStreamLinkHandlerFactory,
};
pub use playlist::SoundcloudPlaylistExtractor;
pub use search::SoundcloudSearchExtractor;
pub use stream::SoundcloudStreamExtractor;

use crate::core::Platform;
use crate::error::Result;
use crate::extractor::StreamExtractor;
use crate::linkhandler::{LinkHandlerFactory, SearchQueryHandlerFactory};
use crate::list::{ChannelExtractor, CommentsExtractor, PlaylistExtractor, SearchExtractor};
use crate::service::{ExtractorContext, StreamingService, search_link};

/// SoundCloud through the api-v2 JSON endpoints.
#[derive(Debug, Clone, Copy)]
pub struct SoundcloudService;

impl StreamingService for SoundcloudService {
    fn platform(&self) -> Platform {
        Platform::SoundCloud
    }

    fn name(&self) -> &'static str {
        "SoundCloud"
    }

    fn base_url(&self) -> &'static str {
        utils::BASE_URL
    }

    fn stream_lh_factory(&self) -> Option<&dyn LinkHandlerFactory> {
        Some(&SoundcloudStreamLinkHandlerFactory)
    }

    fn channel_lh_factory(&self) -> Option<&dyn LinkHandlerFactory> {
        Some(&SoundcloudChannelLinkHandlerFactory)
    }

    fn playlist_lh_factory(&self) -> Option<&dyn LinkHandlerFactory> {
        Some(&SoundcloudPlaylistLinkHandlerFactory)
    }

    /// Comments hang off the track URL.
    fn comments_lh_factory(&self) -> Option<&dyn LinkHandlerFactory> {
        Some(&SoundcloudStreamLinkHandlerFactory)
    }

    fn search_qh_factory(&self) -> &dyn SearchQueryHandlerFactory {
        &SoundcloudSearchQueryHandlerFactory
    }

    fn stream_extractor(&self, url: &str, ctx: &ExtractorContext) -> Result<Box<dyn StreamExtractor>> {
        let link = SoundcloudStreamLinkHandlerFactory.from_url(url)?;
        Ok(Box::new(SoundcloudStreamExtractor::new(
            ctx.base(Platform::SoundCloud, link),
        )))
    }

    fn channel_extractor(
        &self,
        url: &str,
        ctx: &ExtractorContext,
    ) -> Result<Box<dyn ChannelExtractor>> {
        let link = SoundcloudChannelLinkHandlerFactory.from_url(url)?;
        Ok(Box::new(SoundcloudChannelExtractor::new(
            ctx.base(Platform::SoundCloud, link),
        )))
    }

    fn playlist_extractor(
        &self,
        url: &str,
        ctx: &ExtractorContext,
    ) -> Result<Box<dyn PlaylistExtractor>> {
        let link = SoundcloudPlaylistLinkHandlerFactory.from_url(url)?;
        Ok(Box::new(SoundcloudPlaylistExtractor::new(
            ctx.base(Platform::SoundCloud, link),
        )))
    }

    fn search_extractor(
        &self,
        query: &str,
        content_filters: &[String],
        ctx: &ExtractorContext,
    ) -> Result<Box<dyn SearchExtractor>> {
        let query = SoundcloudSearchQueryHandlerFactory.from_query(query, content_filters, "")?;
        let base = ctx.base(Platform::SoundCloud, search_link(&query));
        Ok(Box::new(SoundcloudSearchExtractor::new(base, query)))
    }

    fn comments_extractor(
        &self,
        url: &str,
        ctx: &ExtractorContext,
    ) -> Result<Box<dyn CommentsExtractor>> {
        let link = SoundcloudStreamLinkHandlerFactory.from_url(url)?;
        Ok(Box::new(SoundcloudCommentsExtractor::new(
            ctx.base(Platform::SoundCloud, link),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::LinkType;

    #[test]
    fn test_link_types() {
        let s = SoundcloudService;
        assert_eq!(s.link_type("https://soundcloud.com/artist/song"), LinkType::Stream);
        assert_eq!(s.link_type("https://soundcloud.com/artist"), LinkType::Channel);
        assert_eq!(s.link_type("https://soundcloud.com/artist/sets/mix"), LinkType::Playlist);
        assert_eq!(s.link_type("https://soundcloud.com/discover"), LinkType::None);
    }
}
