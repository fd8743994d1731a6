pub mod cache;
pub mod collector;
pub mod core;
pub mod download;
pub mod error;
pub mod extractor;
pub mod info;
pub mod itag;
pub mod linkhandler;
pub mod list;
pub mod parsing;
pub mod service;
pub mod stream;

#[cfg(feature = "soundcloud")]
pub mod soundcloud;
#[cfg(feature = "youtube")]
pub mod youtube;

pub use core::{Image, InfoItem, Platform, StreamInfoItem, StreamType};
pub use download::{Downloader, HttpDownloader, Localization};
pub use error::{ExtractionError, Result};
pub use extractor::{Extractor, StreamExtractor};
pub use info::{ListInfo, StreamInfo};
pub use list::{Cursor, ListExtractor, Page, collect_pages};
pub use service::{ExtractorContext, LinkType, StreamingService};

use tracing::debug;

#[cfg(feature = "soundcloud")]
use crate::soundcloud::SoundcloudService;
#[cfg(feature = "youtube")]
use crate::youtube::YoutubeService;

/// Enabled services, in dispatch order.
pub static SERVICES: &[&dyn StreamingService] = &[
    #[cfg(feature = "youtube")]
    &YoutubeService,
    #[cfg(feature = "soundcloud")]
    &SoundcloudService,
];

/// First service with a factory that accepts `url`. No network access.
pub fn service_by_url(url: &str) -> Result<&'static dyn StreamingService> {
    let service = SERVICES
        .iter()
        .copied()
        .find(|s| s.accepts_url(url))
        .ok_or_else(|| {
            ExtractionError::PlatformNotSupported(format!("No service found for: {url}"))
        })?;
    debug!(service = service.name(), url, "dispatched");
    Ok(service)
}

pub fn service_by_id(service_id: u32) -> Result<&'static dyn StreamingService> {
    SERVICES
        .iter()
        .copied()
        .find(|s| s.platform().service_id() == service_id)
        .ok_or_else(|| ExtractionError::PlatformNotSupported(format!("service id {service_id}")))
}

/// Case-insensitive lookup by display name.
pub fn service_by_name(name: &str) -> Result<&'static dyn StreamingService> {
    SERVICES
        .iter()
        .copied()
        .find(|s| s.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| ExtractionError::PlatformNotSupported(format!("service {name:?}")))
}

/// Fetch everything about the stream behind `url` (auto-detect platform).
pub async fn stream_info(url: &str, ctx: &ExtractorContext) -> Result<StreamInfo> {
    let service = service_by_url(url)?;
    let mut extractor = service.stream_extractor(url, ctx)?;
    StreamInfo::fetch(extractor.as_mut()).await
}
