use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::collector::InfoItemsCollector;
use crate::core::{Image, InfoItem, StreamType};
use crate::error::{ExtractionError, Result};
use crate::extractor::{ExtractorBase, PageFetcher, StreamExtractor};
use crate::list::{Page, next_cursor};
use crate::parsing::{non_empty_str, required_str};
use crate::stream::{AudioStream, MediaFormat, push_if_not_similar};

use super::items;
use super::utils::{
    API_V2_URL, api_json, artwork_or_avatar, collection_page, expect_kind, parse_date, resolve,
    uploader_name, uploader_url,
};

pub struct SoundcloudStreamExtractor {
    base: ExtractorBase<Value>,
}

impl SoundcloudStreamExtractor {
    pub fn new(base: ExtractorBase<Value>) -> Self {
        Self { base }
    }

    fn track(&self) -> &Value {
        self.base.document()
    }

    /// Numeric api id, used by the sub-resources.
    pub fn track_id(&self) -> Result<String> {
        match self.track().get("id") {
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(ExtractionError::parsing("track id", "missing")),
        }
    }

    /// Progressive MP3 transcodings; HLS ones are not playable as plain files.
    fn progressive_mp3(&self) -> impl Iterator<Item = &str> {
        self.track()
            .pointer("/media/transcodings")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter(|t| {
                t.get("preset").and_then(Value::as_str).is_some_and(|p| p.contains("mp3"))
                    && t.pointer("/format/protocol").and_then(Value::as_str) == Some("progressive")
            })
            .filter_map(|t| t.get("url").and_then(Value::as_str))
            .filter(|url| !url.is_empty())
    }
}

#[async_trait]
impl PageFetcher for SoundcloudStreamExtractor {
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

        let policy = track.get("policy").and_then(Value::as_str).unwrap_or_default();
        if policy != "ALLOW" && policy != "MONETIZE" {
            return Err(ExtractionError::ContentNotAvailable(format!(
                "track policy {policy}"
            )));
        }
        Ok(track)
    }

    fn document_name(&self, track: &Value) -> Result<String> {
        required_str(track, "/title", "name")
    }
}

#[async_trait]
impl StreamExtractor for SoundcloudStreamExtractor {
    fn stream_type(&self) -> Result<StreamType> {
        Ok(StreamType::AudioStream)
    }

    fn length(&self) -> Result<i64> {
        Ok(self.track().get("duration").and_then(Value::as_i64).unwrap_or(0) / 1000)
    }

    fn view_count(&self) -> Result<i64> {
        Ok(self
            .track()
            .get("playback_count")
            .and_then(Value::as_i64)
            .unwrap_or(-1))
    }

    fn description(&self) -> Result<Option<String>> {
        Ok(non_empty_str(self.track().get("description")))
    }

    fn uploader_name(&self) -> Result<String> {
        uploader_name(self.track()).ok_or_else(|| ExtractionError::parsing("uploader name", "missing"))
    }

    fn uploader_url(&self) -> Result<Option<String>> {
        Ok(uploader_url(self.track()))
    }

    fn thumbnails(&self) -> Result<Vec<Image>> {
        Ok(artwork_or_avatar(self.track()))
    }

    fn textual_upload_date(&self) -> Result<Option<String>> {
        Ok(non_empty_str(self.track().get("created_at")))
    }

    fn upload_date(&self) -> Result<Option<DateTime<Utc>>> {
        self.textual_upload_date()?.map(|d| parse_date(&d)).transpose()
    }

    /// One request per transcoding, each answering with a short-lived URL.
    async fn audio_streams(&self) -> Result<Vec<AudioStream>> {
        let mut streams = Vec::new();
        if self.track().get("streamable").and_then(Value::as_bool) == Some(false) {
            debug!(url = %self.base.url(), "track is not streamable");
            return Ok(streams);
        }

        for transcoding in self.progressive_mp3() {
            let answer =
                api_json(self.base.downloader(), transcoding, self.base.localization()).await?;
            let url = required_str(&answer, "/url", "stream url")?;
            push_if_not_similar(&mut streams, AudioStream::new(url, MediaFormat::Mp3, 128));
        }
        Ok(streams)
    }

    async fn related_items(&self) -> Result<Option<Page<InfoItem>>> {
        let url = format!("{API_V2_URL}/tracks/{}/related?limit=10", self.track_id()?);
        let response = api_json(self.base.downloader(), &url, self.base.localization()).await?;
        let (records, candidate) = collection_page(&response);

        let platform = self.base.platform();
        let mut collector = InfoItemsCollector::new(platform);
        collector.collect(records, |record| {
            Ok(items::stream_item(platform, record)?.map(InfoItem::from))
        })?;
        Ok(Some(Page::from_collector(collector, next_cursor(None, candidate))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Platform;
    use crate::download::Localization;
    use crate::download::mock::MockDownloader;
    use crate::extractor::Extractor;
    use crate::info::StreamInfo;
    use crate::linkhandler::LinkHandlerFactory;
    use crate::soundcloud::links::SoundcloudStreamLinkHandlerFactory;
    use crate::soundcloud::utils::CLIENT_ID;
    use serde_json::json;
    use std::sync::Arc;

    const HOME: &str = r#"<script>{client_id:"testclientid"}</script>"#;

    fn track(policy: &str) -> String {
        json!({
            "kind": "track",
            "id": 123,
            "title": "Song",
            "policy": policy,
            "streamable": true,
            "duration": 61_500,
            "playback_count": 10,
            "permalink_url": "https://soundcloud.com/artist/song",
            "created_at": "2020-01-02T03:04:05Z",
            "user": {"username": "Artist", "permalink_url": "https://soundcloud.com/artist"},
            "media": {"transcodings": [
                {"url": "https://api-v2.soundcloud.com/media/1/stream/hls", "preset": "mp3_0_0", "format": {"protocol": "hls"}},
                {"url": "https://api-v2.soundcloud.com/media/1/stream/progressive", "preset": "mp3_0_0", "format": {"protocol": "progressive"}},
                {"url": "https://api-v2.soundcloud.com/media/1/stream/opus", "preset": "opus_0_0", "format": {"protocol": "hls"}}
            ]}
        })
        .to_string()
    }

    fn extractor(mock: Arc<MockDownloader>) -> SoundcloudStreamExtractor {
        let link = SoundcloudStreamLinkHandlerFactory
            .from_url("https://soundcloud.com/artist/song")
            .unwrap();
        SoundcloudStreamExtractor::new(ExtractorBase::new(
            Platform::SoundCloud,
            link,
            mock,
            Localization::default(),
        ))
    }

    #[tokio::test]
    async fn test_track() {
        CLIENT_ID.get_or_init(|| async { Ok("testclientid".to_string()) }).await.unwrap();
        let mock = Arc::new(
            MockDownloader::new()
                .route("stream/progressive", r#"{"url":"https://cf-media.sndcdn.com/song.mp3"}"#)
                .route(
                    "tracks/123/related",
                    &json!({"collection": [
                        {"kind": "track", "title": "Other", "permalink_url": "https://soundcloud.com/artist/other"},
                        {"kind": "track", "permalink_url": "https://soundcloud.com/artist/untitled"}
                    ]})
                    .to_string(),
                )
                .route("resolve?url=", &track("ALLOW"))
                .route("https://soundcloud.com ", HOME),
        );
        let mut e = extractor(mock.clone());

        let info = StreamInfo::fetch(&mut e).await.unwrap();
        assert_eq!(info.name, "Song");
        assert_eq!(info.duration, 61);
        assert_eq!(info.uploader_name.as_deref(), Some("Artist"));
        assert_eq!(info.audio_streams.len(), 1);
        assert_eq!(info.audio_streams[0].format, MediaFormat::Mp3);
        assert_eq!(info.related_items.len(), 1);
        assert_eq!(info.errors.len(), 1);

        let api_calls = mock.urls().iter().filter(|u| u.contains("api-v2")).count();
        assert_eq!(api_calls, 3);
        assert!(mock.urls().iter().all(|u| !u.contains("api-v2") || u.contains("client_id=")));
    }

    #[tokio::test]
    async fn test_blocked_track() {
        let mock = Arc::new(
            MockDownloader::new()
                .route("resolve?url=", &track("BLOCK"))
                .route("https://soundcloud.com ", HOME),
        );
        let mut e = extractor(mock);
        assert!(matches!(
            e.fetch_page().await,
            Err(ExtractionError::ContentNotAvailable(_))
        ));
    }

    #[tokio::test]
    async fn test_playlist_url_is_not_a_track() {
        let mock = Arc::new(
            MockDownloader::new()
                .route("resolve?url=", r#"{"kind":"playlist","title":"Mix"}"#)
                .route("https://soundcloud.com ", HOME),
        );
        let mut e = extractor(mock);
        assert!(matches!(
            e.fetch_page().await,
            Err(ExtractionError::ContentNotSupported(_))
        ));
    }
}
