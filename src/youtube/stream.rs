use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::collector::InfoItemsCollector;
use crate::core::{Image, InfoItem, StreamType};
use crate::error::{ExtractionError, Result};
use crate::extractor::{ExtractorBase, PageFetcher, StreamExtractor};
use crate::itag::{FormatMetadata, ItagItem, ItagType, resolve_format_with};
use crate::list::Page;
use crate::parsing::{FieldChain, extract_json_after, non_empty_str, number_at, text_from_object};
use crate::stream::{
    AudioStream, MediaFormat, SubtitlesStream, VideoStream, push_if_not_similar,
};

use super::items;
use super::types::{CaptionTrack, Format, PlayabilityStatus, StreamingData};
use super::utils::{BASE_URL, build_watch_url, extract_initial_data, fetch_html, thumbnails_from};

/// What a watch page yields.
#[derive(Debug)]
pub struct WatchPage {
    pub player: Value,
    pub initial_data: Value,
    pub streaming_data: StreamingData,
}

pub struct YoutubeStreamExtractor {
    base: ExtractorBase<WatchPage>,
}

impl YoutubeStreamExtractor {
    pub fn new(base: ExtractorBase<WatchPage>) -> Self {
        Self { base }
    }

    fn player(&self) -> &Value {
        &self.base.document().player
    }

    fn microformat(&self) -> Option<&Value> {
        self.player()
            .pointer("/microformat/playerMicroformatRenderer")
    }

    /// Formats of `wanted` kind from `formats`, resolved and deduplicated.
    /// Entries that do not read as a [`Format`] are skipped like unknown itags.
    fn itag_streams(&self, formats: &[Value], wanted: ItagType) -> Vec<(String, ItagItem)> {
        let mut seen: Vec<ItagItem> = Vec::new();
        let mut out = Vec::new();
        for raw in formats {
            let format = match Format::deserialize(raw) {
                Ok(format) => format,
                Err(e) => {
                    debug!(itag = ?raw.get("itag"), error = %e, "skipping malformed format");
                    continue;
                }
            };
            let Some(url) = format.url.as_deref() else {
                if format.is_ciphered() {
                    debug!(itag = format.itag, "skipping ciphered format");
                }
                continue;
            };
            let metadata = FormatMetadata {
                media_type: &format.mime_type,
                average_bitrate: format.average_bitrate.unwrap_or(format.bitrate),
                fps: format.fps,
                quality_label: format.quality_label.as_deref().unwrap_or_default(),
            };
            let itag = match resolve_format_with(format.itag, &metadata) {
                Ok(itag) => itag,
                Err(e) => {
                    debug!(itag = format.itag, error = %e, "skipping format");
                    continue;
                }
            };
            if itag.itag_type != wanted {
                continue;
            }
            if push_if_not_similar(&mut seen, itag.clone()) {
                out.push((url.to_string(), itag));
            }
        }
        out
    }
}

fn playability_error(status: &PlayabilityStatus) -> ExtractionError {
    let reason = status
        .reason
        .clone()
        .unwrap_or_else(|| status.status.clone());
    let lower = reason.to_lowercase();
    if status.status == "LOGIN_REQUIRED" && (lower.contains("age") || lower.contains("inappropriate")) {
        ExtractionError::ContentNotSupported(format!("age restricted: {reason}"))
    } else {
        ExtractionError::ContentNotAvailable(reason)
    }
}

/// Date-only or RFC 3339 timestamps.
fn parse_iso_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

#[async_trait]
impl PageFetcher for YoutubeStreamExtractor {
    type Document = WatchPage;

    fn base(&self) -> &ExtractorBase<WatchPage> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ExtractorBase<WatchPage> {
        &mut self.base
    }

    async fn on_fetch_page(&self) -> Result<WatchPage> {
        let url = format!(
            "{}&bpctr=9999999999&has_verified=1",
            build_watch_url(self.base.id())
        );
        let html = fetch_html(self.base.downloader(), &url, self.base.localization()).await?;

        let player = extract_json_after(&html, "var ytInitialPlayerResponse = ")
            .or_else(|_| extract_json_after(&html, "ytInitialPlayerResponse = "))?;
        let initial_data = extract_initial_data(&html).unwrap_or(Value::Null);

        let status: PlayabilityStatus = player
            .get("playabilityStatus")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();
        if status.status != "OK" {
            return Err(playability_error(&status));
        }

        let streaming_data = player
            .get("streamingData")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();

        Ok(WatchPage {
            player,
            initial_data,
            streaming_data,
        })
    }

    fn document_name(&self, page: &WatchPage) -> Result<String> {
        FieldChain::new("name")
            .or_lookup(|v: &Value| non_empty_str(v.pointer("/videoDetails/title")))
            .or_lookup(|_| {
                page.initial_data
                    .pointer("/contents/twoColumnWatchNextResults/results/results/contents/0/videoPrimaryInfoRenderer/title")
                    .and_then(text_from_object)
            })
            .extract(&page.player)
    }
}

#[async_trait]
impl StreamExtractor for YoutubeStreamExtractor {
    fn stream_type(&self) -> Result<StreamType> {
        let details = self.player().get("videoDetails");
        let is_live = details
            .and_then(|d| d.get("isLive").or_else(|| d.get("isLiveContent")))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(if is_live && self.base.document().streaming_data.hls_manifest_url.is_some() {
            StreamType::LiveStream
        } else {
            StreamType::VideoStream
        })
    }

    fn length(&self) -> Result<i64> {
        FieldChain::new("length")
            .or_lookup(|v| number_at(v, "/videoDetails/lengthSeconds"))
            .or_lookup(|v| number_at(v, "/microformat/playerMicroformatRenderer/lengthSeconds"))
            .extract(self.player())
    }

    fn view_count(&self) -> Result<i64> {
        FieldChain::new("view count")
            .or_lookup(|v| number_at(v, "/videoDetails/viewCount"))
            .or_lookup(|v| number_at(v, "/microformat/playerMicroformatRenderer/viewCount"))
            .extract(self.player())
    }

    fn description(&self) -> Result<Option<String>> {
        FieldChain::strings(
            "description",
            &[
                "/videoDetails/shortDescription",
                "/microformat/playerMicroformatRenderer/description/simpleText",
            ],
        )
        .extract_optional(self.player())
    }

    fn uploader_name(&self) -> Result<String> {
        FieldChain::strings(
            "uploader name",
            &[
                "/videoDetails/author",
                "/microformat/playerMicroformatRenderer/ownerChannelName",
            ],
        )
        .extract(self.player())
    }

    fn uploader_url(&self) -> Result<Option<String>> {
        FieldChain::new("uploader url")
            .or_lookup(|v| {
                non_empty_str(v.pointer("/videoDetails/channelId"))
                    .map(|id| format!("{BASE_URL}/channel/{id}"))
            })
            .or_lookup(|v| {
                non_empty_str(v.pointer("/microformat/playerMicroformatRenderer/ownerProfileUrl"))
            })
            .extract_optional(self.player())
    }

    fn thumbnails(&self) -> Result<Vec<Image>> {
        let images = thumbnails_from(self.player().pointer("/videoDetails/thumbnail"));
        if images.is_empty() {
            return Err(ExtractionError::parsing("thumbnails", "no thumbnails"));
        }
        Ok(images)
    }

    fn textual_upload_date(&self) -> Result<Option<String>> {
        Ok(self.microformat().and_then(|m| {
            non_empty_str(m.get("publishDate")).or_else(|| non_empty_str(m.get("uploadDate")))
        }))
    }

    fn upload_date(&self) -> Result<Option<DateTime<Utc>>> {
        match self.textual_upload_date()? {
            Some(text) => parse_iso_date(&text)
                .map(Some)
                .ok_or_else(|| ExtractionError::parsing("upload date", text)),
            None => Ok(None),
        }
    }

    async fn audio_streams(&self) -> Result<Vec<AudioStream>> {
        let data = &self.base.document().streaming_data;
        Ok(self
            .itag_streams(&data.adaptive_formats, ItagType::Audio)
            .into_iter()
            .map(|(url, itag)| AudioStream::from_itag(url, itag))
            .collect())
    }

    fn video_streams(&self) -> Result<Vec<VideoStream>> {
        let data = &self.base.document().streaming_data;
        Ok(self
            .itag_streams(&data.formats, ItagType::Video)
            .into_iter()
            .map(|(url, itag)| VideoStream::from_itag(url, itag))
            .collect())
    }

    fn video_only_streams(&self) -> Result<Vec<VideoStream>> {
        let data = &self.base.document().streaming_data;
        Ok(self
            .itag_streams(&data.adaptive_formats, ItagType::VideoOnly)
            .into_iter()
            .map(|(url, itag)| VideoStream::from_itag(url, itag))
            .collect())
    }

    fn subtitles(&self) -> Result<Vec<SubtitlesStream>> {
        let Some(tracks) = self
            .player()
            .pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")
        else {
            return Ok(Vec::new());
        };
        let Some(tracks) = tracks.as_array() else {
            return Err(ExtractionError::parsing("subtitles", "captionTracks is not a list"));
        };

        let mut subtitles = Vec::new();
        for raw in tracks {
            let track = match CaptionTrack::deserialize(raw) {
                Ok(track) => track,
                Err(e) => {
                    debug!(error = %e, "skipping malformed caption track");
                    continue;
                }
            };
            let url = if track.base_url.contains("fmt=") {
                track.base_url.clone()
            } else {
                format!("{}&fmt=vtt", track.base_url)
            };
            push_if_not_similar(
                &mut subtitles,
                SubtitlesStream {
                    url,
                    format: MediaFormat::Vtt,
                    auto_generated: track.is_auto_generated(),
                    language_tag: track.language_code,
                },
            );
        }
        Ok(subtitles)
    }

    fn dash_mpd_url(&self) -> Result<Option<String>> {
        Ok(self.base.document().streaming_data.dash_manifest_url.clone())
    }

    fn hls_url(&self) -> Result<Option<String>> {
        Ok(self.base.document().streaming_data.hls_manifest_url.clone())
    }

    async fn related_items(&self) -> Result<Option<Page<InfoItem>>> {
        let Some(results) = self
            .base
            .document()
            .initial_data
            .pointer("/contents/twoColumnWatchNextResults/secondaryResults/secondaryResults/results")
            .and_then(Value::as_array)
        else {
            return Ok(None);
        };

        let platform = self.base.platform();
        let mut collector = InfoItemsCollector::new(platform);
        collector.collect(results, |record| items::info_item(platform, record))?;
        Ok(Some(Page::from_collector(collector, None)))
    }

    fn error_message(&self) -> Option<String> {
        non_empty_str(self.player().pointer("/playabilityStatus/reason"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Platform;
    use crate::download::Localization;
    use crate::download::mock::MockDownloader;
    use crate::extractor::Extractor;
    use crate::linkhandler::LinkHandlerFactory;
    use crate::youtube::links::YoutubeStreamLinkHandlerFactory;
    use std::sync::Arc;

    fn watch_html(player: &Value, initial: &Value) -> String {
        format!(
            r#"<html><script>ytcfg.set({{"INNERTUBE_CLIENT_VERSION":"2.20250101.00.00"}});</script>
<script>var ytInitialPlayerResponse = {player};var meta = {{}};</script>
<script>var ytInitialData = {initial};</script></html>"#
        )
    }

    fn extractor(html: String) -> (YoutubeStreamExtractor, Arc<MockDownloader>) {
        let mock = Arc::new(MockDownloader::new().route("watch?v=dQw4w9WgXcQ", &html));
        let link = YoutubeStreamLinkHandlerFactory
            .from_url("https://youtu.be/dQw4w9WgXcQ")
            .unwrap();
        let base = ExtractorBase::new(Platform::YouTube, link, mock.clone(), Localization::default());
        (YoutubeStreamExtractor::new(base), mock)
    }

    fn player() -> Value {
        serde_json::json!({
            "playabilityStatus": {"status": "OK"},
            "videoDetails": {
                "videoId": "dQw4w9WgXcQ",
                "title": "Never Gonna Give You Up",
                "lengthSeconds": "213",
                "viewCount": "1500000000",
                "author": "Rick Astley",
                "channelId": "UCuAXFkgsw1L7xaCfnd5JJOw",
                "shortDescription": "The official video",
                "thumbnail": {"thumbnails": [{"url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg", "width": 480, "height": 360}]}
            },
            "microformat": {"playerMicroformatRenderer": {"publishDate": "2009-10-24T23:57:33-07:00"}},
            "streamingData": {
                "formats": [
                    {"itag": 18, "url": "https://r.googlevideo.com/18", "mimeType": "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"", "qualityLabel": "360p"}
                ],
                "adaptiveFormats": [
                    {"itag": 140, "url": "https://r.googlevideo.com/140", "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"", "bitrate": 130000},
                    {"itag": 251, "signatureCipher": "s=x&url=y", "mimeType": "audio/webm; codecs=\"opus\""},
                    {"itag": 774, "url": "https://r.googlevideo.com/774", "mimeType": "audio/webm; codecs=\"opus\"", "averageBitrate": 64000},
                    {"itag": 302, "url": "https://r.googlevideo.com/302", "mimeType": "video/webm; codecs=\"vp9\"", "fps": 60, "qualityLabel": "720p60"},
                    {"itag": 247, "url": "https://r.googlevideo.com/247", "mimeType": "video/webm; codecs=\"vp9\"", "fps": 30, "qualityLabel": "720p"},
                    {"itag": 9999, "url": "https://r.googlevideo.com/9999", "mimeType": "video/av01; codecs=\"av01\""}
                ]
            },
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                {"baseUrl": "https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=en", "languageCode": "en"},
                {"baseUrl": "https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=en&kind=asr", "languageCode": "en", "kind": "asr"}
            ]}}
        })
    }

    #[tokio::test]
    async fn test_watch_page() {
        let related = serde_json::json!({"contents": {"twoColumnWatchNextResults": {"secondaryResults": {"secondaryResults": {"results": [
            {"compactVideoRenderer": {"videoId": "yPYZpwSpKmA", "title": {"simpleText": "Together Forever"}, "lengthText": {"simpleText": "3:25"}}},
            {"compactVideoRenderer": {"videoId": "yPYZpwSpKmB"}}
        ]}}}}});
        let (mut e, mock) = extractor(watch_html(&player(), &related));
        e.fetch_page().await.unwrap();

        assert_eq!(e.name().unwrap(), "Never Gonna Give You Up");
        assert_eq!(e.length().unwrap(), 213);
        assert_eq!(e.view_count().unwrap(), 1_500_000_000);
        assert_eq!(e.uploader_name().unwrap(), "Rick Astley");
        assert_eq!(
            e.uploader_url().unwrap().as_deref(),
            Some("https://www.youtube.com/channel/UCuAXFkgsw1L7xaCfnd5JJOw")
        );
        assert!(e.upload_date().unwrap().is_some());
        assert_eq!(e.stream_type().unwrap(), StreamType::VideoStream);

        let audio = e.audio_streams().await.unwrap();
        assert_eq!(audio.len(), 2);
        assert_eq!(audio[0].format, MediaFormat::M4a);
        assert_eq!(audio[0].average_bitrate, 128);
        assert_eq!(audio[1].format, MediaFormat::WebmaOpus);
        assert_eq!(audio[1].average_bitrate, 63);

        let video = e.video_streams().unwrap();
        assert_eq!(video.len(), 1);
        assert_eq!(video[0].resolution, "360p");

        let video_only = e.video_only_streams().unwrap();
        assert_eq!(video_only.len(), 2);
        assert_eq!(video_only[0].resolution, "720p60");

        let subtitles = e.subtitles().unwrap();
        assert_eq!(subtitles.len(), 2);
        assert!(subtitles[1].auto_generated);
        assert!(subtitles[0].url.ends_with("&fmt=vtt"));

        let page = e.related_items().await.unwrap().unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.errors.len(), 1);

        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_format_is_skipped() {
        let mut player = player();
        player["streamingData"]["adaptiveFormats"]
            .as_array_mut()
            .unwrap()
            .insert(0, serde_json::json!({"itag": 9998, "url": "https://r.googlevideo.com/9998"}));
        player["streamingData"]["formats"]
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!({"itag": "eighteen", "mimeType": 5}));
        let (mut e, _) = extractor(watch_html(&player, &Value::Null));
        e.fetch_page().await.unwrap();

        assert_eq!(e.audio_streams().await.unwrap().len(), 2);
        assert_eq!(e.video_streams().unwrap().len(), 1);
        assert_eq!(e.video_only_streams().unwrap().len(), 2);
        let info = crate::info::StreamInfo::fetch(&mut e).await.unwrap();
        assert_eq!(info.audio_streams.len(), 2);
    }

    #[tokio::test]
    async fn test_live_stream_with_only_manifests() {
        let player = serde_json::json!({
            "playabilityStatus": {"status": "OK"},
            "videoDetails": {"videoId": "dQw4w9WgXcQ", "title": "Live radio", "lengthSeconds": "0", "author": "Lofi Girl", "isLive": true},
            "streamingData": {
                "hlsManifestUrl": "https://manifest.googlevideo.com/api/manifest/hls_variant/id/1",
                "dashManifestUrl": "https://manifest.googlevideo.com/api/manifest/dash/id/1"
            }
        });
        let (mut e, _) = extractor(watch_html(&player, &Value::Null));
        let info = crate::info::StreamInfo::fetch(&mut e).await.unwrap();

        assert_eq!(info.stream_type, StreamType::LiveStream);
        assert!(info.audio_streams.is_empty());
        assert_eq!(
            info.hls_url.as_deref(),
            Some("https://manifest.googlevideo.com/api/manifest/hls_variant/id/1")
        );
        assert_eq!(
            info.dash_mpd_url.as_deref(),
            Some("https://manifest.googlevideo.com/api/manifest/dash/id/1")
        );
    }

    #[tokio::test]
    async fn test_video_without_streams_or_manifests() {
        let player = serde_json::json!({
            "playabilityStatus": {"status": "OK"},
            "videoDetails": {"videoId": "dQw4w9WgXcQ", "title": "Nothing here", "author": "Nobody"}
        });
        let (mut e, _) = extractor(watch_html(&player, &Value::Null));
        assert!(matches!(
            crate::info::StreamInfo::fetch(&mut e).await,
            Err(ExtractionError::ContentNotSupported(_))
        ));
    }

    #[tokio::test]
    async fn test_unplayable_video() {
        let player = serde_json::json!({"playabilityStatus": {"status": "ERROR", "reason": "Video unavailable"}});
        let (mut e, _) = extractor(watch_html(&player, &Value::Null));
        match e.fetch_page().await {
            Err(ExtractionError::ContentNotAvailable(reason)) => {
                assert_eq!(reason, "Video unavailable")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_age_restricted_video() {
        let player = serde_json::json!({"playabilityStatus": {"status": "LOGIN_REQUIRED", "reason": "Sign in to confirm your age"}});
        let (mut e, _) = extractor(watch_html(&player, &Value::Null));
        assert!(matches!(
            e.fetch_page().await,
            Err(ExtractionError::ContentNotSupported(_))
        ));
    }
}
