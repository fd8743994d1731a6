//! Whole-resource snapshots built from an extractor, for callers that want
//! everything at once.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::core::{Image, InfoItem, Platform, StreamType};
use crate::error::{ExtractionError, Result};
use crate::extractor::StreamExtractor;
use crate::list::{ListExtractor, Page};
use crate::stream::{AudioStream, SubtitlesStream, VideoStream};

#[derive(Debug, Serialize)]
pub struct StreamInfo {
    pub platform: Platform,
    pub id: String,
    pub url: String,
    pub original_url: String,
    pub name: String,
    pub stream_type: StreamType,
    pub duration: i64,
    pub view_count: i64,
    pub uploader_name: Option<String>,
    pub uploader_url: Option<String>,
    pub description: Option<String>,
    pub textual_upload_date: Option<String>,
    pub upload_date: Option<DateTime<Utc>>,
    pub thumbnails: Vec<Image>,
    pub audio_streams: Vec<AudioStream>,
    pub video_streams: Vec<VideoStream>,
    pub video_only_streams: Vec<VideoStream>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash_mpd_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hls_url: Option<String>,
    pub subtitles: Vec<SubtitlesStream>,
    pub related_items: Vec<InfoItem>,
    /// Failures of individual fields; the rest of the snapshot is still usable.
    #[serde(serialize_with = "serialize_errors")]
    pub errors: Vec<ExtractionError>,
}

fn serialize_errors<S: serde::Serializer>(
    errors: &[ExtractionError],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}

/// Keep `value`, or record its error and fall back to `default`.
fn record<T>(errors: &mut Vec<ExtractionError>, value: Result<T>, default: T) -> T {
    match value {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "field unavailable");
            errors.push(e);
            default
        }
    }
}

impl StreamInfo {
    /// Fetch `extractor` and read every accessor.
    ///
    /// Fetch failures and a missing name abort; other fields degrade. It is
    /// an error for a stream to end up with no playable stream at all; a DASH
    /// or HLS manifest counts as playable.
    pub async fn fetch(extractor: &mut dyn StreamExtractor) -> Result<Self> {
        extractor.fetch_page().await?;
        let name = extractor.name()?;

        let mut errors = Vec::new();
        let stream_type = record(&mut errors, extractor.stream_type(), StreamType::VideoStream);
        let audio_streams = record(&mut errors, extractor.audio_streams().await, Vec::new());
        let video_streams = record(&mut errors, extractor.video_streams(), Vec::new());
        let video_only_streams = record(&mut errors, extractor.video_only_streams(), Vec::new());
        let dash_mpd_url = record(&mut errors, extractor.dash_mpd_url(), None);
        let hls_url = record(&mut errors, extractor.hls_url(), None);
        if audio_streams.is_empty()
            && video_streams.is_empty()
            && video_only_streams.is_empty()
            && dash_mpd_url.is_none()
            && hls_url.is_none()
        {
            return Err(errors.pop().unwrap_or_else(|| {
                ExtractionError::ContentNotSupported(format!(
                    "no playable streams for {}",
                    extractor.url()
                ))
            }));
        }

        let related = record(&mut errors, extractor.related_items().await, None);
        let related_items = match related {
            Some(page) => {
                errors.extend(page.errors);
                page.items
            }
            None => Vec::new(),
        };

        Ok(Self {
            platform: extractor.platform(),
            id: extractor.id().to_string(),
            url: extractor.url().to_string(),
            original_url: extractor.original_url().to_string(),
            name,
            stream_type,
            duration: record(&mut errors, extractor.length(), -1),
            view_count: record(&mut errors, extractor.view_count(), -1),
            uploader_name: record(&mut errors, extractor.uploader_name().map(Some), None),
            uploader_url: record(&mut errors, extractor.uploader_url(), None),
            description: record(&mut errors, extractor.description(), None),
            textual_upload_date: record(&mut errors, extractor.textual_upload_date(), None),
            upload_date: record(&mut errors, extractor.upload_date(), None),
            thumbnails: record(&mut errors, extractor.thumbnails(), Vec::new()),
            subtitles: record(&mut errors, extractor.subtitles(), Vec::new()),
            audio_streams,
            video_streams,
            video_only_streams,
            dash_mpd_url,
            hls_url,
            related_items,
            errors,
        })
    }
}

/// Name plus first page of any listing.
#[derive(Debug, Serialize)]
pub struct ListInfo<T> {
    pub platform: Platform,
    pub id: String,
    pub url: String,
    pub name: String,
    #[serde(flatten)]
    pub page: Page<T>,
}

impl<T: Send> ListInfo<T> {
    pub async fn fetch<E>(extractor: &mut E) -> Result<Self>
    where
        E: ListExtractor<T> + ?Sized,
    {
        extractor.fetch_page().await?;
        Ok(Self {
            platform: extractor.platform(),
            id: extractor.id().to_string(),
            url: extractor.url().to_string(),
            name: extractor.name()?,
            page: extractor.initial_page().await?,
        })
    }
}
