//! Known stream format identifiers and the fallback used for unknown ones.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExtractionError, Result};
use crate::stream::{MediaFormat, Similar};

const DEFAULT_FPS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItagType {
    Audio,
    /// Muxed audio and video.
    Video,
    VideoOnly,
}

/// Normalized description of one format variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItagItem {
    pub id: u32,
    pub itag_type: ItagType,
    pub format: MediaFormat,
    /// Video only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// Video only.
    pub fps: u32,
    /// kbps, audio only; -1 otherwise.
    pub average_bitrate: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
}

impl ItagItem {
    pub fn is_video_only(&self) -> bool {
        self.itag_type == ItagType::VideoOnly
    }

    pub fn is_audio(&self) -> bool {
        self.itag_type == ItagType::Audio
    }
}

impl Similar for ItagItem {
    fn is_similar(&self, other: &Self) -> bool {
        if self.itag_type != other.itag_type || self.format != other.format {
            return false;
        }
        match self.itag_type {
            ItagType::Audio => self.average_bitrate == other.average_bitrate,
            ItagType::Video | ItagType::VideoOnly => self.resolution == other.resolution,
        }
    }
}

struct ItagEntry {
    id: u32,
    itag_type: ItagType,
    format: MediaFormat,
    resolution: &'static str,
    fps: u32,
    bitrate: i32,
}

const fn video(id: u32, format: MediaFormat, resolution: &'static str) -> ItagEntry {
    ItagEntry {
        id,
        itag_type: ItagType::Video,
        format,
        resolution,
        fps: DEFAULT_FPS,
        bitrate: -1,
    }
}

const fn audio(id: u32, format: MediaFormat, bitrate: i32) -> ItagEntry {
    ItagEntry {
        id,
        itag_type: ItagType::Audio,
        format,
        resolution: "",
        fps: 0,
        bitrate,
    }
}

const fn video_only(id: u32, format: MediaFormat, resolution: &'static str, fps: u32) -> ItagEntry {
    ItagEntry {
        id,
        itag_type: ItagType::VideoOnly,
        format,
        resolution,
        fps,
        bitrate: -1,
    }
}

use MediaFormat::{M4a, Mpeg4, V3gpp, Webm, Webma, WebmaOpus};

/// Ordered catalog; the first entry with a matching id wins.
static ITAG_LIST: &[ItagEntry] = &[
    video(17, V3gpp, "144p"),
    video(36, V3gpp, "240p"),
    video(18, Mpeg4, "360p"),
    video(34, Mpeg4, "360p"),
    video(35, Mpeg4, "480p"),
    video(59, Mpeg4, "480p"),
    video(78, Mpeg4, "480p"),
    video(22, Mpeg4, "720p"),
    video(37, Mpeg4, "1080p"),
    video(38, Mpeg4, "1080p"),
    video(43, Webm, "360p"),
    video(44, Webm, "480p"),
    video(45, Webm, "720p"),
    video(46, Webm, "1080p"),
    audio(171, Webma, 128),
    audio(172, Webma, 256),
    audio(139, M4a, 48),
    audio(140, M4a, 128),
    audio(141, M4a, 256),
    audio(249, WebmaOpus, 50),
    audio(250, WebmaOpus, 70),
    audio(251, WebmaOpus, 160),
    video_only(160, Mpeg4, "144p", DEFAULT_FPS),
    video_only(133, Mpeg4, "240p", DEFAULT_FPS),
    video_only(135, Mpeg4, "480p", DEFAULT_FPS),
    video_only(212, Mpeg4, "480p", DEFAULT_FPS),
    video_only(298, Mpeg4, "720p60", 60),
    video_only(137, Mpeg4, "1080p", DEFAULT_FPS),
    video_only(299, Mpeg4, "1080p60", 60),
    video_only(266, Mpeg4, "2160p", DEFAULT_FPS),
    video_only(402, Mpeg4, "4320p", DEFAULT_FPS),
    video_only(571, Mpeg4, "4320p", DEFAULT_FPS),
    video_only(402, Mpeg4, "4320p60", 60),
    video_only(278, Webm, "144p", DEFAULT_FPS),
    video_only(242, Webm, "240p", DEFAULT_FPS),
    video_only(243, Webm, "360p", DEFAULT_FPS),
    video_only(244, Webm, "480p", DEFAULT_FPS),
    video_only(245, Webm, "480p", DEFAULT_FPS),
    video_only(246, Webm, "480p", DEFAULT_FPS),
    video_only(247, Webm, "720p", DEFAULT_FPS),
    video_only(248, Webm, "1080p", DEFAULT_FPS),
    video_only(271, Webm, "1440p", DEFAULT_FPS),
    video_only(302, Webm, "720p60", 60),
    video_only(303, Webm, "1080p60", 60),
    video_only(308, Webm, "1440p60", 60),
    video_only(313, Webm, "2160p", DEFAULT_FPS),
    video_only(315, Webm, "2160p60", 60),
    video_only(272, Webm, "4320p60", 60),
];

impl From<&ItagEntry> for ItagItem {
    fn from(entry: &ItagEntry) -> Self {
        let is_audio = entry.itag_type == ItagType::Audio;
        Self {
            id: entry.id,
            itag_type: entry.itag_type,
            format: entry.format,
            resolution: (!is_audio).then(|| entry.resolution.to_string()),
            fps: entry.fps,
            average_bitrate: entry.bitrate,
            codec: None,
        }
    }
}

pub fn is_supported(id: u32) -> bool {
    ITAG_LIST.iter().any(|entry| entry.id == id)
}

/// Table lookup.
pub fn resolve_format(id: u32) -> Result<ItagItem> {
    ITAG_LIST
        .iter()
        .find(|entry| entry.id == id)
        .map(ItagItem::from)
        .ok_or_else(|| ExtractionError::UnknownFormat(format!("itag {id}")))
}

/// Raw metadata a platform reports next to a format id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatMetadata<'a> {
    /// e.g. `audio/webm; codecs="opus"`.
    pub media_type: &'a str,
    /// Bits per second.
    pub average_bitrate: i64,
    pub fps: u32,
    pub quality_label: &'a str,
}

/// Table lookup, falling back to [`derive_format`] for ids the table lacks.
pub fn resolve_format_with(id: u32, metadata: &FormatMetadata<'_>) -> Result<ItagItem> {
    match resolve_format(id) {
        Ok(item) => Ok(item),
        Err(_) if !metadata.media_type.is_empty() => {
            debug!(id, media_type = metadata.media_type, "itag not in table, deriving");
            derive_format(id, metadata)
        }
        Err(e) => Err(e),
    }
}

/// Build a descriptor from the declared media type and quality fields.
pub fn derive_format(id: u32, metadata: &FormatMetadata<'_>) -> Result<ItagItem> {
    let unknown = || ExtractionError::UnknownFormat(format!("itag {id} ({})", metadata.media_type));

    let mut sections = metadata.media_type.split(';');
    let essence = sections.next().unwrap_or_default().trim().to_lowercase();
    let (stream_kind, container) = essence.split_once('/').ok_or_else(unknown)?;
    let codec = sections
        .next()
        .and_then(|params| params.split('"').nth(1))
        .unwrap_or_default()
        .trim()
        .to_string();

    let itag_type = if codec.contains(',') {
        ItagType::Video
    } else {
        match stream_kind {
            "video" => ItagType::VideoOnly,
            "audio" => ItagType::Audio,
            _ => return Err(unknown()),
        }
    };

    let format = match (itag_type, container) {
        (ItagType::Audio, "mp4") if codec.starts_with("m4a") || codec.starts_with("mp4a") => M4a,
        (ItagType::Audio, "webm") if codec == "opus" => WebmaOpus,
        (ItagType::Audio, "webm") if codec == "vorbis" => Webma,
        (ItagType::Video, "mp4") => Mpeg4,
        (ItagType::VideoOnly, "mp4") => Mpeg4,
        (ItagType::VideoOnly, "webm") => Webm,
        _ => return Err(unknown()),
    };

    let codec = (!codec.is_empty()).then_some(codec);
    let item = match itag_type {
        ItagType::Audio => ItagItem {
            id,
            itag_type,
            format,
            resolution: None,
            fps: 0,
            average_bitrate: (metadata.average_bitrate as f64 / 1024.0).round() as i32,
            codec,
        },
        ItagType::Video | ItagType::VideoOnly => ItagItem {
            id,
            itag_type,
            format,
            resolution: (!metadata.quality_label.is_empty())
                .then(|| metadata.quality_label.to_string()),
            fps: if metadata.fps == 0 { DEFAULT_FPS } else { metadata.fps },
            average_bitrate: -1,
            codec,
        },
    };
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup() {
        let item = resolve_format(140).unwrap();
        assert_eq!(item.itag_type, ItagType::Audio);
        assert_eq!(item.format, M4a);
        assert_eq!(item.average_bitrate, 128);
        assert_eq!(item.resolution, None);

        let item = resolve_format(303).unwrap();
        assert!(item.is_video_only());
        assert_eq!(item.resolution.as_deref(), Some("1080p60"));
        assert_eq!(item.fps, 60);

        let item = resolve_format(22).unwrap();
        assert_eq!(item.itag_type, ItagType::Video);
        assert_eq!(item.fps, DEFAULT_FPS);
    }

    #[test]
    fn test_duplicate_id_first_wins() {
        let item = resolve_format(402).unwrap();
        assert_eq!(item.resolution.as_deref(), Some("4320p"));
        assert_eq!(item.fps, DEFAULT_FPS);
    }

    #[test]
    fn test_unknown_format() {
        assert!(!is_supported(999_999));
        assert!(matches!(
            resolve_format(999_999),
            Err(ExtractionError::UnknownFormat(_))
        ));
        assert!(matches!(
            resolve_format_with(999_999, &FormatMetadata::default()),
            Err(ExtractionError::UnknownFormat(_))
        ));
        let flac = FormatMetadata {
            media_type: "audio/flac",
            ..Default::default()
        };
        assert!(matches!(
            resolve_format_with(999_999, &flac),
            Err(ExtractionError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_derive_audio() {
        let meta = FormatMetadata {
            media_type: "audio/webm; codecs=\"opus\"",
            average_bitrate: 64000,
            fps: 0,
            quality_label: "",
        };
        let item = resolve_format_with(999_999, &meta).unwrap();
        assert_eq!(item.itag_type, ItagType::Audio);
        assert_eq!(item.format, WebmaOpus);
        assert_eq!(item.average_bitrate, 63);
        assert_eq!(item.codec.as_deref(), Some("opus"));

        let m4a = FormatMetadata {
            media_type: "audio/mp4; codecs=\"mp4a.40.2\"",
            average_bitrate: 131_072,
            ..Default::default()
        };
        assert_eq!(derive_format(1, &m4a).unwrap().format, M4a);
    }

    #[test]
    fn test_derive_video() {
        let muxed = FormatMetadata {
            media_type: "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"",
            quality_label: "360p",
            ..Default::default()
        };
        let item = derive_format(1000, &muxed).unwrap();
        assert_eq!(item.itag_type, ItagType::Video);
        assert_eq!(item.format, Mpeg4);
        assert_eq!(item.fps, DEFAULT_FPS);

        let video_only = FormatMetadata {
            media_type: "video/webm; codecs=\"vp9\"",
            fps: 60,
            quality_label: "1440p60",
            ..Default::default()
        };
        let item = derive_format(1001, &video_only).unwrap();
        assert!(item.is_video_only());
        assert_eq!(item.format, Webm);
        assert_eq!(item.fps, 60);
        assert_eq!(item.resolution.as_deref(), Some("1440p60"));

        let muxed_webm = FormatMetadata {
            media_type: "video/webm; codecs=\"vp8, vorbis\"",
            ..Default::default()
        };
        assert!(derive_format(1002, &muxed_webm).is_err());
    }
}
