use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::itag::ItagItem;

/// Container formats a stream can be delivered in.
#[derive(EnumIter, Display, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaFormat {
    // video and audio combined
    Mpeg4,
    V3gpp,
    Webm,
    // audio only
    M4a,
    Webma,
    Mp3,
    Opus,
    WebmaOpus,
    // subtitles
    Vtt,
    Ttml,
    Srt,
}

impl MediaFormat {
    pub fn id(&self) -> u32 {
        match self {
            MediaFormat::Mpeg4 => 0x0,
            MediaFormat::V3gpp => 0x10,
            MediaFormat::Webm => 0x20,
            MediaFormat::M4a => 0x100,
            MediaFormat::Webma => 0x200,
            MediaFormat::Mp3 => 0x300,
            MediaFormat::Opus => 0x400,
            MediaFormat::WebmaOpus => 0x500,
            MediaFormat::Vtt => 0x1000,
            MediaFormat::Ttml => 0x2000,
            MediaFormat::Srt => 0x4000,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MediaFormat::Mpeg4 => "MPEG-4",
            MediaFormat::V3gpp => "3GPP",
            MediaFormat::Webm => "WebM",
            MediaFormat::M4a => "m4a",
            MediaFormat::Webma => "WebM",
            MediaFormat::Mp3 => "MP3",
            MediaFormat::Opus => "opus",
            MediaFormat::WebmaOpus => "WebM Opus",
            MediaFormat::Vtt => "WebVTT",
            MediaFormat::Ttml => "Timed Text Markup Language",
            MediaFormat::Srt => "SubRip file format",
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            MediaFormat::Mpeg4 => "mp4",
            MediaFormat::V3gpp => "3gp",
            MediaFormat::Webm => "webm",
            MediaFormat::M4a => "m4a",
            MediaFormat::Webma => "webm",
            MediaFormat::Mp3 => "mp3",
            MediaFormat::Opus => "opus",
            MediaFormat::WebmaOpus => "webm",
            MediaFormat::Vtt => "vtt",
            MediaFormat::Ttml => "ttml",
            MediaFormat::Srt => "srt",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaFormat::Mpeg4 => "video/mp4",
            MediaFormat::V3gpp => "video/3gpp",
            MediaFormat::Webm => "video/webm",
            MediaFormat::M4a => "audio/mp4",
            MediaFormat::Webma | MediaFormat::WebmaOpus => "audio/webm",
            MediaFormat::Mp3 => "audio/mpeg",
            MediaFormat::Opus => "audio/opus",
            MediaFormat::Vtt => "text/vtt",
            MediaFormat::Ttml => "application/ttml+xml",
            MediaFormat::Srt => "text/srt",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        use strum::IntoEnumIterator;
        Self::iter().find(|f| f.suffix().eq_ignore_ascii_case(suffix))
    }
}

/// Interchangeable for playback purposes.
pub trait Similar {
    fn is_similar(&self, other: &Self) -> bool;
}

pub fn contains_similar<T: Similar>(list: &[T], candidate: &T) -> bool {
    list.iter().any(|existing| existing.is_similar(candidate))
}

/// Append `candidate` unless an earlier entry is similar. Returns whether it was added.
pub fn push_if_not_similar<T: Similar>(list: &mut Vec<T>, candidate: T) -> bool {
    if contains_similar(list, &candidate) {
        return false;
    }
    list.push(candidate);
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStream {
    pub url: String,
    pub format: MediaFormat,
    /// kbps, -1 when unknown.
    pub average_bitrate: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itag: Option<ItagItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
}

impl AudioStream {
    pub fn new(url: impl Into<String>, format: MediaFormat, average_bitrate: i32) -> Self {
        Self {
            url: url.into(),
            format,
            average_bitrate,
            itag: None,
            codec: None,
        }
    }

    pub fn from_itag(url: impl Into<String>, itag: ItagItem) -> Self {
        Self {
            url: url.into(),
            format: itag.format,
            average_bitrate: itag.average_bitrate,
            codec: itag.codec.clone(),
            itag: Some(itag),
        }
    }
}

impl Similar for AudioStream {
    fn is_similar(&self, other: &Self) -> bool {
        self.format == other.format && self.average_bitrate == other.average_bitrate
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStream {
    pub url: String,
    pub format: MediaFormat,
    /// Label such as `720p` or `1080p60`.
    pub resolution: String,
    pub fps: u32,
    pub is_video_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itag: Option<ItagItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
}

impl VideoStream {
    pub fn from_itag(url: impl Into<String>, itag: ItagItem) -> Self {
        Self {
            url: url.into(),
            format: itag.format,
            resolution: itag.resolution.clone().unwrap_or_default(),
            fps: itag.fps,
            is_video_only: itag.is_video_only(),
            codec: itag.codec.clone(),
            itag: Some(itag),
        }
    }
}

impl Similar for VideoStream {
    fn is_similar(&self, other: &Self) -> bool {
        self.is_video_only == other.is_video_only
            && self.format == other.format
            && self.resolution == other.resolution
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitlesStream {
    pub url: String,
    pub format: MediaFormat,
    pub language_tag: String,
    pub auto_generated: bool,
}

impl Similar for SubtitlesStream {
    fn is_similar(&self, other: &Self) -> bool {
        self.format == other.format
            && self.language_tag == other.language_tag
            && self.auto_generated == other.auto_generated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(format: MediaFormat, resolution: &str, fps: u32) -> VideoStream {
        VideoStream {
            url: format!("https://cdn.example.com/{resolution}{fps}"),
            format,
            resolution: resolution.to_string(),
            fps,
            is_video_only: false,
            itag: None,
            codec: None,
        }
    }

    #[test]
    fn test_fps_ignored_for_similarity() {
        let mut list = vec![video(MediaFormat::Webm, "720p", 60)];
        assert!(!push_if_not_similar(&mut list, video(MediaFormat::Webm, "720p", 30)));
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].fps, 60);

        assert!(push_if_not_similar(&mut list, video(MediaFormat::Mpeg4, "720p", 30)));
        assert!(push_if_not_similar(&mut list, video(MediaFormat::Webm, "1080p", 30)));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_audio_similarity() {
        let a = AudioStream::new("a", MediaFormat::M4a, 128);
        let b = AudioStream::new("b", MediaFormat::M4a, 128);
        let c = AudioStream::new("c", MediaFormat::WebmaOpus, 128);
        assert!(a.is_similar(&b));
        assert!(!a.is_similar(&c));
    }

    #[test]
    fn test_media_format_lookup() {
        assert_eq!(MediaFormat::from_suffix("MP3"), Some(MediaFormat::Mp3));
        assert_eq!(MediaFormat::from_suffix("flac"), None);
        assert_eq!(MediaFormat::M4a.mime_type(), "audio/mp4");
    }
}
