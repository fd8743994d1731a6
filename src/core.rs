use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
pub use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// Supported platforms
#[derive(EnumIter, Display, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Copy)]
pub enum Platform {
    #[cfg(feature = "youtube")]
    YouTube,
    #[cfg(feature = "soundcloud")]
    SoundCloud,
}

impl Platform {
    pub fn service_id(&self) -> u32 {
        match self {
            #[cfg(feature = "youtube")]
            Platform::YouTube => 0,
            #[cfg(feature = "soundcloud")]
            Platform::SoundCloud => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ResolutionLevel {
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

impl ResolutionLevel {
    /// Classify by pixel height.
    pub fn from_height(height: Option<u32>) -> Self {
        match height {
            None | Some(0) => Self::Unknown,
            Some(h) if h < 175 => Self::Low,
            Some(h) if h < 720 => Self::Medium,
            Some(_) => Self::High,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Image {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub resolution: ResolutionLevel,
}

impl Image {
    pub fn new(url: impl Into<String>, width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            url: url.into(),
            width,
            height,
            resolution: ResolutionLevel::from_height(height),
        }
    }

    pub fn with_level(url: impl Into<String>, resolution: ResolutionLevel) -> Self {
        Self {
            url: url.into(),
            width: None,
            height: None,
            resolution,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum StreamType {
    #[default]
    VideoStream,
    AudioStream,
    LiveStream,
    AudioLiveStream,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InfoType {
    Stream,
    Playlist,
    Channel,
    Comment,
}

/// Preview of a video or track, as found in listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamInfoItem {
    pub platform: Platform,
    pub url: String,
    pub name: String,
    pub thumbnails: Vec<Image>,
    pub stream_type: StreamType,
    /// Seconds, -1 when unknown.
    pub duration: i64,
    /// -1 when unknown.
    pub view_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textual_upload_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
}

impl StreamInfoItem {
    pub fn new(platform: Platform, url: String, name: String, stream_type: StreamType) -> Self {
        Self {
            platform,
            url,
            name,
            thumbnails: Vec::new(),
            stream_type,
            duration: -1,
            view_count: -1,
            uploader_name: None,
            uploader_url: None,
            textual_upload_date: None,
            upload_date: None,
            short_description: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaylistInfoItem {
    pub platform: Platform,
    pub url: String,
    pub name: String,
    pub thumbnails: Vec<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader_name: Option<String>,
    /// -1 when unknown.
    pub stream_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelInfoItem {
    pub platform: Platform,
    pub url: String,
    pub name: String,
    pub thumbnails: Vec<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub subscriber_count: i64,
    pub stream_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentsInfoItem {
    pub platform: Platform,
    pub url: String,
    /// Display name of the comment author.
    pub name: String,
    /// Author avatars.
    pub thumbnails: Vec<Image>,
    pub comment_id: String,
    pub comment_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textual_upload_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<DateTime<Utc>>,
    pub like_count: i64,
    /// Milliseconds into the stream the comment points at, -1 when absent.
    pub stream_position: i64,
}

/// Any normalized listing entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InfoItem {
    Stream(StreamInfoItem),
    Playlist(PlaylistInfoItem),
    Channel(ChannelInfoItem),
    Comment(CommentsInfoItem),
}

impl InfoItem {
    pub fn info_type(&self) -> InfoType {
        match self {
            InfoItem::Stream(_) => InfoType::Stream,
            InfoItem::Playlist(_) => InfoType::Playlist,
            InfoItem::Channel(_) => InfoType::Channel,
            InfoItem::Comment(_) => InfoType::Comment,
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            InfoItem::Stream(i) => i.platform,
            InfoItem::Playlist(i) => i.platform,
            InfoItem::Channel(i) => i.platform,
            InfoItem::Comment(i) => i.platform,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            InfoItem::Stream(i) => &i.url,
            InfoItem::Playlist(i) => &i.url,
            InfoItem::Channel(i) => &i.url,
            InfoItem::Comment(i) => &i.url,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            InfoItem::Stream(i) => &i.name,
            InfoItem::Playlist(i) => &i.name,
            InfoItem::Channel(i) => &i.name,
            InfoItem::Comment(i) => &i.name,
        }
    }

    pub fn thumbnails(&self) -> &[Image] {
        match self {
            InfoItem::Stream(i) => &i.thumbnails,
            InfoItem::Playlist(i) => &i.thumbnails,
            InfoItem::Channel(i) => &i.thumbnails,
            InfoItem::Comment(i) => &i.thumbnails,
        }
    }
}

impl From<StreamInfoItem> for InfoItem {
    fn from(item: StreamInfoItem) -> Self {
        InfoItem::Stream(item)
    }
}

impl From<PlaylistInfoItem> for InfoItem {
    fn from(item: PlaylistInfoItem) -> Self {
        InfoItem::Playlist(item)
    }
}

impl From<ChannelInfoItem> for InfoItem {
    fn from(item: ChannelInfoItem) -> Self {
        InfoItem::Channel(item)
    }
}

impl From<CommentsInfoItem> for InfoItem {
    fn from(item: CommentsInfoItem) -> Self {
        InfoItem::Comment(item)
    }
}
