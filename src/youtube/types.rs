use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayabilityStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingData {
    /// Raw entries; each is read as a [`Format`] on its own so one bad entry
    /// does not sink the rest.
    #[serde(default)]
    pub formats: Vec<Value>,
    #[serde(default)]
    pub adaptive_formats: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hls_manifest_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash_manifest_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Format {
    pub itag: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub mime_type: String,
    #[serde(default)]
    pub bitrate: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_bitrate: Option<i64>,
    #[serde(default)]
    pub fps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_cipher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,
}

impl Format {
    /// Formats whose URL needs player JS to unlock.
    pub fn is_ciphered(&self) -> bool {
        self.url.is_none() && (self.signature_cipher.is_some() || self.cipher.is_some())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}
