use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue, ORIGIN};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::cache::SharedValue;
use crate::core::Image;
use crate::download::{Downloader, Localization, Request};
use crate::error::{ExtractionError, Result};
use crate::list::Cursor;
use crate::parsing::{extract_json_after, fix_thumbnail_url, match_group1};

pub const BASE_URL: &str = "https://www.youtube.com";
const INNERTUBE_URL: &str = "https://www.youtube.com/youtubei/v1";
const CONSENT_COOKIE: &str = "CONSENT=YES+cb; SOCS=CAI";
pub const FALLBACK_CLIENT_VERSION: &str = "2.20251015.01.00";

/// WEB client version sent with every InnerTube call.
pub static CLIENT_VERSION: SharedValue = SharedValue::new("youtube client version");

const VIDEO_HOSTS: &[&str] = &[
    "youtube.com",
    "music.youtube.com",
    "youtube-nocookie.com",
    "youtu.be",
    "hooktube.com",
];

/// Validate if a string is a valid YouTube video ID (11 characters, alphanumeric + - and _)
pub fn is_valid_video_id(id: &str) -> bool {
    id.len() == 11 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Playlist IDs start with PL, UU, LL, RD, OL or FL and are at most 34 characters long
pub fn is_valid_playlist_id(id: &str) -> bool {
    if id.len() < 2 || id.len() > 34 {
        return false;
    }

    let has_valid_prefix = ["PL", "UU", "LL", "RD", "OL", "FL"]
        .iter()
        .any(|prefix| id.starts_with(prefix));
    let valid_chars = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    has_valid_prefix && valid_chars
}

/// Strict host check: a known YouTube domain or one of its subdomains.
pub fn is_youtube_host(host: &str) -> bool {
    VIDEO_HOSTS
        .iter()
        .any(|known| host == *known || host.ends_with(&format!(".{known}")))
}

pub fn build_watch_url(video_id: &str) -> String {
    format!("{BASE_URL}/watch?v={video_id}")
}

pub fn build_playlist_url(playlist_id: &str) -> String {
    format!("{BASE_URL}/playlist?list={playlist_id}")
}

pub fn build_search_url(query: &str, params: Option<&str>) -> String {
    let mut url = format!(
        "{BASE_URL}/results?search_query={}",
        urlencoding::encode(query)
    );
    if let Some(params) = params {
        url.push_str("&sp=");
        url.push_str(&urlencoding::encode(params));
    }
    url
}

/// Images from a `{"thumbnails": [{url, width, height}]}` object.
pub fn thumbnails_from(value: Option<&Value>) -> Vec<Image> {
    value
        .and_then(|v| v.get("thumbnails"))
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|t| {
                    let url = t.get("url")?.as_str()?;
                    let dim = |key: &str| t.get(key).and_then(Value::as_u64).map(|d| d as u32);
                    Some(Image::new(fix_thumbnail_url(url), dim("width"), dim("height")))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Store the client version advertised by a fetched page, if none is cached yet.
pub fn remember_client_version(html: &str) {
    if CLIENT_VERSION.get().is_some() {
        return;
    }
    if let Ok(version) = match_group1(r#""INNERTUBE_CLIENT_VERSION"\s*:\s*"([^"]+)""#, html) {
        CLIENT_VERSION.init(version);
    }
}

/// The cached client version, scraping the results page when nothing is cached.
pub async fn client_version(downloader: &dyn Downloader, localization: &Localization) -> String {
    if let Some(version) = CLIENT_VERSION.get() {
        return version;
    }
    let scraped = match fetch_html(downloader, &build_search_url("", None), localization).await {
        Ok(_) => CLIENT_VERSION.get(),
        Err(e) => {
            warn!(error = %e, "could not scrape client version");
            None
        }
    };
    scraped.unwrap_or_else(|| FALLBACK_CLIENT_VERSION.to_string())
}

fn current_client_version() -> String {
    CLIENT_VERSION
        .get()
        .unwrap_or_else(|| FALLBACK_CLIENT_VERSION.to_string())
}

/// GET a youtube.com page past the consent wall.
pub async fn fetch_html(
    downloader: &dyn Downloader,
    url: &str,
    localization: &Localization,
) -> Result<String> {
    let request = Request::get(url)
        .header(COOKIE, HeaderValue::from_static(CONSENT_COOKIE))
        .localization(localization);
    let response = downloader.execute(request).await?.error_for_status()?;
    remember_client_version(&response.body);
    Ok(response.body)
}

/// `ytInitialData` embedded in a youtube.com page.
pub fn extract_initial_data(html: &str) -> Result<Value> {
    extract_json_after(html, "var ytInitialData = ")
        .or_else(|_| extract_json_after(html, "window[\"ytInitialData\"] = "))
}

/// The `context` object of an InnerTube WEB request.
pub fn innertube_context(client_version: &str, localization: &Localization) -> Value {
    json!({
        "client": {
            "clientName": "WEB",
            "clientVersion": client_version,
            "hl": localization.tag(),
            "gl": localization.country_code.as_deref().unwrap_or("US"),
            "utcOffsetMinutes": 0
        },
        "request": {"useSsl": true},
        "user": {"lockedSafetyMode": false}
    })
}

pub fn innertube_url(endpoint: &str) -> String {
    format!("{INNERTUBE_URL}/{endpoint}?prettyPrint=false")
}

/// POST to InnerTube. A 4xx answer drops the cached client version.
pub async fn innertube_post(
    downloader: &dyn Downloader,
    url: &str,
    body: Vec<u8>,
    localization: &Localization,
) -> Result<Value> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ORIGIN, HeaderValue::from_static(BASE_URL));
    headers.insert("x-youtube-client-name", HeaderValue::from_static("1"));
    headers.insert(
        "x-youtube-client-version",
        HeaderValue::from_str(&current_client_version())?,
    );

    let request = Request::post(url, body)
        .headers(headers)
        .localization(localization);
    let response = downloader.execute(request).await?;
    if (400..500).contains(&response.status) {
        warn!(status = response.status, url, "innertube rejected request");
        CLIENT_VERSION.invalidate();
    }
    response.error_for_status()?.json()
}

/// Cursor for a continuation token against `endpoint` (`browse`, `search`, `next`).
///
/// Only the token is kept; the request body is built when the page is fetched
/// so it carries whatever client version is current by then.
pub fn continuation_cursor(endpoint: &str, token: &str) -> Cursor {
    Cursor::new(innertube_url(endpoint)).with_id(token)
}

/// Fetch the page a continuation cursor points at.
pub async fn fetch_continuation(
    downloader: &dyn Downloader,
    cursor: &Cursor,
    localization: &Localization,
) -> Result<Value> {
    let Some(token) = cursor.id.as_deref() else {
        return Err(ExtractionError::InvalidCursor(format!(
            "no continuation token for {}",
            cursor.url
        )));
    };
    let body = serde_json::to_vec(&json!({
        "context": innertube_context(&current_client_version(), localization),
        "continuation": token,
    }))?;
    debug!(url = %cursor.url, "fetching continuation");
    innertube_post(downloader, &cursor.url, body, localization).await
}

/// Token of a `continuationItemRenderer` record.
pub fn continuation_token(record: &Value) -> Option<String> {
    record
        .pointer("/continuationItemRenderer/continuationEndpoint/continuationCommand/token")
        .or_else(|| {
            record.pointer(
                "/continuationItemRenderer/button/buttonRenderer/command/continuationCommand/token",
            )
        })
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Items appended by a continuation response.
pub fn continuation_items(response: &Value) -> Vec<Value> {
    ["/onResponseReceivedActions", "/onResponseReceivedCommands"]
        .iter()
        .filter_map(|p| response.pointer(p).and_then(Value::as_array))
        .flatten()
        .filter_map(|action| {
            action
                .pointer("/appendContinuationItemsAction/continuationItems")
                .or_else(|| action.pointer("/reloadContinuationItemsCommand/continuationItems"))
                .and_then(Value::as_array)
        })
        .flatten()
        .cloned()
        .collect()
}

/// Message of the first error alert on a browse page.
pub fn error_alert(initial_data: &Value) -> Option<String> {
    initial_data
        .get("alerts")?
        .as_array()?
        .iter()
        .filter_map(|a| a.get("alertRenderer"))
        .find(|a| a.get("type").and_then(Value::as_str) == Some("ERROR"))
        .map(|a| {
            a.get("text")
                .and_then(crate::parsing::text_from_object)
                .unwrap_or_else(|| "unavailable".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::mock::MockDownloader;

    #[test]
    fn test_ids() {
        assert!(is_valid_video_id("dQw4w9WgXcQ"));
        assert!(!is_valid_video_id("dQw4w9WgXc"));
        assert!(is_valid_playlist_id("PLbpi6ZahtOH6Ar_3GPy3workp2Ra4kd5M"));
        assert!(!is_valid_playlist_id("XXbpi6ZahtOH6Ar"));
    }

    #[test]
    fn test_hosts() {
        assert!(is_youtube_host("youtube.com"));
        assert!(is_youtube_host("music.youtube.com"));
        assert!(is_youtube_host("youtu.be"));
        assert!(!is_youtube_host("notyoutube.com"));
        assert!(!is_youtube_host("youtube.com.evil.com"));
    }

    #[test]
    fn test_thumbnails_from() {
        let value = json!({"thumbnails": [
            {"url": "//i.ytimg.com/vi/x/default.jpg", "width": 120, "height": 90},
            {"url": "https://i.ytimg.com/vi/x/hq720.jpg", "width": 1280, "height": 720}
        ]});
        let images = thumbnails_from(Some(&value));
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].url, "https://i.ytimg.com/vi/x/default.jpg");
        assert_eq!(images[1].resolution, crate::core::ResolutionLevel::High);
        assert!(thumbnails_from(None).is_empty());
    }

    #[test]
    fn test_continuation_helpers() {
        let record = json!({"continuationItemRenderer": {"continuationEndpoint": {"continuationCommand": {"token": "abc"}}}});
        assert_eq!(continuation_token(&record).as_deref(), Some("abc"));

        let response = json!({"onResponseReceivedActions": [
            {"appendContinuationItemsAction": {"continuationItems": [{"a": 1}, {"b": 2}]}}
        ]});
        assert_eq!(continuation_items(&response).len(), 2);

        let cursor = continuation_cursor("browse", "abc");
        assert!(cursor.url.ends_with("/youtubei/v1/browse?prettyPrint=false"));
        assert_eq!(
            serde_json::to_value(&cursor).unwrap(),
            json!({"url": "https://www.youtube.com/youtubei/v1/browse?prettyPrint=false", "id": "abc"})
        );
    }

    #[tokio::test]
    async fn test_continuation_body_uses_current_client_version() {
        let cursor = continuation_cursor("browse", "abc");
        CLIENT_VERSION.init("2.20250101.00.00");
        let mock = MockDownloader::new().route("\"continuation\":\"abc\"", "{}");
        fetch_continuation(&mock, &cursor, &Localization::new("en", Some("GB")))
            .await
            .unwrap();

        let bodies = mock.bodies();
        assert_eq!(bodies.len(), 1);
        let body: Value = serde_json::from_str(&bodies[0]).unwrap();
        assert_eq!(body["continuation"], "abc");
        assert_eq!(body["context"]["client"]["clientName"], "WEB");
        assert_eq!(body["context"]["client"]["clientVersion"], "2.20250101.00.00");
        assert_eq!(body["context"]["client"]["gl"], "GB");

        assert!(matches!(
            fetch_continuation(&mock, &Cursor::new(innertube_url("browse")), &Localization::default()).await,
            Err(ExtractionError::InvalidCursor(_))
        ));
    }

    #[test]
    fn test_error_alert() {
        let data = json!({"alerts": [{"alertRenderer": {"type": "ERROR", "text": {"simpleText": "This channel does not exist."}}}]});
        assert_eq!(error_alert(&data).as_deref(), Some("This channel does not exist."));
        assert_eq!(error_alert(&json!({})), None);
    }
}
