use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::cache::SharedValue;
use crate::core::{Image, ResolutionLevel};
use crate::download::{Downloader, Localization, Response};
use crate::error::{ExtractionError, Result};
use crate::list::Cursor;
use crate::parsing::{match_group1, non_empty_str, replace_http_with_https};

pub const BASE_URL: &str = "https://soundcloud.com";
pub const API_V2_URL: &str = "https://api-v2.soundcloud.com";

/// Public web client id, scraped from the site's asset scripts.
pub static CLIENT_ID: SharedValue = SharedValue::new("soundcloud client id");

const CLIENT_ID_PATTERN: &str = r#"client_id\s*:\s*"([a-zA-Z0-9]+)""#;

async fn scrape_client_id(downloader: &dyn Downloader, localization: &Localization) -> Result<String> {
    let home = downloader
        .get(BASE_URL, localization)
        .await?
        .error_for_status()?;
    if let Ok(id) = match_group1(CLIENT_ID_PATTERN, &home.body) {
        return Ok(id);
    }

    let script = Regex::new(r#"<script[^>]+src="([^"]+)""#)?;
    let sources: Vec<&str> = script
        .captures_iter(&home.body)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|src| src.contains("sndcdn.com"))
        .collect();

    // the id lives in one of the last bundles
    for src in sources.into_iter().rev() {
        let response = downloader.get(src, localization).await?;
        if !response.is_success() {
            debug!(src, status = response.status, "skipping asset");
            continue;
        }
        if let Ok(id) = match_group1(CLIENT_ID_PATTERN, &response.body) {
            return Ok(id);
        }
    }
    Err(ExtractionError::parsing("client_id", "not found in any asset script"))
}

/// `url` with its `client_id` parameter set to `client_id`.
pub fn with_client_id(url: &str, client_id: &str) -> Result<String> {
    let mut parsed =
        Url::parse(url).map_err(|e| ExtractionError::InvalidUrl(format!("{url}: {e}")))?;
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "client_id")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("client_id", client_id);
    Ok(parsed.into())
}

/// GET an api-v2 URL with a client id from `cache`. A 401/403 drops the
/// cached id and the request is retried once with a fresh one.
pub async fn api_get_with(
    cache: &SharedValue,
    downloader: &dyn Downloader,
    url: &str,
    localization: &Localization,
) -> Result<Response> {
    let mut retried = false;
    loop {
        let client_id = cache
            .get_or_init(|| scrape_client_id(downloader, localization))
            .await?;
        let response = downloader
            .get(&with_client_id(url, &client_id)?, localization)
            .await?;
        if matches!(response.status, 401 | 403) && !retried {
            warn!(status = response.status, url, "client id rejected");
            cache.invalidate();
            retried = true;
            continue;
        }
        return Ok(response);
    }
}

pub async fn api_get(downloader: &dyn Downloader, url: &str, localization: &Localization) -> Result<Response> {
    api_get_with(&CLIENT_ID, downloader, url, localization).await
}

/// JSON body of an api-v2 call; 404 means the resource is gone.
pub async fn api_json(downloader: &dyn Downloader, url: &str, localization: &Localization) -> Result<Value> {
    let response = api_get(downloader, url, localization).await?;
    if response.status == 404 {
        return Err(ExtractionError::ContentNotAvailable(format!(
            "no such resource: {url}"
        )));
    }
    response.error_for_status()?.json()
}

/// Resolve a soundcloud.com URL into its api-v2 object.
pub async fn resolve(downloader: &dyn Downloader, url: &str, localization: &Localization) -> Result<Value> {
    let api_url = format!("{API_V2_URL}/resolve?url={}", urlencoding::encode(url));
    api_json(downloader, &api_url, localization).await
}

/// ContentNotSupported unless the resolved object is of `kind`.
pub fn expect_kind(resolved: &Value, kind: &str) -> Result<()> {
    match resolved.get("kind").and_then(Value::as_str) {
        Some(k) if k == kind => Ok(()),
        other => Err(ExtractionError::ContentNotSupported(format!(
            "expected a {kind}, got {}",
            other.unwrap_or("nothing")
        ))),
    }
}

/// `collection` records and the `next_href` cursor of a paged api-v2 answer.
pub fn collection_page(response: &Value) -> (&[Value], Option<Cursor>) {
    let records = response
        .get("collection")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let next = non_empty_str(response.get("next_href"))
        .filter(|_| !records.is_empty())
        .map(Cursor::new);
    (records, next)
}

/// Artwork in the three sizes the CDN serves.
pub fn artwork_images(url: &str) -> Vec<Image> {
    if url.is_empty() {
        return Vec::new();
    }
    vec![
        Image::with_level(url.replace("large.jpg", "small.jpg"), ResolutionLevel::Low),
        Image::with_level(url, ResolutionLevel::Medium),
        Image::with_level(url.replace("large.jpg", "crop.jpg"), ResolutionLevel::High),
    ]
}

/// Track artwork, or the uploader's avatar when the track has none.
pub fn artwork_or_avatar(record: &Value) -> Vec<Image> {
    let url = non_empty_str(record.get("artwork_url"))
        .or_else(|| non_empty_str(record.pointer("/user/avatar_url")))
        .unwrap_or_default();
    artwork_images(&url)
}

pub fn uploader_name(record: &Value) -> Option<String> {
    non_empty_str(record.pointer("/user/username"))
}

pub fn uploader_url(record: &Value) -> Option<String> {
    non_empty_str(record.pointer("/user/permalink_url")).map(|u| replace_http_with_https(&u))
}

pub fn parse_date(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| ExtractionError::parsing("upload date", format!("{text}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::mock::MockDownloader;

    #[test]
    fn test_with_client_id_replaces() {
        let url = with_client_id(
            "https://api-v2.soundcloud.com/search?q=a&client_id=old&offset=10",
            "new",
        )
        .unwrap();
        assert_eq!(
            url,
            "https://api-v2.soundcloud.com/search?q=a&offset=10&client_id=new"
        );
    }

    #[tokio::test]
    async fn test_client_id_from_assets_and_retry() {
        let cache = SharedValue::new("test client id");
        cache.init("stale");
        let mock = MockDownloader::new()
            .route_status("client_id=stale", 401, "")
            .route("https://a-v2.sndcdn.com/assets/2.js", r#"({client_id:"fresh1"})"#)
            .route("https://a-v2.sndcdn.com/assets/1.js", "nothing here")
            .route(
                "https://soundcloud.com ",
                r#"<script crossorigin src="https://a-v2.sndcdn.com/assets/1.js"></script>
                   <script crossorigin src="https://a-v2.sndcdn.com/assets/2.js"></script>"#,
            )
            .route("client_id=fresh1", r#"{"kind":"track"}"#);

        let response = api_get_with(&cache, &mock, "https://api-v2.soundcloud.com/tracks/1", &Localization::default())
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(cache.get().as_deref(), Some("fresh1"));
        assert_eq!(mock.calls(), 4);
    }

    #[test]
    fn test_collection_page_ends_on_empty() {
        let full = serde_json::json!({"collection": [{}], "next_href": "https://api-v2.soundcloud.com/x?offset=10"});
        let (records, next) = collection_page(&full);
        assert_eq!(records.len(), 1);
        assert!(next.is_some());

        let empty = serde_json::json!({"collection": [], "next_href": "https://api-v2.soundcloud.com/x?offset=20"});
        assert!(collection_page(&empty).1.is_none());
    }

    #[test]
    fn test_artwork_sizes() {
        let images = artwork_images("https://i1.sndcdn.com/artworks-000-large.jpg");
        assert_eq!(images.len(), 3);
        assert!(images[2].url.ends_with("crop.jpg"));
        assert!(artwork_images("").is_empty());
    }
}
