use async_trait::async_trait;
use serde_json::Value;

use crate::collector::{InfoItemExtractor, InfoItemsCollector};
use crate::core::{Image, StreamInfoItem};
use crate::error::{ExtractionError, Result};
use crate::extractor::{ExtractorBase, PageFetcher};
use crate::list::{Cursor, ListExtractor, Page, PlaylistExtractor, next_cursor, require_cursor};
use crate::parsing::required_str;

use super::items::{self, SoundcloudPlaylistInfoItem};
use super::utils::{API_V2_URL, api_json, expect_kind, resolve, uploader_name, uploader_url};

/// Tracks requested per `tracks?ids=` call.
const CHUNK: usize = 15;

pub struct SoundcloudPlaylistExtractor {
    base: ExtractorBase<Value>,
}

/// Cursor for the first `CHUNK` of `ids`, carrying the rest.
fn chunk_cursor(ids: &[String]) -> Option<Cursor> {
    if ids.is_empty() {
        return None;
    }
    let (chunk, rest) = ids.split_at(ids.len().min(CHUNK));
    let joined = chunk.join(",");
    Some(
        Cursor::new(format!("{API_V2_URL}/tracks?ids={}", urlencoding::encode(&joined)))
            .with_id(joined)
            .with_ids(rest.to_vec()),
    )
}

impl SoundcloudPlaylistExtractor {
    pub fn new(base: ExtractorBase<Value>) -> Self {
        Self { base }
    }

    fn playlist(&self) -> &Value {
        self.base.document()
    }

    fn tracks(&self) -> &[Value] {
        self.playlist()
            .get("tracks")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn collect_tracks<'a>(
        &self,
        tracks: impl IntoIterator<Item = &'a Value>,
        previous: Option<&Cursor>,
        candidate: Option<Cursor>,
    ) -> Result<Page<StreamInfoItem>> {
        let platform = self.base.platform();
        let mut collector = InfoItemsCollector::new(platform);
        collector.collect(tracks, |record| items::stream_item(platform, record))?;
        Ok(Page::from_collector(collector, next_cursor(previous, candidate)))
    }
}

/// Only full track objects carry a title; the rest are bare ids.
fn is_full_track(track: &Value) -> bool {
    track.get("title").is_some()
}

fn track_id(track: &Value) -> Option<String> {
    match track.get("id") {
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl PageFetcher for SoundcloudPlaylistExtractor {
    type Document = Value;

    fn base(&self) -> &ExtractorBase<Value> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ExtractorBase<Value> {
        &mut self.base
    }

    async fn on_fetch_page(&self) -> Result<Value> {
        let playlist = resolve(self.base.downloader(), self.base.url(), self.base.localization()).await?;
        expect_kind(&playlist, "playlist")?;
        Ok(playlist)
    }

    fn document_name(&self, playlist: &Value) -> Result<String> {
        required_str(playlist, "/title", "name")
    }
}

#[async_trait]
impl ListExtractor<StreamInfoItem> for SoundcloudPlaylistExtractor {
    /// Full tracks are inline; the bare ids become chunked cursors.
    async fn initial_page(&self) -> Result<Page<StreamInfoItem>> {
        let pending: Vec<String> = self
            .tracks()
            .iter()
            .filter(|t| !is_full_track(t))
            .filter_map(track_id)
            .collect();
        let full = self.tracks().iter().filter(|t| is_full_track(t));
        self.collect_tracks(full, None, chunk_cursor(&pending))
    }

    async fn page(&self, cursor: Option<&Cursor>) -> Result<Page<StreamInfoItem>> {
        let cursor = require_cursor(cursor)?;
        let response = api_json(self.base.downloader(), &cursor.url, self.base.localization()).await?;
        let mut tracks: Vec<&Value> = response
            .as_array()
            .ok_or_else(|| ExtractionError::parsing("tracks", "expected an array"))?
            .iter()
            .collect();

        // the api answers in its own order
        if let Some(requested) = &cursor.id {
            let order: Vec<&str> = requested.split(',').collect();
            tracks.sort_by_key(|t| {
                track_id(t)
                    .and_then(|id| order.iter().position(|o| *o == id))
                    .unwrap_or(usize::MAX)
            });
        }
        self.collect_tracks(tracks, Some(cursor), chunk_cursor(&cursor.ids))
    }
}

impl PlaylistExtractor for SoundcloudPlaylistExtractor {
    fn uploader_name(&self) -> Result<Option<String>> {
        Ok(uploader_name(self.playlist()))
    }

    fn uploader_url(&self) -> Result<Option<String>> {
        Ok(uploader_url(self.playlist()))
    }

    fn stream_count(&self) -> Result<i64> {
        Ok(self
            .playlist()
            .get("track_count")
            .and_then(Value::as_i64)
            .unwrap_or(-1))
    }

    fn thumbnails(&self) -> Result<Vec<Image>> {
        SoundcloudPlaylistInfoItem(self.playlist()).thumbnails()
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
    use crate::list::collect_pages;
    use crate::soundcloud::links::SoundcloudPlaylistLinkHandlerFactory;
    use serde_json::json;
    use std::sync::Arc;

    fn full(id: u64) -> Value {
        json!({"id": id, "kind": "track", "title": format!("t{id}"), "permalink_url": format!("https://soundcloud.com/a/t{id}")})
    }

    #[test]
    fn test_chunk_cursor() {
        let ids: Vec<String> = (1..=20).map(|i| i.to_string()).collect();
        let first = chunk_cursor(&ids).unwrap();
        assert_eq!(first.id.as_deref().map(|s| s.split(',').count()), Some(15));
        assert_eq!(first.ids.len(), 5);
        let second = chunk_cursor(&first.ids).unwrap();
        assert!(second.ids.is_empty());
        assert!(chunk_cursor(&second.ids).is_none());
    }

    #[tokio::test]
    async fn test_playlist_chunks() {
        let mut tracks = vec![full(1), full(2)];
        tracks.extend((3..=20).map(|id| json!({"id": id, "kind": "track"})));
        let playlist = json!({"kind": "playlist", "title": "Mix", "track_count": 20,
            "permalink_url": "https://soundcloud.com/a/sets/mix",
            "user": {"username": "a", "permalink_url": "https://soundcloud.com/a"},
            "tracks": tracks});
        // second chunk answered out of order
        let rest = json!([full(20), full(18), full(19)]);
        let first_chunk: Vec<Value> = (3..=17).map(full).collect();
        let mock = Arc::new(
            MockDownloader::new()
                .route("ids=18", &rest.to_string())
                .route("ids=3", &Value::from(first_chunk).to_string())
                .route("resolve?url=", &playlist.to_string())
                .route("https://soundcloud.com ", r#"{client_id:"testclientid"}"#),
        );
        let link = SoundcloudPlaylistLinkHandlerFactory
            .from_url("https://soundcloud.com/a/sets/mix")
            .unwrap();
        let mut e = SoundcloudPlaylistExtractor::new(ExtractorBase::new(
            Platform::SoundCloud,
            link,
            mock.clone(),
            Localization::default(),
        ));
        e.fetch_page().await.unwrap();
        assert_eq!(e.name().unwrap(), "Mix");
        assert_eq!(e.stream_count().unwrap(), 20);

        let first = e.initial_page().await.unwrap();
        assert_eq!(first.items.len(), 2);

        let all = collect_pages(&e, None).await.unwrap();
        let names: Vec<_> = all.items.iter().map(|i| i.name.clone()).collect();
        let expected: Vec<_> = (1..=20).map(|i| format!("t{i}")).collect();
        assert_eq!(names, expected);
        assert!(all.next_cursor.is_none());
    }
}
