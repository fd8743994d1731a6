//! Paginated listings: pages, cursors and the list extractor traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::collector::InfoItemsCollector;
use crate::core::{CommentsInfoItem, Image, InfoItem, StreamInfoItem};
use crate::error::{ExtractionError, Result};
use crate::extractor::Extractor;

/// Where the next batch lives.
///
/// `url` is the request target. `id` carries a platform token (for example
/// a continuation) and `ids` the items still to be fetched when a listing is
/// paged client side. Request bodies are built at fetch time, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ids: Vec<String>,
}

impl Cursor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = ids;
        self
    }

    /// A present cursor with somewhere to go.
    pub fn is_valid(cursor: Option<&Cursor>) -> bool {
        cursor.is_some_and(|c| !c.url.is_empty())
    }
}

/// `candidate` unless it is empty or repeats `previous`, either of which
/// means the listing is over.
pub fn next_cursor(previous: Option<&Cursor>, candidate: Option<Cursor>) -> Option<Cursor> {
    let candidate = candidate.filter(|c| Cursor::is_valid(Some(c)))?;
    if previous == Some(&candidate) {
        debug!(url = %candidate.url, "cursor repeated, ending listing");
        return None;
    }
    Some(candidate)
}

/// `InvalidCursor` unless `cursor` is usable.
pub fn require_cursor(cursor: Option<&Cursor>) -> Result<&Cursor> {
    match cursor {
        Some(c) if Cursor::is_valid(Some(c)) => Ok(c),
        Some(c) => Err(ExtractionError::InvalidCursor(format!("empty cursor {c:?}"))),
        None => Err(ExtractionError::InvalidCursor(
            "no next page for this listing".to_string(),
        )),
    }
}

/// One batch of a listing.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(serialize_with = "error_messages")]
    pub errors: Vec<ExtractionError>,
    pub next_cursor: Option<Cursor>,
}

fn error_messages<S: Serializer>(
    errors: &[ExtractionError],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, errors: Vec<ExtractionError>, next_cursor: Option<Cursor>) -> Self {
        Self {
            items,
            errors,
            next_cursor,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), None)
    }

    pub fn from_collector(collector: InfoItemsCollector<T>, next_cursor: Option<Cursor>) -> Self {
        let (items, errors) = collector.into_parts();
        Self::new(items, errors, next_cursor)
    }

    pub fn has_next_page(&self) -> bool {
        Cursor::is_valid(self.next_cursor.as_ref())
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            errors: self.errors,
            next_cursor: self.next_cursor,
        }
    }
}

/// A listing read page by page.
#[async_trait]
pub trait ListExtractor<T: Send>: Extractor {
    /// First batch, from the fetched document when the platform embeds it.
    async fn initial_page(&self) -> Result<Page<T>>;

    /// The batch `cursor` points at. Exactly one request per call.
    async fn page(&self, cursor: Option<&Cursor>) -> Result<Page<T>>;
}

#[async_trait]
pub trait PlaylistExtractor: ListExtractor<StreamInfoItem> {
    fn uploader_name(&self) -> Result<Option<String>>;

    fn uploader_url(&self) -> Result<Option<String>> {
        Ok(None)
    }

    /// -1 when unknown.
    fn stream_count(&self) -> Result<i64>;

    fn thumbnails(&self) -> Result<Vec<Image>>;
}

#[async_trait]
pub trait ChannelExtractor: ListExtractor<StreamInfoItem> {
    fn avatars(&self) -> Result<Vec<Image>>;

    fn banners(&self) -> Result<Vec<Image>> {
        Ok(Vec::new())
    }

    fn subscriber_count(&self) -> Result<i64>;

    fn description(&self) -> Result<Option<String>>;

    fn feed_url(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

#[async_trait]
pub trait SearchExtractor: ListExtractor<InfoItem> {
    fn search_string(&self) -> &str;

    /// The query the platform suggests instead, empty when none.
    fn search_suggestion(&self) -> Result<String> {
        Ok(String::new())
    }

    /// Whether results are for the suggestion rather than the query.
    fn is_corrected_search(&self) -> Result<bool> {
        Ok(false)
    }
}

/// A listing the platform curates itself, such as trending, opened by id
/// rather than by a user-supplied URL.
#[async_trait]
pub trait KioskExtractor: ListExtractor<StreamInfoItem> {
    fn kiosk_id(&self) -> &str {
        self.id()
    }
}

#[async_trait]
pub trait CommentsExtractor: ListExtractor<CommentsInfoItem> {
    fn is_comments_disabled(&self) -> Result<bool> {
        Ok(false)
    }
}

/// Walk a listing from the initial page, at most `max_pages` pages.
///
/// Returns every item and error seen, with the cursor to continue from
/// when the limit stopped the walk.
pub async fn collect_pages<T, E>(extractor: &E, max_pages: Option<usize>) -> Result<Page<T>>
where
    T: Send,
    E: ListExtractor<T> + ?Sized,
{
    let mut all = extractor.initial_page().await?;
    let mut fetched = 1;

    while all.has_next_page() && max_pages.is_none_or(|max| fetched < max) {
        let page = extractor.page(all.next_cursor.as_ref()).await?;
        fetched += 1;
        debug!(
            page = fetched,
            items = page.items.len(),
            errors = page.errors.len(),
            "fetched page"
        );
        all.items.extend(page.items);
        all.errors.extend(page.errors);
        all.next_cursor = next_cursor(all.next_cursor.as_ref(), page.next_cursor);
    }
    Ok(all)
}
