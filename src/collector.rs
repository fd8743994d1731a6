//! Per-record item extraction and the collector that isolates failures.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::core::{
    ChannelInfoItem, CommentsInfoItem, Image, Platform, PlaylistInfoItem, StreamInfoItem,
    StreamType,
};
use crate::error::{ExtractionError, Result};

/// Fields every listing record has. `name` and `url` are required.
pub trait InfoItemExtractor {
    fn name(&self) -> Result<String>;

    fn url(&self) -> Result<String>;

    fn thumbnails(&self) -> Result<Vec<Image>>;
}

/// Value of an optional field, or `default` when it could not be read.
fn optional<T>(field: &str, value: Result<T>, default: T) -> T {
    value.unwrap_or_else(|e| {
        debug!(field, error = %e, "optional field missing");
        default
    })
}

pub trait StreamInfoItemExtractor: InfoItemExtractor {
    fn stream_type(&self) -> Result<StreamType>;

    fn duration(&self) -> Result<i64>;

    fn view_count(&self) -> Result<i64>;

    fn uploader_name(&self) -> Result<Option<String>>;

    fn uploader_url(&self) -> Result<Option<String>>;

    fn textual_upload_date(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn upload_date(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(None)
    }

    fn short_description(&self) -> Result<Option<String>> {
        Ok(None)
    }

    /// Ads and placeholders the collector should drop silently.
    fn is_ad(&self) -> bool {
        false
    }

    fn to_item(&self, platform: Platform) -> Result<StreamInfoItem> {
        let stream_type = optional("stream_type", self.stream_type(), StreamType::VideoStream);
        let mut item = StreamInfoItem::new(platform, self.url()?, self.name()?, stream_type);
        item.thumbnails = optional("thumbnails", self.thumbnails(), Vec::new());
        item.duration = optional("duration", self.duration(), -1);
        item.view_count = optional("view_count", self.view_count(), -1);
        item.uploader_name = optional("uploader_name", self.uploader_name(), None);
        item.uploader_url = optional("uploader_url", self.uploader_url(), None);
        item.textual_upload_date =
            optional("textual_upload_date", self.textual_upload_date(), None);
        item.upload_date = optional("upload_date", self.upload_date(), None);
        item.short_description = optional("short_description", self.short_description(), None);
        Ok(item)
    }
}

pub trait PlaylistInfoItemExtractor: InfoItemExtractor {
    fn uploader_name(&self) -> Result<Option<String>>;

    fn stream_count(&self) -> Result<i64>;

    fn to_item(&self, platform: Platform) -> Result<PlaylistInfoItem> {
        Ok(PlaylistInfoItem {
            platform,
            url: self.url()?,
            name: self.name()?,
            thumbnails: optional("thumbnails", self.thumbnails(), Vec::new()),
            uploader_name: optional("uploader_name", self.uploader_name(), None),
            stream_count: optional("stream_count", self.stream_count(), -1),
        })
    }
}

pub trait ChannelInfoItemExtractor: InfoItemExtractor {
    fn description(&self) -> Result<Option<String>>;

    fn subscriber_count(&self) -> Result<i64>;

    fn stream_count(&self) -> Result<i64>;

    fn to_item(&self, platform: Platform) -> Result<ChannelInfoItem> {
        Ok(ChannelInfoItem {
            platform,
            url: self.url()?,
            name: self.name()?,
            thumbnails: optional("thumbnails", self.thumbnails(), Vec::new()),
            description: optional("description", self.description(), None),
            subscriber_count: optional("subscriber_count", self.subscriber_count(), -1),
            stream_count: optional("stream_count", self.stream_count(), -1),
        })
    }
}

pub trait CommentsInfoItemExtractor: InfoItemExtractor {
    fn comment_id(&self) -> Result<String>;

    fn comment_text(&self) -> Result<String>;

    fn uploader_url(&self) -> Result<Option<String>>;

    fn textual_upload_date(&self) -> Result<Option<String>>;

    fn upload_date(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(None)
    }

    fn like_count(&self) -> Result<i64>;

    fn stream_position(&self) -> Result<i64> {
        Ok(-1)
    }

    fn to_item(&self, platform: Platform) -> Result<CommentsInfoItem> {
        Ok(CommentsInfoItem {
            platform,
            url: self.url()?,
            name: self.name()?,
            comment_id: self.comment_id()?,
            thumbnails: optional("thumbnails", self.thumbnails(), Vec::new()),
            comment_text: optional("comment_text", self.comment_text(), String::new()),
            uploader_url: optional("uploader_url", self.uploader_url(), None),
            textual_upload_date: optional(
                "textual_upload_date",
                self.textual_upload_date(),
                None,
            ),
            upload_date: optional("upload_date", self.upload_date(), None),
            like_count: optional("like_count", self.like_count(), -1),
            stream_position: optional("stream_position", self.stream_position(), -1),
        })
    }
}

/// Accumulates items from a batch of raw records. A record that fails
/// to parse is recorded in `errors` and the batch goes on.
#[derive(Debug)]
pub struct InfoItemsCollector<T> {
    platform: Platform,
    items: Vec<T>,
    errors: Vec<ExtractionError>,
}

impl<T> InfoItemsCollector<T> {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            items: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Add one extraction outcome. Item-level failures are recorded;
    /// anything else is handed back to the caller.
    pub fn commit(&mut self, outcome: Result<T>) -> Result<()> {
        match outcome {
            Ok(item) => self.items.push(item),
            Err(e) if e.is_item_level() => {
                warn!(platform = %self.platform, error = %e, "dropping record");
                self.errors.push(e);
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Run `extract` over `records` in order. `Ok(None)` skips a record
    /// (ads, placeholders) without recording an error.
    pub fn collect<R>(
        &mut self,
        records: impl IntoIterator<Item = R>,
        mut extract: impl FnMut(R) -> Result<Option<T>>,
    ) -> Result<()> {
        for record in records {
            match extract(record) {
                Ok(Some(item)) => self.commit(Ok(item))?,
                Ok(None) => {}
                Err(e) => self.commit(Err(e))?,
            }
        }
        Ok(())
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn errors(&self) -> &[ExtractionError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_parts(self) -> (Vec<T>, Vec<ExtractionError>) {
        (self.items, self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use strum::IntoEnumIterator;

    struct JsonItem<'a>(&'a Value);

    impl InfoItemExtractor for JsonItem<'_> {
        fn name(&self) -> Result<String> {
            crate::parsing::required_str(self.0, "/title", "name")
        }

        fn url(&self) -> Result<String> {
            crate::parsing::required_str(self.0, "/url", "url")
        }

        fn thumbnails(&self) -> Result<Vec<Image>> {
            Ok(Vec::new())
        }
    }

    impl StreamInfoItemExtractor for JsonItem<'_> {
        fn stream_type(&self) -> Result<StreamType> {
            Ok(StreamType::VideoStream)
        }

        fn duration(&self) -> Result<i64> {
            self.0["duration"]
                .as_i64()
                .ok_or_else(|| ExtractionError::parsing("duration", "missing"))
        }

        fn view_count(&self) -> Result<i64> {
            Err(ExtractionError::parsing("view_count", "missing"))
        }

        fn uploader_name(&self) -> Result<Option<String>> {
            Ok(None)
        }

        fn uploader_url(&self) -> Result<Option<String>> {
            Ok(None)
        }

        fn is_ad(&self) -> bool {
            self.0["ad"].as_bool().unwrap_or(false)
        }
    }

    fn platform() -> Platform {
        Platform::iter().next().unwrap()
    }

    #[test]
    fn test_partial_failure_keeps_order() {
        let records = json!([
            {"title": "a", "url": "https://x/a", "duration": 1},
            {"title": "b", "url": "https://x/b"},
            {"url": "https://x/broken"},
            {"title": "ad", "url": "https://x/ad", "ad": true},
            {"title": "d", "url": "https://x/d", "duration": 4}
        ]);
        let mut collector = InfoItemsCollector::new(platform());
        collector
            .collect(records.as_array().unwrap(), |record| {
                let item = JsonItem(record);
                if item.is_ad() {
                    return Ok(None);
                }
                item.to_item(platform()).map(Some)
            })
            .unwrap();

        let names: Vec<_> = collector.items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "d"]);
        assert_eq!(collector.errors().len(), 1);
        assert_eq!(collector.items()[1].duration, -1);
        assert_eq!(collector.items()[0].view_count, -1);
    }

    #[test]
    fn test_resource_level_errors_propagate() {
        let mut collector: InfoItemsCollector<u8> = InfoItemsCollector::new(platform());
        let result = collector.collect([1, 2], |n| {
            if n == 2 {
                Err(ExtractionError::ContentNotAvailable("gone".into()))
            } else {
                Ok(Some(n))
            }
        });
        assert!(matches!(result, Err(ExtractionError::ContentNotAvailable(_))));
        assert_eq!(collector.items(), [1]);
        assert!(collector.errors().is_empty());
    }
}
