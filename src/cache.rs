use std::future::Future;
use std::sync::RwLock;

use tracing::debug;

use crate::error::Result;

/// Process-wide memoized string, such as a client version or API key.
///
/// The value stays until [`SharedValue::invalidate`] is called; adapters
/// invalidate when the upstream rejects it and the next caller refetches.
pub struct SharedValue {
    name: &'static str,
    value: RwLock<Option<String>>,
}

impl SharedValue {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            value: RwLock::new(None),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.value.read().ok().and_then(|v| v.clone())
    }

    pub fn init(&self, value: impl Into<String>) {
        let value = value.into();
        debug!(cache = self.name, %value, "cache initialised");
        if let Ok(mut slot) = self.value.write() {
            *slot = Some(value);
        }
    }

    pub fn invalidate(&self) {
        debug!(cache = self.name, "cache invalidated");
        if let Ok(mut slot) = self.value.write() {
            *slot = None;
        }
    }

    /// Cached value, or the result of `fetch` which then becomes the cached value.
    ///
    /// Concurrent first callers may each run `fetch`; the last one stored wins.
    pub async fn get_or_init<F, Fut>(&self, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(value) = self.get() {
            return Ok(value);
        }
        let value = fetch().await?;
        self.init(value.clone());
        Ok(value)
    }
}
