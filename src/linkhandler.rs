//! URL recognition and canonicalisation.
//!
//! A factory answers three questions about a URL without touching the
//! network: does it belong to me, what is the canonical id, and what is
//! the canonical URL for an id.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ExtractionError, Result};

/// Identity of one remote resource, produced once by a factory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkHandler {
    pub id: String,
    pub url: String,
    pub original_url: String,
}

impl LinkHandler {
    pub fn new(id: String, url: String, original_url: String) -> Self {
        Self {
            id,
            url,
            original_url,
        }
    }
}

pub trait LinkHandlerFactory: Send + Sync {
    /// Canonical id of `url`, or `InvalidUrl`/`Parsing` when it is not one of ours.
    fn id_from_url(&self, url: &str) -> Result<String>;

    fn url_from_id(&self, id: &str) -> Result<String>;

    /// Host and path check only.
    fn accepts_url(&self, url: &str) -> bool {
        self.id_from_url(url).is_ok()
    }

    fn from_url(&self, url: &str) -> Result<LinkHandler> {
        if !self.accepts_url(url) {
            return Err(ExtractionError::InvalidUrl(url.to_string()));
        }
        let id = self.id_from_url(url)?;
        let canonical = self.url_from_id(&id)?;
        Ok(LinkHandler::new(id, canonical, url.to_string()))
    }

    fn from_id(&self, id: &str) -> Result<LinkHandler> {
        let url = self.url_from_id(id)?;
        Ok(LinkHandler::new(id.to_string(), url.clone(), url))
    }
}

/// A search: the query is the id, the URL is the first request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchQueryHandler {
    pub query: String,
    pub url: String,
    pub content_filters: Vec<String>,
    pub sort_filter: String,
}

pub trait SearchQueryHandlerFactory: Send + Sync {
    fn url(&self, query: &str, content_filters: &[String], sort_filter: &str) -> Result<String>;

    fn available_content_filters(&self) -> &'static [&'static str] {
        &[]
    }

    fn from_query(
        &self,
        query: &str,
        content_filters: &[String],
        sort_filter: &str,
    ) -> Result<SearchQueryHandler> {
        if let Some(unknown) = content_filters
            .iter()
            .find(|f| !self.available_content_filters().contains(&f.as_str()))
        {
            return Err(ExtractionError::ContentNotSupported(format!(
                "search filter {unknown:?}"
            )));
        }
        Ok(SearchQueryHandler {
            query: query.to_string(),
            url: self.url(query, content_filters, sort_filter)?,
            content_filters: content_filters.to_vec(),
            sort_filter: sort_filter.to_string(),
        })
    }
}

/// Parse `url`, assuming https when the scheme is missing.
pub fn parse_url(url: &str) -> Result<Url> {
    let trimmed = url.trim();
    let parsed = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("https://{trimmed}"))
    };
    parsed.map_err(|e| ExtractionError::InvalidUrl(format!("{url}: {e}")))
}

/// Host of `url` with a leading `www.`/`m.` removed.
pub fn bare_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(&host)
        .to_string();
    Some(host)
}

/// Value of query parameter `name`.
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
